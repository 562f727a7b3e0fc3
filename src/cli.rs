use crate::config::{SessionConfig, DEFAULT_CSV_NAME, DEFAULT_PREVIEW_LINES, DEFAULT_ZIP_NAME};
use crate::naming::CollisionPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formsplit")]
#[command(about = "Split scanned patient intake forms into one named PDF per patient")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label each page interactively, then export a CSV and a ZIP
    Label {
        /// Multi-page PDF of intake forms
        path: PathBuf,

        /// Directory for the CSV manifest and ZIP archive
        #[arg(short, long, env = "FORMSPLIT_EXPORT_DIR", default_value = ".")]
        export_dir: PathBuf,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Run as MCP server, exposing the labeling session as tools
    Mcp {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Split PDF into individual pages
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Keep renamed PDFs in this directory (default: session scratch space)
    #[arg(long, env = "FORMSPLIT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// What to do when two forms get the same file name
    #[arg(long, env = "FORMSPLIT_ON_DUPLICATE", value_enum, default_value_t = CollisionPolicy::Reject)]
    pub on_duplicate: CollisionPolicy,

    /// File name of the exported CSV manifest
    #[arg(long, env = "FORMSPLIT_CSV_NAME", default_value = DEFAULT_CSV_NAME)]
    pub csv_name: String,

    /// File name of the exported ZIP archive
    #[arg(long, env = "FORMSPLIT_ZIP_NAME", default_value = DEFAULT_ZIP_NAME)]
    pub zip_name: String,

    /// Lines of page text to show as a preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_LINES)]
    pub preview_lines: usize,
}

impl From<SessionArgs> for SessionConfig {
    fn from(args: SessionArgs) -> Self {
        SessionConfig {
            output_dir: args.output_dir,
            collision: args.on_duplicate,
            csv_name: args.csv_name,
            zip_name: args.zip_name,
            preview_lines: args.preview_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_label_defaults() {
        let cli = Cli::try_parse_from(["formsplit", "label", "forms.pdf"]).unwrap();
        let Commands::Label { path, session, .. } = cli.command else {
            panic!("expected label");
        };
        assert_eq!(path, PathBuf::from("forms.pdf"));

        let config = SessionConfig::from(session);
        assert_eq!(config.csv_name, "patient_data.csv");
        assert_eq!(config.zip_name, "patient_forms.zip");
    }

    #[test]
    fn test_duplicate_policy_flag() {
        let cli = Cli::try_parse_from([
            "formsplit",
            "mcp",
            "--on-duplicate",
            "suffix",
            "--output-dir",
            "/tmp/renamed",
        ])
        .unwrap();
        let Commands::Mcp { session } = cli.command else {
            panic!("expected mcp");
        };
        assert_eq!(session.on_duplicate, CollisionPolicy::Suffix);
        assert_eq!(session.output_dir, Some(PathBuf::from("/tmp/renamed")));
    }
}
