use crate::bundle::ExportPaths;
use crate::config::SessionConfig;
use crate::session::{Event, Outcome, SessionStore};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

const RESET_COMMAND: &str = ":reset";
const QUIT_COMMAND: &str = ":quit";

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    config: SessionConfig,
    export_dir: Q,
) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    match walk(
        path.as_ref(),
        config,
        export_dir.as_ref(),
        &mut stdin.lock(),
        &mut stdout.lock(),
    )? {
        Some(paths) => {
            println!("Patient data CSV: {}", paths.manifest.display());
            println!("Processed PDFs:   {}", paths.archive.display());
        }
        None => println!("Aborted; nothing was exported."),
    }
    Ok(())
}

enum Reply {
    Text(String),
    Reset,
    Quit,
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Reply> {
    write!(out, "{}: ", label)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Reply::Quit);
    }

    let line = line.trim_end_matches(['\r', '\n']);
    Ok(match line.trim() {
        RESET_COMMAND => Reply::Reset,
        QUIT_COMMAND => Reply::Quit,
        _ => Reply::Text(line.to_string()),
    })
}

/// Walk the operator through every page. Returns the export paths once the
/// session completes, or `None` if they quit first.
pub(crate) fn walk<R: BufRead, W: Write>(
    path: &Path,
    config: SessionConfig,
    export_dir: &Path,
    input: &mut R,
    out: &mut W,
) -> Result<Option<ExportPaths>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {}", path.display()))?;
    let source_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.pdf")
        .to_string();

    let mut store = SessionStore::new(config);

    'session: loop {
        let started = store
            .handle(Event::Upload {
                bytes: bytes.clone(),
                source_name: source_name.clone(),
            })
            .with_context(|| format!("Failed to split {}", path.display()))?;
        if let Outcome::Started { page_count } = started {
            writeln!(out, "Successfully split PDF into {} pages", page_count)?;
            writeln!(
                out,
                "Enter patient names for each form ({} to start over, {} to abort).",
                RESET_COMMAND, QUIT_COMMAND
            )?;
        }

        loop {
            let session = store.active()?;
            let Some(page) = session.current_page() else {
                break;
            };
            let ordinal = page.ordinal;
            let total = session.page_count();

            writeln!(out)?;
            writeln!(
                out,
                "Form {} of {} ({}% done)",
                ordinal,
                total,
                session.current_page_index() * 100 / total
            )?;
            match session.current_preview() {
                Ok(text) if !text.is_empty() => {
                    for line in text.lines() {
                        writeln!(out, "  | {}", line)?;
                    }
                }
                Ok(_) => writeln!(out, "  (no text on this page)")?,
                Err(e) => {
                    tracing::warn!(page = ordinal, error = %e, "preview failed");
                    writeln!(out, "  (preview unavailable)")?;
                }
            }

            let mut fields = Vec::with_capacity(2);
            for label in [
                format!("First Name for Form {}", ordinal),
                format!("Last Name for Form {}", ordinal),
            ] {
                match prompt(input, out, &label)? {
                    Reply::Text(text) => fields.push(text),
                    Reply::Reset => {
                        store.handle(Event::Reset)?;
                        writeln!(out, "Starting over.")?;
                        continue 'session;
                    }
                    Reply::Quit => {
                        store.handle(Event::Reset)?;
                        return Ok(None);
                    }
                }
            }
            let last_name = fields.pop().unwrap_or_default();
            let first_name = fields.pop().unwrap_or_default();

            match store.handle(Event::Confirm {
                first_name,
                last_name,
            }) {
                Ok(Outcome::Confirmed { record, .. }) => {
                    writeln!(out, "Saved form {} as {}", ordinal, record.file_name())?;
                }
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    writeln!(out, "{}. Please enter a different name.", e)?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let session = store.active()?;
        let config = store.config();
        let paths = session
            .bundle()?
            .write_to(export_dir, &config.csv_name, &config.zip_name)?;
        writeln!(out)?;
        writeln!(out, "Processing complete! {} forms saved.", session.records().len())?;
        if config.output_dir.is_some() {
            writeln!(out, "Renamed PDFs are in {}", session.output_dir().display())?;
        }
        return Ok(Some(paths));
    }
}
