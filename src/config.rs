use crate::naming::CollisionPolicy;
use std::path::PathBuf;

pub const DEFAULT_CSV_NAME: &str = "patient_data.csv";
pub const DEFAULT_ZIP_NAME: &str = "patient_forms.zip";
pub const DEFAULT_PREVIEW_LINES: usize = 12;

/// Settings shared by every session a front end starts.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where renamed pages go. `None` keeps them in the session scratch
    /// directory, which disappears with the session.
    pub output_dir: Option<PathBuf>,
    pub collision: CollisionPolicy,
    pub csv_name: String,
    pub zip_name: String,
    /// Lines of extracted text shown for the current page.
    pub preview_lines: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            collision: CollisionPolicy::default(),
            csv_name: DEFAULT_CSV_NAME.to_string(),
            zip_name: DEFAULT_ZIP_NAME.to_string(),
            preview_lines: DEFAULT_PREVIEW_LINES,
        }
    }
}
