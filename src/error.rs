//! Error types for the intake session.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The upload is not a readable PDF
    #[error("Invalid PDF: {reason}")]
    InvalidPdf { reason: String },

    /// A filesystem step (split, rename, export) failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another confirmed page already owns this file name
    #[error("Output file {file_name} already exists (page {page})")]
    DuplicateOutput { file_name: String, page: u32 },

    #[error("All pages have already been confirmed")]
    AlreadyComplete,

    #[error("Session is not complete ({confirmed} of {total} pages confirmed)")]
    Incomplete { confirmed: usize, total: usize },

    #[error("No active session; upload a PDF first")]
    NoSession,

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to build manifest: {0}")]
    Manifest(#[from] csv::Error),

    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the session survives this error unchanged and the same page
    /// can simply be retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DuplicateOutput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io(
            "/tmp/out/Jane_Doe.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/Jane_Doe.pdf"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_only_duplicates_are_recoverable() {
        let dup = Error::DuplicateOutput {
            file_name: "Jane_Doe.pdf".into(),
            page: 2,
        };
        assert!(dup.is_recoverable());
        assert!(!Error::AlreadyComplete.is_recoverable());
        assert!(!Error::InvalidPdf {
            reason: "empty".into()
        }
        .is_recoverable());
    }
}
