use crate::error::{Error, Result};
use std::path::Path;

/// Extract a short text preview of a single-page PDF: the first
/// `max_lines` non-empty lines.
pub fn page_preview<P: AsRef<Path>>(path: P, max_lines: usize) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| Error::InvalidPdf {
        reason: format!("text extraction failed: {}", e),
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n"))
}
