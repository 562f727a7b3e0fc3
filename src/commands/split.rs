use crate::pdf::{split_pages, PdfDocument};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output_dir: Q) -> Result<()> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    let doc = PdfDocument::open(input)
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    // Get the base name of the input file
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");

    let pages = split_pages(&doc, output_dir, stem)
        .with_context(|| format!("Failed to split into {}", output_dir.display()))?;

    println!("Split {} pages into {}", pages.len(), output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn test_split_uses_input_stem() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clinic_batch.pdf");
        std::fs::write(&input, sample_pdf(2)).unwrap();

        let out = dir.path().join("pages");
        run(&input, &out).unwrap();

        assert!(out.join("clinic_batch_0001.pdf").is_file());
        assert!(out.join("clinic_batch_0002.pdf").is_file());
        assert!(!out.join("clinic_batch_0003.pdf").exists());
    }

    #[test]
    fn test_split_rejects_non_pdf_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.pdf");
        std::fs::write(&input, "not a pdf").unwrap();

        let out = dir.path().join("pages");
        assert!(run(&input, &out).is_err());
        assert!(!out.exists());
    }
}
