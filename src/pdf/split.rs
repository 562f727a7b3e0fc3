use super::PdfDocument;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// One extracted page on disk, identified by its 1-based ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub ordinal: u32,
    pub path: PathBuf,
}

/// Write every page of `doc` to `output_dir` as `<stem>_NNNN.pdf`, in page order.
pub fn split_pages(doc: &PdfDocument, output_dir: &Path, stem: &str) -> Result<Vec<PageDocument>> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

    let total_pages = doc.page_count();
    let mut pages = Vec::with_capacity(total_pages as usize);

    for ordinal in 1..=total_pages {
        let path = output_dir.join(format!("{}_{:04}.pdf", stem, ordinal));

        let mut page_doc = doc.extract_page(ordinal)?;
        PdfDocument::save(&mut page_doc, &path)?;
        tracing::debug!(page = ordinal, path = %path.display(), "wrote page");

        pages.push(PageDocument { ordinal, path });
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn test_split_produces_one_file_per_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PdfDocument::from_bytes(&sample_pdf(5)).unwrap();

        let pages = split_pages(&doc, dir.path(), "page").unwrap();

        assert_eq!(pages.len(), 5);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.ordinal, i as u32 + 1);
            assert_eq!(
                page.path.file_name().unwrap().to_str().unwrap(),
                format!("page_{:04}.pdf", i + 1)
            );
            let single = PdfDocument::open(&page.path).unwrap();
            assert_eq!(single.page_count(), 1);
        }
    }

    #[test]
    fn test_split_single_page_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PdfDocument::from_bytes(&sample_pdf(1)).unwrap();

        let pages = split_pages(&doc, dir.path(), "scan").unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].path.ends_with("scan_0001.pdf"));
    }

    #[test]
    fn test_split_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let doc = PdfDocument::from_bytes(&sample_pdf(2)).unwrap();

        let pages = split_pages(&doc, &nested, "page").unwrap();
        assert_eq!(pages.len(), 2);
        assert!(nested.is_dir());
    }
}
