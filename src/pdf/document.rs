use crate::error::{Error, Result};
use lopdf::{Document, ObjectId};
use std::path::Path;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

pub struct PdfDocument {
    pub doc: Document,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    /// Parse uploaded bytes, rejecting anything that is not a PDF with at
    /// least one page.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        if !bytes[start..].starts_with(PDF_SIGNATURE) {
            return Err(Error::InvalidPdf {
                reason: "missing %PDF- signature".to_string(),
            });
        }

        let doc = Document::load_mem(bytes).map_err(|e| Error::InvalidPdf {
            reason: e.to_string(),
        })?;

        let pdf = PdfDocument { doc };
        if pdf.page_count() == 0 {
            return Err(Error::InvalidPdf {
                reason: "document has no pages".to_string(),
            });
        }
        Ok(pdf)
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Get 1-indexed page object IDs
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        let mut pages: Vec<_> = self.doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(num, _)| *num);
        pages
    }

    /// Extract a single page into a standalone document
    pub fn extract_page(&self, page: u32) -> Result<Document> {
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;

        if page == 0 || page > total {
            return Err(Error::InvalidPdf {
                reason: format!("page {} is out of range (1-{})", page, total),
            });
        }

        let pages_to_delete: Vec<u32> = all_pages
            .iter()
            .map(|(num, _)| *num)
            .filter(|num| *num != page)
            .collect();

        let mut new_doc = self.doc.clone();
        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
        }
        // Drop resources only the deleted pages referenced
        new_doc.prune_objects();
        new_doc.compress();

        Ok(new_doc)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| Error::InvalidPdf {
            reason: format!("failed to serialize {}: {}", path.display(), e),
        })?;
        std::fs::write(path, buffer).map_err(|e| Error::io(path, e))?;
        Ok(())
    }
}
