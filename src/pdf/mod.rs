pub mod document;
pub mod split;
pub mod text;

#[cfg(test)]
pub mod fixtures;

pub use document::PdfDocument;
pub use split::{split_pages, PageDocument};
