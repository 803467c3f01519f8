//! Extraction adapters backed by external tools.

pub mod pdf_text;

pub use pdf_text::PdfTextAdapter;
