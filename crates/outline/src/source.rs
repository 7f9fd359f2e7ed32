use crate::parser::backend::LopdfBackend;
use crate::parser::layout;
use crate::types::{DocumentMetadata, ExtractedLines};
use crate::OutlineError;

/// Anything that can produce the per-line records of one document.
///
/// The outline core only sees this trait, so tests can feed it synthetic
/// lines and other document formats can plug in their own extractor.
pub trait LineSource {
    fn extract_lines(&self) -> Result<ExtractedLines, OutlineError>;
}

/// [`LineSource`] over a parsed PDF.
pub struct PdfLineSource {
    backend: LopdfBackend,
}

impl PdfLineSource {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OutlineError> {
        Ok(Self {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn metadata(&self) -> DocumentMetadata {
        self.backend.metadata()
    }
}

impl LineSource for PdfLineSource {
    fn extract_lines(&self) -> Result<ExtractedLines, OutlineError> {
        Ok(ExtractedLines {
            lines: layout::extract_line_records(&self.backend)?,
            metadata_title: self.backend.metadata().title,
        })
    }
}

/// Pre-extracted lines, returned as-is.
impl LineSource for ExtractedLines {
    fn extract_lines(&self) -> Result<ExtractedLines, OutlineError> {
        Ok(self.clone())
    }
}
