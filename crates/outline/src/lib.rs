use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

pub mod assemble;
pub mod classify;
pub mod hierarchy;
pub mod parser;
pub mod source;
pub mod types;

pub use assemble::{assemble, UNTITLED};
pub use classify::{cluster_font_sizes, ClusterParams};
pub use hierarchy::{LevelMap, RankedClass};
pub use source::{LineSource, PdfLineSource};
pub use types::*;

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutlineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OutlineError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The two-stage outline pipeline: size classification, then assembly.
///
/// Holds nothing but its parameters, so one extractor can be reused across
/// any number of unrelated documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    params: ClusterParams,
}

impl Extractor {
    pub fn new(params: ClusterParams) -> Result<Self, OutlineError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Pull lines from `source` and build the outline. Fails only if the
    /// source fails.
    pub fn extract(&self, source: &dyn LineSource) -> Result<Outline, OutlineError> {
        let extracted = source.extract_lines()?;
        Ok(self.outline(&extracted))
    }

    /// Build the outline of already-extracted lines.
    pub fn outline(&self, extracted: &ExtractedLines) -> Outline {
        let levels = self.levels(&extracted.lines);
        debug!(
            "{} lines, {} size classes",
            extracted.lines.len(),
            levels.len()
        );
        assemble(
            &extracted.lines,
            &levels,
            extracted.metadata_title.as_deref(),
        )
    }

    /// Cluster the font sizes of `lines` and rank the classes.
    pub fn levels(&self, lines: &[LineRecord]) -> LevelMap {
        let sizes: Vec<f32> = lines.iter().map(|l| l.font_size).collect();
        LevelMap::from_classes(&cluster_font_sizes(&sizes, &self.params))
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (path based)
// ---------------------------------------------------------------------------

/// Read a document, reporting a missing file as [`OutlineError::NotFound`].
pub fn read_document(path: impl AsRef<Path>) -> Result<Vec<u8>, OutlineError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OutlineError::NotFound(path.to_path_buf()),
        _ => OutlineError::Io(e),
    })
}

/// Extract the outline of the PDF at `path`.
pub fn extract_outline(
    path: impl AsRef<Path>,
    params: ClusterParams,
) -> Result<Outline, OutlineError> {
    let bytes = read_document(path)?;
    extract_outline_from_bytes(&bytes, params)
}

/// Extract the outline of an in-memory PDF.
pub fn extract_outline_from_bytes(
    bytes: &[u8],
    params: ClusterParams,
) -> Result<Outline, OutlineError> {
    let extractor = Extractor::new(params)?;
    let source = PdfLineSource::from_bytes(bytes)?;
    extractor.extract(&source)
}

/// Size classes of the PDF at `path`, ranked into levels.
pub fn size_classes(
    path: impl AsRef<Path>,
    params: ClusterParams,
) -> Result<Vec<RankedClass>, OutlineError> {
    let extractor = Extractor::new(params)?;
    let source = PdfLineSource::from_bytes(&read_document(path)?)?;
    let extracted = source.extract_lines()?;
    Ok(extractor.levels(&extracted.lines).entries().to_vec())
}

/// Document metadata of the PDF at `path`.
pub fn info(path: impl AsRef<Path>) -> Result<DocumentMetadata, OutlineError> {
    let source = PdfLineSource::from_bytes(&read_document(path)?)?;
    Ok(source.metadata())
}
