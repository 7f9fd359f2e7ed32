use std::path::PathBuf;

use outline::OutlineError;

/// Exit code for a missing input document.
pub const EXIT_NOT_FOUND: i32 = 3;

/// Exit code for every other failure.
pub const EXIT_EXTRACTION_FAILED: i32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Extraction failed: {0}")]
    Extraction(OutlineError),

    #[error("Could not write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotFound(_) => EXIT_NOT_FOUND,
            Error::Extraction(_) | Error::Output { .. } => EXIT_EXTRACTION_FAILED,
        }
    }
}

impl From<OutlineError> for Error {
    fn from(err: OutlineError) -> Self {
        match err {
            OutlineError::NotFound(path) => Error::NotFound(path),
            other => Error::Extraction(other),
        }
    }
}

/// Exit code for a report returned by a subcommand.
pub fn exit_code(report: &color_eyre::eyre::Report) -> i32 {
    report
        .downcast_ref::<Error>()
        .map(Error::exit_code)
        .unwrap_or(EXIT_EXTRACTION_FAILED)
}
