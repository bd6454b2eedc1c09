//! Error taxonomy for anonymization and document rewriting.
//!
//! Validation problems abort before any matching work; everything that can go
//! wrong per entity or per run is recovered locally and surfaced through
//! reports or warnings instead.

use thiserror::Error;

/// Input document rejected before any matching work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document is empty")]
    Empty,

    #[error("document too small: {size} bytes (minimum {min})")]
    TooSmall { size: usize, min: usize },

    #[error("missing {expected} container signature")]
    BadSignature { expected: &'static str },

    #[error("document is encrypted")]
    Encrypted,

    #[error("document has no pages")]
    NoPages,

    #[error("document has no paragraphs")]
    NoParagraphs,
}

/// Top-level library error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Conversion(#[from] crate::convert::ExternalToolFailure),
}

pub type Result<T> = std::result::Result<T, Error>;
