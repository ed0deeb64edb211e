//! Error types for VDISK archive operations.

use thiserror::Error;

/// Main error type for archive reading and writing.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid archive header: {0}")]
    InvalidHeader(String),

    #[error("Unknown archive format: {0:?}")]
    UnknownFormat(String),

    #[error("Archive truncated while reading {0}")]
    Truncated(&'static str),

    #[error("Name not representable in code page 51949: {0:?}")]
    UnencodableName(String),
}

/// A convenience `Result` alias using [`ArchiveError`].
pub type Result<T> = std::result::Result<T, ArchiveError>;
