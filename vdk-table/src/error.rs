//! Error types for CT table operations.

use thiserror::Error;

/// Main error type for table reading and writing.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a CT file: unrecognized header magic")]
    InvalidMagic,

    #[error("Table truncated while reading {0}")]
    Truncated(&'static str),

    #[error("Row {row}, column {column}: {value:?} is not a valid {type_name}")]
    InvalidCellValue {
        row: usize,
        column: usize,
        type_name: String,
        value: String,
    },

    #[error("Unknown column type name: {0:?}")]
    UnknownTypeName(String),

    /// Diagnostic only: readers log this and carry on.
    #[error("Row checksum mismatch: stored {stored:#06X}, computed {computed:#06X}")]
    ChecksumMismatch { stored: u16, computed: u16 },
}

/// A convenience `Result` alias using [`TableError`].
pub type Result<T> = std::result::Result<T, TableError>;
