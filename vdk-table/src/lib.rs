//! CT table file reader and writer.
//!
//! A CT file is a strongly-typed row/column container: a 64-byte header
//! holding a UTF-16LE magic (`RO2SEC!` or the older `RO2!`) and
//! timestamp, length-prefixed UTF-16LE column names, `u32` type codes,
//! typed row values, and a trailing CRC-16/XMODEM over the row bytes.

pub mod error;
pub mod reader;
pub mod structs;
pub mod types;
pub mod writer;

pub use error::TableError;
pub use structs::{CtFile, CtMagic};
pub use types::ColumnType;
