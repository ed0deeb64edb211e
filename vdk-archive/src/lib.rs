//! VDISK (`.vdk`) archive container reader and writer.
//!
//! Two on-disk versions exist. `VDISK1.0` carries a fixed magic word in
//! its header; `VDISK1.1` instead appends a flat path-lookup table after
//! the hierarchical section and validates the table's declared size. The
//! hierarchical section serializes a directory tree as 145-byte records
//! with precomputed absolute sibling offsets, file payloads laid out
//! inline between records, and entry names stored in code page 51949
//! (EUC-KR).

pub mod error;
pub mod reader;
pub mod structs;
pub mod writer;

pub use error::ArchiveError;
pub use reader::VdiskArchive;
pub use structs::{Entry, VdiskVersion};
pub use writer::VdiskWriter;

#[cfg(test)]
mod tests;
