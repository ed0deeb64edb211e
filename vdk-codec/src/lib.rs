//! Byte-level primitives shared by the VDK archive and CT table codecs.
//!
//! Both formats are little-endian throughout, store text either as
//! `u32`-length-prefixed UTF-16LE or as null-padded code page 51949
//! (EUC-KR) fields, and rely on zlib-container compression with a
//! big-endian Adler-32 trailer. This crate owns those primitives so the
//! two format crates share one implementation.

pub mod checksum;
pub mod compress;
pub mod strings;
