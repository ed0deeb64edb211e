use flate2::read::ZlibDecoder;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress};
use std::io::{self, Read, Write};

use crate::checksum;

/// The zlib header every archive producer in the wild emits: deflate with
/// a 32 KiB window, default-flags FLEVEL. The frame is assembled by hand
/// so this byte pair stays stable regardless of the compression level.
const ZLIB_HEADER: [u8; 2] = [0x78, 0x9C];

/// Compress `data` into a zlib container: header, raw deflate at the best
/// level, then the big-endian Adler-32 of the original bytes.
pub fn zlib_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut framed = Vec::with_capacity(data.len() / 2 + 16);
    framed.extend_from_slice(&ZLIB_HEADER);

    let mut encoder = DeflateEncoder::new(framed, Compression::best());
    encoder.write_all(data)?;
    let mut framed = encoder.finish()?;

    framed.extend_from_slice(&checksum::adler32(data).to_be_bytes());
    Ok(framed)
}

/// Inflate a zlib container by skipping its 2-byte header.
///
/// The Adler-32 trailer is deliberately not verified: real archives
/// truncate or omit it, and the caller treats failure as a signal to try
/// the next decompression strategy.
pub fn zlib_decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    if data.len() < 2 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "zlib container shorter than its header",
        ));
    }
    inflate_raw(&data[2..])
}

/// Inflate a headerless raw deflate stream.
pub fn inflate_raw(data: &[u8]) -> io::Result<Vec<u8>> {
    let no_header = Decompress::new(false);
    let mut decoder = ZlibDecoder::new_with_decompress(data, no_header);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
