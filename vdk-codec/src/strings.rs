use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::{EUC_KR, UTF_16LE};
use std::io::{self, Read, Write};

/// Read a `u32` character-count-prefixed UTF-16LE string.
///
/// The prefix counts UTF-16 code units, not bytes. A zero prefix is an
/// empty string with no payload bytes at all.
pub fn read_utf16_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let chars = reader.read_u32::<LittleEndian>()? as usize;
    if chars == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; chars * 2];
    reader.read_exact(&mut buf)?;
    Ok(decode_utf16le(&buf))
}

/// Write a string as a `u32` character-count prefix plus UTF-16LE code units.
pub fn write_utf16_string<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    let units: Vec<u16> = text.encode_utf16().collect();
    writer.write_u32::<LittleEndian>(units.len() as u32)?;
    for unit in units {
        writer.write_u16::<LittleEndian>(unit)?;
    }
    Ok(())
}

/// Decode UTF-16LE bytes, substituting the replacement character for
/// unpaired surrogates.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let (text, _, _) = UTF_16LE.decode(bytes);
    text.into_owned()
}

/// Encode a string as bare UTF-16LE bytes, no length prefix.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decode a code page 51949 (EUC-KR) field, stopping at the first null.
pub fn decode_euc_kr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let (text, _, _) = EUC_KR.decode(&bytes[..end]);
    text.into_owned()
}

/// Encode a name into code page 51949 (EUC-KR).
///
/// Returns `None` when any character has no mapping in the code page.
pub fn encode_euc_kr(text: &str) -> Option<Vec<u8>> {
    let (bytes, _, had_errors) = EUC_KR.encode(text);
    if had_errors {
        None
    } else {
        Some(bytes.into_owned())
    }
}
