use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use vdk_codec::{checksum, strings};

use crate::error::{Result, TableError};
use crate::structs::{CtFile, CtMagic, HEADER_SIZE};
use crate::types::ColumnType;

impl CtFile {
    /// Read and decode the CT file at `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Decode a CT table from any byte stream.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        // 1. Fixed 64-byte header: magic variant, UTF-16 null, timestamp.
        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .map_err(|e| truncated(e, "file header"))?;
        let (magic, magic_len) = detect_magic(&header)?;
        let timestamp = read_timestamp(&header[magic_len + 2..]);

        // 2. Column names.
        let column_count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, "column count"))?;
        let mut headers = Vec::with_capacity(column_count as usize);
        for _ in 0..column_count {
            let name = strings::read_utf16_string(&mut reader)
                .map_err(|e| truncated(e, "column name"))?;
            headers.push(name);
        }

        // 3. Type codes.
        let type_count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, "type count"))?;
        let mut types = Vec::with_capacity(type_count as usize);
        for _ in 0..type_count {
            let code = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| truncated(e, "type code"))?;
            types.push(ColumnType::from_code(code));
        }

        // 4. Rows. The remaining bytes are buffered so the row payload
        //    can be checksummed exactly as the writer framed it.
        let row_count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, "row count"))?;
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;

        let mut cursor = Cursor::new(&body[..]);
        let mut rows = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(types.len());
            for ty in &types {
                let value = ty
                    .decode_value(&mut cursor)
                    .map_err(|e| truncated(e, "row value"))?;
                row.push(value);
            }
            rows.push(row);
        }
        let consumed = cursor.position() as usize;

        // 5. Optional CRC trailer; a mismatch is diagnostic only.
        let mut crc_ok = true;
        if body.len() - consumed >= 2 {
            let stored = u16::from_le_bytes([body[consumed], body[consumed + 1]]);
            let computed = checksum::crc16_xmodem(&body[..consumed]);
            if stored != computed {
                log::warn!("{}", TableError::ChecksumMismatch { stored, computed });
                crc_ok = false;
            }
        }

        let type_names = types.iter().map(|ty| ty.name().into_owned()).collect();
        Ok(Self {
            magic,
            timestamp,
            headers,
            type_names,
            rows,
            crc_ok,
        })
    }
}

/// Probe the header for a known magic. The longer `RO2SEC!` form is
/// tried first; each magic is followed on the wire by a UTF-16 null.
fn detect_magic(header: &[u8]) -> Result<(CtMagic, usize)> {
    for magic in [CtMagic::New, CtMagic::Old] {
        let encoded = strings::encode_utf16le(magic.text());
        if header.len() >= encoded.len() && header[..encoded.len()] == encoded[..] {
            return Ok((magic, encoded.len()));
        }
    }
    Err(TableError::InvalidMagic)
}

/// Collect UTF-16LE code units up to the next null (or the end of the
/// header).
fn read_timestamp(bytes: &[u8]) -> String {
    let mut units = Vec::new();
    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16_lossy(&units)
}

fn truncated(error: io::Error, what: &'static str) -> TableError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        TableError::Truncated(what)
    } else {
        TableError::Io(error)
    }
}
