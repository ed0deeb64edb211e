use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vdk_codec::{checksum, strings};

use crate::error::{Result, TableError};
use crate::structs::{CtFile, HEADER_SIZE};
use crate::types::ColumnType;

impl CtFile {
    /// One-shot write of caller data to `path` with the default magic.
    pub fn write_parts<P: AsRef<Path>>(
        path: P,
        headers: Vec<String>,
        type_names: Vec<String>,
        rows: Vec<Vec<String>>,
        timestamp: Option<String>,
    ) -> Result<()> {
        Self::from_parts(headers, type_names, rows, timestamp).write(path)
    }

    /// Encode and write this table to `path` (truncating any existing
    /// file).
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Encode this table into any byte sink.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let types = self
            .type_names
            .iter()
            .map(|name| {
                ColumnType::from_name(name)
                    .ok_or_else(|| TableError::UnknownTypeName(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        // 1. 64-byte header: magic, UTF-16 null, timestamp, zero padding.
        //    The timestamp is truncated so at least one trailing UTF-16
        //    null survives inside the header.
        let mut header = [0u8; HEADER_SIZE];
        let magic = strings::encode_utf16le(self.magic.text());
        header[..magic.len()].copy_from_slice(&magic);

        let timestamp_start = magic.len() + 2;
        let mut timestamp = strings::encode_utf16le(&self.timestamp);
        let available = (HEADER_SIZE - timestamp_start - 2) & !1;
        timestamp.truncate(available);
        header[timestamp_start..timestamp_start + timestamp.len()].copy_from_slice(&timestamp);
        writer.write_all(&header)?;

        // 2. Column names and type codes.
        writer.write_u32::<LittleEndian>(self.headers.len() as u32)?;
        for name in &self.headers {
            strings::write_utf16_string(&mut writer, name)?;
        }

        writer.write_u32::<LittleEndian>(types.len() as u32)?;
        for ty in &types {
            writer.write_u32::<LittleEndian>(ty.code())?;
        }

        // 3. Rows, staged in one buffer: the CRC trailer covers the
        //    row-value bytes only, not the header or the count words.
        writer.write_u32::<LittleEndian>(self.rows.len() as u32)?;
        let mut payload = Vec::new();
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column, ty) in types.iter().enumerate() {
                let text = row.get(column).map(String::as_str).unwrap_or("");
                ty.encode_value(&mut payload, text, row_index, column)?;
            }
        }
        writer.write_all(&payload)?;
        writer.write_u16::<LittleEndian>(checksum::crc16_xmodem(&payload))?;

        Ok(())
    }
}
