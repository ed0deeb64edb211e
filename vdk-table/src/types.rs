//! The CT column type system: code and name mappings plus per-type value
//! encoding.
//!
//! Every cell travels as decoded text in the in-memory model; this module
//! owns the translation between that text and the wire form each type
//! code mandates.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Read, Write};

use vdk_codec::strings;

use crate::error::{Result, TableError};

/// Column value type, from the `u32` code stored in a CT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Byte,
    Short,
    Word,
    Int,
    Dword,
    /// `u32` rendered as `0x`-prefixed uppercase hex.
    DwordHex,
    String,
    Float,
    Int64,
    Bool,
    /// A code without a mapping; valued as `i32` in both directions.
    Unknown(u32),
}

impl ColumnType {
    pub const fn code(self) -> u32 {
        match self {
            Self::Byte => 2,
            Self::Short => 3,
            Self::Word => 4,
            Self::Int => 5,
            Self::Dword => 6,
            Self::DwordHex => 7,
            Self::String => 8,
            Self::Float => 9,
            Self::Int64 => 11,
            Self::Bool => 12,
            Self::Unknown(code) => code,
        }
    }

    pub const fn from_code(code: u32) -> Self {
        match code {
            2 => Self::Byte,
            3 => Self::Short,
            4 => Self::Word,
            5 => Self::Int,
            6 => Self::Dword,
            7 => Self::DwordHex,
            8 => Self::String,
            9 => Self::Float,
            11 => Self::Int64,
            12 => Self::Bool,
            other => Self::Unknown(other),
        }
    }

    pub fn name(self) -> Cow<'static, str> {
        match self {
            Self::Byte => Cow::Borrowed("BYTE"),
            Self::Short => Cow::Borrowed("SHORT"),
            Self::Word => Cow::Borrowed("WORD"),
            Self::Int => Cow::Borrowed("INT"),
            Self::Dword => Cow::Borrowed("DWORD"),
            Self::DwordHex => Cow::Borrowed("DWORD_HEX"),
            Self::String => Cow::Borrowed("STRING"),
            Self::Float => Cow::Borrowed("FLOAT"),
            Self::Int64 => Cow::Borrowed("INT64"),
            Self::Bool => Cow::Borrowed("BOOL"),
            Self::Unknown(code) => Cow::Owned(format!("UNKNOWN_{code}")),
        }
    }

    /// Inverse of [`ColumnType::name`], `UNKNOWN_<n>` spelling included,
    /// so a read table always re-writes.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "BYTE" => Self::Byte,
            "SHORT" => Self::Short,
            "WORD" => Self::Word,
            "INT" => Self::Int,
            "DWORD" => Self::Dword,
            "DWORD_HEX" => Self::DwordHex,
            "STRING" => Self::String,
            "FLOAT" => Self::Float,
            "INT64" => Self::Int64,
            "BOOL" => Self::Bool,
            other => {
                let code = other.strip_prefix("UNKNOWN_")?.parse().ok()?;
                Self::Unknown(code)
            }
        })
    }

    /// Decode one wire value into its canonical text form.
    pub fn decode_value<R: Read>(self, reader: &mut R) -> io::Result<String> {
        Ok(match self {
            Self::Byte | Self::Bool => reader.read_u8()?.to_string(),
            Self::Short => reader.read_i16::<LittleEndian>()?.to_string(),
            Self::Word => reader.read_u16::<LittleEndian>()?.to_string(),
            Self::Int | Self::Unknown(_) => reader.read_i32::<LittleEndian>()?.to_string(),
            Self::Dword => reader.read_u32::<LittleEndian>()?.to_string(),
            Self::DwordHex => format!("{:#X}", reader.read_u32::<LittleEndian>()?),
            Self::Float => reader.read_f32::<LittleEndian>()?.to_string(),
            Self::Int64 => reader.read_i64::<LittleEndian>()?.to_string(),
            Self::String => strings::read_utf16_string(reader)?,
        })
    }

    /// Parse canonical text and write its wire form.
    ///
    /// Empty cells count as zero (the empty string for `STRING`).
    pub fn encode_value<W: Write>(
        self,
        writer: &mut W,
        text: &str,
        row: usize,
        column: usize,
    ) -> Result<()> {
        let text = if text.is_empty() && self != Self::String {
            "0"
        } else {
            text
        };
        let invalid = || TableError::InvalidCellValue {
            row,
            column,
            type_name: self.name().into_owned(),
            value: text.to_string(),
        };

        match self {
            Self::Byte | Self::Bool => {
                writer.write_u8(text.parse().map_err(|_| invalid())?)?;
            }
            Self::Short => {
                writer.write_i16::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::Word => {
                writer.write_u16::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::Int | Self::Unknown(_) => {
                writer.write_i32::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::Dword => {
                writer.write_u32::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::DwordHex => {
                let value = parse_dword_hex(text).ok_or_else(invalid)?;
                writer.write_u32::<LittleEndian>(value)?;
            }
            Self::Float => {
                writer.write_f32::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::Int64 => {
                writer.write_i64::<LittleEndian>(text.parse().map_err(|_| invalid())?)?;
            }
            Self::String => {
                strings::write_utf16_string(writer, text)?;
            }
        }
        Ok(())
    }
}

/// `0x`-prefixed hex in either case, or plain decimal.
fn parse_dword_hex(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
