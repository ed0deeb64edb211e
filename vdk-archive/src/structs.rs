use binrw::BinRead;

use vdk_codec::strings;

/// Size of one on-disk entry record.
pub const ENTRY_SIZE: u32 = 145;

/// Size of the name field inside an entry record. Names keep a trailing
/// null inside the field, so the longest encodable name is 127 bytes.
pub const NAME_FIELD_SIZE: usize = 128;

/// Word required at header bytes 8..12 of a VDISK1.0 archive.
pub const VDISK10_MAGIC: u32 = 0xFFFF_FF00;

/// Size of one flat-table record: 260 path bytes plus a `u32` offset.
pub const FLAT_RECORD_SIZE: u32 = 264;

/// Size of the path field inside a flat-table record.
pub const FLAT_PATH_SIZE: usize = 260;

/// Archive container version, from the 8-byte ASCII tag at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdiskVersion {
    /// `VDISK1.0`: hierarchical section only, fixed magic word.
    V1_0,
    /// `VDISK1.1`: adds the flat path-lookup table and validates its size.
    V1_1,
}

impl VdiskVersion {
    /// The on-disk tag. Both known tags fill all 8 bytes.
    pub const fn tag(self) -> &'static [u8; 8] {
        match self {
            Self::V1_0 => b"VDISK1.0",
            Self::V1_1 => b"VDISK1.1",
        }
    }

    pub fn from_tag(tag: &[u8; 8]) -> Option<Self> {
        match tag {
            b"VDISK1.0" => Some(Self::V1_0),
            b"VDISK1.1" => Some(Self::V1_1),
            _ => None,
        }
    }
}

/// Fixed header words following the version tag (bytes 8..24).
#[derive(BinRead, Debug, Clone)]
pub struct VdiskHeader {
    /// `0xFFFFFF00` in VDISK1.0 archives; written as 0 in VDISK1.1.
    pub magic: u32,
    pub file_count: u32,
    pub folder_count: u32,
    /// Size of the hierarchical section in bytes.
    pub total_size: u32,
}

/// Raw 145-byte entry record as stored on disk.
#[derive(BinRead, Debug, Clone)]
pub struct EntryRecord {
    pub flag: u8,
    pub name: [u8; NAME_FIELD_SIZE],
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    /// Written as zero; kept for layout fidelity.
    pub reserved: u32,
    pub sibling_offset: u32,
}

impl EntryRecord {
    pub const fn is_directory(&self) -> bool {
        self.flag != 0
    }

    /// Decode the null-padded code page 51949 name field.
    pub fn name(&self) -> String {
        strings::decode_euc_kr(&self.name)
    }
}

/// A decoded archive entry.
///
/// Directories carry zero sizes. `data_position` is the stream offset
/// immediately after the 145-byte record; for files the payload bytes
/// begin there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// Forward-slash separated path from the archive root.
    pub full_path: String,
    pub is_directory: bool,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    /// Absolute offset of the next sibling record; 0 marks the last
    /// sibling at this level.
    pub sibling_offset: u32,
    pub data_position: u64,
}

impl Entry {
    /// Whether this is one of the synthetic `.` / `..` level markers.
    pub fn is_synthetic(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}
