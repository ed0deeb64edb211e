/// Size of the fixed file header: magic, null terminator, timestamp and
/// zero padding all live inside it.
pub const HEADER_SIZE: usize = 64;

/// Header magic variant of a CT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CtMagic {
    /// `"RO2SEC!"`, used by current-generation files.
    #[default]
    New,
    /// `"RO2!"`, used by early files still found in the wild.
    Old,
}

impl CtMagic {
    /// The magic text as stored (UTF-16LE on the wire).
    pub const fn text(self) -> &'static str {
        match self {
            Self::New => "RO2SEC!",
            Self::Old => "RO2!",
        }
    }
}

/// An in-memory CT table.
///
/// `headers` and `type_names` have equal length; every row carries one
/// text cell per column. Cell text is the canonical decoded form of each
/// type (see [`crate::types::ColumnType`]).
#[derive(Debug, Clone)]
pub struct CtFile {
    pub magic: CtMagic,
    pub timestamp: String,
    pub headers: Vec<String>,
    pub type_names: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Whether the trailer CRC matched on read. Stays `true` when the
    /// trailer was absent or the table was built in memory.
    pub crc_ok: bool,
}

impl CtFile {
    /// Assemble a table from caller data; the magic defaults to the
    /// current `RO2SEC!` variant.
    pub fn from_parts(
        headers: Vec<String>,
        type_names: Vec<String>,
        rows: Vec<Vec<String>>,
        timestamp: Option<String>,
    ) -> Self {
        Self {
            magic: CtMagic::default(),
            timestamp: timestamp.unwrap_or_default(),
            headers,
            type_names,
            rows,
            crc_ok: true,
        }
    }
}
