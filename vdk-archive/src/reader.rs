use binrw::BinReaderExt;
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use vdk_codec::compress;

use crate::error::{ArchiveError, Result};
use crate::structs::{
    Entry, EntryRecord, FLAT_RECORD_SIZE, VDISK10_MAGIC, VdiskHeader, VdiskVersion,
};

/// A VDISK archive opened from disk.
///
/// Loading parses only the directory tree; payloads stay on disk and are
/// fetched by [`VdiskArchive::extract`], which opens its own file handle
/// so entries can be read lazily and independently (including from
/// concurrent read-only callers).
pub struct VdiskArchive {
    path: PathBuf,
    version: VdiskVersion,
    header: VdiskHeader,
    entries: Vec<Entry>,
}

impl VdiskArchive {
    /// Open the archive at `path` and parse its directory tree.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);

        // 1. Version tag and header words, validated per version.
        let (version, header) = read_header(&mut reader)?;

        // 2. Sequential walk of the hierarchical section.
        let expected = header.file_count as usize + header.folder_count as usize;
        let mut entries = Vec::with_capacity(expected + 2);
        walk_level(&mut reader, "", &mut entries)?;

        Ok(Self {
            path,
            version,
            header,
            entries,
        })
    }

    pub const fn version(&self) -> VdiskVersion {
        self.version
    }

    /// Declared file count from the header.
    pub const fn file_count(&self) -> u32 {
        self.header.file_count
    }

    /// Declared count of named directories (`.` and `..` excluded).
    pub const fn folder_count(&self) -> u32 {
        self.header.folder_count
    }

    /// Every entry in stream order, synthetic `.` / `..` markers included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// File entries only.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_directory)
    }

    /// Named directories, excluding the synthetic `.` and `..` markers.
    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| e.is_directory && !e.is_synthetic())
    }

    /// Look up a file entry by its forward-slash archive path.
    pub fn entry_by_path(&self, path: &str) -> Option<&Entry> {
        self.files().find(|e| e.full_path == path)
    }

    /// Read and decompress one file payload.
    pub fn extract(&self, entry: &Entry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(entry.data_position))?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        file.read_exact(&mut raw).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ArchiveError::Truncated("file payload")
            } else {
                ArchiveError::Io(e)
            }
        })?;

        Ok(decompress_payload(raw, entry.uncompressed_size, &entry.full_path))
    }

    /// Extract a file entry to `dest`, creating parent directories.
    pub fn extract_to<P: AsRef<Path>>(&self, entry: &Entry, dest: P) -> Result<()> {
        let data = self.extract(entry)?;
        if let Some(parent) = dest.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, data)?;
        Ok(())
    }
}

fn read_header<R: Read + Seek>(reader: &mut R) -> Result<(VdiskVersion, VdiskHeader)> {
    let mut tag = [0u8; 8];
    reader.read_exact(&mut tag).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ArchiveError::Truncated("version tag")
        } else {
            ArchiveError::Io(e)
        }
    })?;

    let version = VdiskVersion::from_tag(&tag).ok_or_else(|| {
        let printable: String = tag
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();
        ArchiveError::UnknownFormat(printable)
    })?;

    let header: VdiskHeader = reader
        .read_le()
        .map_err(|e| map_binrw_err(e, "archive header"))?;

    match version {
        VdiskVersion::V1_0 => {
            if header.magic != VDISK10_MAGIC {
                return Err(ArchiveError::InvalidHeader(format!(
                    "VDISK1.0 magic word was {:#010X}, expected {VDISK10_MAGIC:#010X}",
                    header.magic
                )));
            }
        }
        VdiskVersion::V1_1 => {
            // The fifth header word must equal the flat-table size implied
            // by the file count.
            let flat_size = reader.read_u32::<LittleEndian>().map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    ArchiveError::Truncated("archive header")
                } else {
                    ArchiveError::Io(e)
                }
            })?;
            let expected = u64::from(header.file_count) * u64::from(FLAT_RECORD_SIZE) + 4;
            if u64::from(flat_size) != expected {
                return Err(ArchiveError::InvalidHeader(format!(
                    "flat table size {flat_size} does not match {} files (expected {expected})",
                    header.file_count
                )));
            }
        }
    }

    Ok((version, header))
}

/// Read one sibling level starting at the current stream position.
///
/// The walk is strictly sequential: payloads sit between records, so the
/// next sibling always begins where the previous subtree (or payload)
/// ends. Stored sibling offsets are informational and never dereferenced.
fn walk_level<R: Read + Seek>(reader: &mut R, parent: &str, entries: &mut Vec<Entry>) -> Result<()> {
    loop {
        let record: EntryRecord = reader
            .read_le()
            .map_err(|e| map_binrw_err(e, "entry record"))?;
        let data_position = reader.stream_position()?;

        let name = record.name();
        let full_path = if parent.is_empty() {
            name.clone()
        } else {
            format!("{parent}/{name}")
        };

        let entry = Entry {
            name,
            full_path,
            is_directory: record.is_directory(),
            uncompressed_size: record.uncompressed_size,
            compressed_size: record.compressed_size,
            sibling_offset: record.sibling_offset,
            data_position,
        };

        let last = entry.sibling_offset == 0;
        let recurse = entry.is_directory && !entry.is_synthetic();
        let child_parent = entry.full_path.clone();
        let payload = entry.compressed_size;
        entries.push(entry);

        if recurse {
            // Children begin immediately after a named directory record.
            walk_level(reader, &child_parent, entries)?;
        } else if payload > 0 {
            reader.seek(SeekFrom::Current(i64::from(payload)))?;
        }

        if last {
            return Ok(());
        }
    }
}

fn map_binrw_err(error: binrw::Error, what: &'static str) -> ArchiveError {
    match error {
        binrw::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            ArchiveError::Truncated(what)
        }
        binrw::Error::Io(e) => ArchiveError::Io(e),
        other => ArchiveError::InvalidHeader(other.to_string()),
    }
}

/// Decompression strategy ladder for file payloads.
///
/// Producers disagree on framing: matching sizes mean the payload was
/// stored, most files are zlib containers, some are bare deflate streams,
/// and anything else is returned as stored bytes.
pub(crate) fn decompress_payload(raw: Vec<u8>, uncompressed_size: u32, path: &str) -> Vec<u8> {
    if raw.len() as u32 == uncompressed_size {
        return raw;
    }

    match compress::zlib_decompress(&raw) {
        Ok(data) => return data,
        Err(e) => log::debug!("zlib inflate failed for {path}: {e}"),
    }

    match compress::inflate_raw(&raw) {
        Ok(data) => {
            log::debug!("{path}: payload was a bare deflate stream");
            return data;
        }
        Err(e) => log::debug!("raw inflate failed for {path}: {e}"),
    }

    log::warn!("{path}: no decompression strategy applied, returning stored bytes");
    raw
}
