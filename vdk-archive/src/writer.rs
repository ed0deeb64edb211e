use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use walkdir::WalkDir;

use vdk_codec::{compress, strings};

use crate::error::{ArchiveError, Result};
use crate::structs::{ENTRY_SIZE, FLAT_PATH_SIZE, FLAT_RECORD_SIZE, NAME_FIELD_SIZE, VdiskVersion};

/// Size of the VDISK1.1 header reserved at offset 0 and backfilled after
/// the flat table is written.
const HEADER_SIZE: usize = 28;

const E: u64 = ENTRY_SIZE as u64;

/// Stages an in-memory file tree and serializes it as a VDISK1.1 archive.
///
/// Entries are held in memory until [`VdiskWriter::write`]; intermediate
/// directories are created implicitly from path components. Names are
/// validated against code page 51949 at write time, where the record
/// fields are actually encoded.
#[derive(Default)]
pub struct VdiskWriter {
    root: DirNode,
}

#[derive(Default)]
struct DirNode {
    subdirs: Vec<(String, DirNode)>,
    files: Vec<(String, Vec<u8>)>,
}

impl DirNode {
    fn child_dir(&mut self, name: &str) -> &mut DirNode {
        // Entry API on a Vec: linear scan keeps insertion order for the
        // later case-insensitive sort.
        let index = match self.subdirs.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.subdirs.push((name.to_string(), DirNode::default()));
                self.subdirs.len() - 1
            }
        };
        &mut self.subdirs[index].1
    }

    fn insert(&mut self, components: &[&str], data: Vec<u8>) {
        match components {
            [] => {}
            [file_name] => {
                match self.files.iter_mut().find(|(n, _)| n == file_name) {
                    Some((_, existing)) => *existing = data,
                    None => self.files.push(((*file_name).to_string(), data)),
                }
            }
            [dir_name, rest @ ..] => self.child_dir(dir_name).insert(rest, data),
        }
    }

    fn folder_count(&self) -> u32 {
        self.subdirs
            .iter()
            .map(|(_, sub)| 1 + sub.folder_count())
            .sum()
    }
}

impl VdiskWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one file under `archive_path`. Separators are normalized to
    /// `/`; an existing file at the same path is replaced.
    pub fn add_file(&mut self, archive_path: &str, data: Vec<u8>) {
        let normalized = archive_path.replace('\\', "/");
        let components: Vec<&str> = normalized
            .split('/')
            .filter(|part| !part.is_empty())
            .collect();
        self.root.insert(&components, data);
    }

    /// Recursively stage every file under `source_dir`, reporting each
    /// stored archive path through `progress`. Returns the number of
    /// files added. A failed read aborts the whole ingest.
    pub fn add_directory<P: AsRef<Path>, F: FnMut(&str)>(
        &mut self,
        source_dir: P,
        mut progress: F,
    ) -> Result<u32> {
        let root = source_dir.as_ref();
        let mut added = 0u32;

        for walked in WalkDir::new(root).sort_by_file_name() {
            let walked = walked.map_err(|e| {
                let message = e.to_string();
                ArchiveError::Io(e.into_io_error().unwrap_or_else(|| io::Error::other(message)))
            })?;
            if !walked.file_type().is_file() {
                continue;
            }

            let relative = walked.path().strip_prefix(root).unwrap_or(walked.path());
            let Some(relative) = relative.to_str() else {
                return Err(ArchiveError::UnencodableName(
                    relative.to_string_lossy().into_owned(),
                ));
            };
            let archive_path = relative.replace('\\', "/");

            let data = std::fs::read(walked.path())?;
            self.add_file(&archive_path, data);
            progress(&archive_path);
            added += 1;
        }

        Ok(added)
    }

    /// Serialize the staged tree to `path` (truncating any existing
    /// file). Returns the number of file entries written.
    pub fn write<P: AsRef<Path>>(&self, path: P, compress_payloads: bool) -> Result<u32> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let count = self.write_to(&mut writer, compress_payloads)?;
        writer.flush()?;
        Ok(count)
    }

    /// Serialize the staged tree into any seekable sink.
    pub fn write_to<W: Write + Seek>(&self, mut writer: W, compress_payloads: bool) -> Result<u32> {
        let root = prepare(&self.root, compress_payloads)?;

        // Header fields depend on section sizes; reserve and backfill.
        writer.write_all(&[0u8; HEADER_SIZE])?;
        let mut pos = HEADER_SIZE as u64;
        let mut flat = Vec::new();

        // A single root `.` precedes the top-level children; in an empty
        // archive it is the only record at all.
        let children_size: u64 = root
            .subdirs
            .iter()
            .map(|(_, sub)| E + sub.size)
            .chain(root.files.iter().map(|f| E + f.payload.len() as u64))
            .sum();
        let root_sibling = if children_size == 0 {
            0
        } else {
            wire_offset(pos + E)?
        };
        write_entry(&mut writer, true, ".", 0, 0, root_sibling)?;
        pos += E;

        emit_children(&mut writer, &root, "", true, &mut pos, &mut flat)?;
        let hierarchical_size = pos - HEADER_SIZE as u64;

        // Flat secondary table: uppercase full paths to entry offsets.
        let file_count = flat.len() as u32;
        writer.write_u32::<LittleEndian>(file_count)?;
        for record in &flat {
            let upper = record.path.to_uppercase();
            let encoded = strings::encode_euc_kr(&upper)
                .ok_or_else(|| ArchiveError::UnencodableName(upper.clone()))?;
            if encoded.len() > FLAT_PATH_SIZE {
                return Err(ArchiveError::UnencodableName(upper));
            }
            let mut field = [0u8; FLAT_PATH_SIZE];
            field[..encoded.len()].copy_from_slice(&encoded);
            writer.write_all(&field)?;
            writer.write_u32::<LittleEndian>(record.offset)?;
        }

        // Backfill the final header.
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(VdiskVersion::V1_1.tag())?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_u32::<LittleEndian>(file_count)?;
        writer.write_u32::<LittleEndian>(self.root.folder_count())?;
        writer.write_u32::<LittleEndian>(wire_offset(hierarchical_size)?)?;
        let flat_size = u64::from(file_count) * u64::from(FLAT_RECORD_SIZE) + 4;
        writer.write_u32::<LittleEndian>(wire_offset(flat_size)?)?;

        Ok(file_count)
    }
}

struct PreparedFile {
    name: String,
    uncompressed_size: u32,
    payload: Vec<u8>,
}

struct PreparedNode {
    subdirs: Vec<(String, PreparedNode)>,
    files: Vec<PreparedFile>,
    /// Serialized size of this node's child level: the synthetic pair,
    /// every child record, subtree bytes and payload bytes.
    size: u64,
}

/// Sort children, compress payloads once, and compute subtree sizes
/// bottom-up so sibling offsets can be emitted in a single pass.
fn prepare(node: &DirNode, compress_payloads: bool) -> Result<PreparedNode> {
    let mut subdirs = node
        .subdirs
        .iter()
        .map(|(name, sub)| Ok((name.clone(), prepare(sub, compress_payloads)?)))
        .collect::<Result<Vec<_>>>()?;
    subdirs.sort_by_key(|(name, _)| name.to_lowercase());

    let mut files = node
        .files
        .iter()
        .map(|(name, data)| {
            let uncompressed_size = u32::try_from(data.len()).map_err(|_| {
                ArchiveError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "file exceeds the 32-bit size space",
                ))
            })?;
            let payload = if compress_payloads {
                maybe_compress(data)?
            } else {
                data.clone()
            };
            Ok(PreparedFile {
                name: name.clone(),
                uncompressed_size,
                payload,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    files.sort_by_key(|f| f.name.to_lowercase());

    let size = 2 * E
        + subdirs.iter().map(|(_, sub)| E + sub.size).sum::<u64>()
        + files.iter().map(|f| E + f.payload.len() as u64).sum::<u64>();

    Ok(PreparedNode {
        subdirs,
        files,
        size,
    })
}

/// Frame `data` as a zlib container; keep the original when compression
/// is not strictly smaller.
fn maybe_compress(data: &[u8]) -> Result<Vec<u8>> {
    let framed = compress::zlib_compress(data)?;
    if framed.len() < data.len() {
        Ok(framed)
    } else {
        Ok(data.to_vec())
    }
}

struct FlatRecord {
    path: String,
    offset: u32,
}

/// Emit one sibling level: the synthetic `.` / `..` pair (non-root
/// levels), then subdirectory subtrees, then files with their payloads.
/// Sibling offsets are absolute; the last child at each level carries 0.
fn emit_children<W: Write>(
    writer: &mut W,
    node: &PreparedNode,
    dir_path: &str,
    is_root: bool,
    pos: &mut u64,
    flat: &mut Vec<FlatRecord>,
) -> Result<()> {
    let child_count = node.subdirs.len() + node.files.len();

    if !is_root {
        write_entry(writer, true, ".", 0, 0, wire_offset(*pos + E)?)?;
        *pos += E;

        let dotdot_sibling = if child_count == 0 {
            0
        } else {
            wire_offset(*pos + E)?
        };
        write_entry(writer, true, "..", 0, 0, dotdot_sibling)?;
        *pos += E;
    }

    let mut remaining = child_count;

    for (name, sub) in &node.subdirs {
        remaining -= 1;
        let next = *pos + E + sub.size;
        let sibling = if remaining == 0 { 0 } else { wire_offset(next)? };
        write_entry(writer, true, name, 0, 0, sibling)?;
        *pos += E;

        let sub_path = join_path(dir_path, name);
        emit_children(writer, sub, &sub_path, false, pos, flat)?;
        debug_assert_eq!(*pos, next);
    }

    for file in &node.files {
        remaining -= 1;
        let entry_offset = wire_offset(*pos)?;
        let next = *pos + E + file.payload.len() as u64;
        let sibling = if remaining == 0 { 0 } else { wire_offset(next)? };
        write_entry(
            writer,
            false,
            &file.name,
            file.uncompressed_size,
            file.payload.len() as u32,
            sibling,
        )?;
        *pos += E;
        writer.write_all(&file.payload)?;
        *pos += file.payload.len() as u64;

        flat.push(FlatRecord {
            path: join_path(dir_path, &file.name),
            offset: entry_offset,
        });
    }

    Ok(())
}

fn write_entry<W: Write>(
    writer: &mut W,
    is_directory: bool,
    name: &str,
    uncompressed_size: u32,
    compressed_size: u32,
    sibling_offset: u32,
) -> Result<()> {
    let encoded = strings::encode_euc_kr(name)
        .ok_or_else(|| ArchiveError::UnencodableName(name.to_string()))?;
    if encoded.len() >= NAME_FIELD_SIZE {
        // The null terminator byte is reserved inside the 128-byte field.
        return Err(ArchiveError::UnencodableName(name.to_string()));
    }
    let mut field = [0u8; NAME_FIELD_SIZE];
    field[..encoded.len()].copy_from_slice(&encoded);

    writer.write_u8(u8::from(is_directory))?;
    writer.write_all(&field)?;
    writer.write_u32::<LittleEndian>(uncompressed_size)?;
    writer.write_u32::<LittleEndian>(compressed_size)?;
    writer.write_u32::<LittleEndian>(0)?;
    writer.write_u32::<LittleEndian>(sibling_offset)?;
    Ok(())
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn wire_offset(pos: u64) -> Result<u32> {
    u32::try_from(pos).map_err(|_| {
        ArchiveError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "archive exceeds the 32-bit offset space",
        ))
    })
}
