use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::error::ArchiveError;
use crate::reader::{VdiskArchive, decompress_payload};
use crate::structs::VdiskVersion;
use crate::writer::VdiskWriter;

fn archive_bytes(writer: &VdiskWriter, compress: bool) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    writer.write_to(&mut cursor, compress).unwrap();
    cursor.into_inner()
}

fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn read_u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

// Helper to hand-build archive fixtures the writer did not produce.
fn push_entry(
    buf: &mut Vec<u8>,
    is_dir: bool,
    name: &str,
    uncompressed: u32,
    compressed: u32,
    sibling: u32,
) {
    buf.write_u8(u8::from(is_dir)).unwrap();
    let mut field = [0u8; 128];
    let encoded = vdk_codec::strings::encode_euc_kr(name).unwrap();
    field[..encoded.len()].copy_from_slice(&encoded);
    buf.write_all(&field).unwrap();
    buf.write_u32::<LittleEndian>(uncompressed).unwrap();
    buf.write_u32::<LittleEndian>(compressed).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(sibling).unwrap();
}

fn push_flat_record(buf: &mut Vec<u8>, path: &str, offset: u32) {
    let mut field = [0u8; 260];
    let encoded = vdk_codec::strings::encode_euc_kr(path).unwrap();
    field[..encoded.len()].copy_from_slice(&encoded);
    buf.write_all(&field).unwrap();
    buf.write_u32::<LittleEndian>(offset).unwrap();
}

#[test]
fn empty_archive_layout() {
    let bytes = archive_bytes(&VdiskWriter::new(), true);

    // Header + one root `.` record + empty flat table.
    assert_eq!(bytes.len(), 28 + 145 + 4);
    assert_eq!(&bytes[..8], b"VDISK1.1");
    assert_eq!(read_u32_at(&bytes, 8), 0);
    assert_eq!(read_u32_at(&bytes, 12), 0); // files
    assert_eq!(read_u32_at(&bytes, 16), 0); // folders
    assert_eq!(read_u32_at(&bytes, 20), 145); // hierarchical section
    assert_eq!(read_u32_at(&bytes, 24), 4); // flat table

    // Root `.`: directory flag, name, sibling offset 0.
    assert_eq!(bytes[28], 1);
    assert_eq!(bytes[29], b'.');
    assert_eq!(bytes[30], 0);
    assert_eq!(read_u32_at(&bytes, 28 + 141), 0);

    // Flat table holds only its count.
    assert_eq!(read_u32_at(&bytes, 173), 0);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    assert_eq!(archive.entries().len(), 1);
    assert_eq!(archive.files().count(), 0);
    assert_eq!(archive.directories().count(), 0);
}

#[test]
fn single_file_archive() {
    let mut writer = VdiskWriter::new();
    writer.add_file("a.txt", b"hi".to_vec());
    let bytes = archive_bytes(&writer, true);

    assert_eq!(&bytes[..8], b"VDISK1.1");
    assert_eq!(bytes[8], 0);
    assert_eq!(read_u32_at(&bytes, 12), 1);
    assert_eq!(read_u32_at(&bytes, 16), 0);

    // "hi" cannot shrink under the zlib framing, so it is stored.
    let hierarchical = 2 * 145 + 2;
    assert_eq!(read_u32_at(&bytes, 20), hierarchical as u32);
    assert_eq!(read_u32_at(&bytes, 24), 264 + 4);

    // Flat table: one record, uppercase path, entry record offset.
    let flat = 28 + hierarchical;
    assert_eq!(read_u32_at(&bytes, flat), 1);
    assert_eq!(&bytes[flat + 4..flat + 9], b"A.TXT");
    assert_eq!(bytes[flat + 9], 0);
    let entry_offset = read_u32_at(&bytes, flat + 264) as usize;
    assert_eq!(entry_offset, 28 + 145);

    // The record at the flat-table offset is the file itself.
    assert_eq!(bytes[entry_offset], 0);
    assert_eq!(
        vdk_codec::strings::decode_euc_kr(&bytes[entry_offset + 1..entry_offset + 129]),
        "a.txt"
    );

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    assert_eq!(archive.version(), VdiskVersion::V1_1);
    let entry = archive.entry_by_path("a.txt").unwrap();
    assert_eq!(entry.uncompressed_size, 2);
    assert_eq!(entry.compressed_size, 2);
    assert_eq!(archive.extract(entry).unwrap(), b"hi");
}

#[test]
fn nested_tree_round_trip() {
    let mut writer = VdiskWriter::new();
    writer.add_file("sub/y", b"Y".to_vec());
    writer.add_file("z", b"Z".to_vec());
    writer.add_file("sub/x", b"X".to_vec());
    let bytes = archive_bytes(&writer, true);

    assert_eq!(read_u32_at(&bytes, 12), 3);
    assert_eq!(read_u32_at(&bytes, 16), 1);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();

    // Stream order: root dot, sub before the root-level file, dot/dotdot
    // bracketing sub's children, files in case-insensitive sorted order.
    let paths: Vec<&str> = archive
        .entries()
        .iter()
        .map(|e| e.full_path.as_str())
        .collect();
    assert_eq!(paths, [".", "sub", "sub/.", "sub/..", "sub/x", "sub/y", "z"]);

    let siblings: Vec<u32> = archive
        .entries()
        .iter()
        .map(|e| e.sibling_offset)
        .collect();
    assert_eq!(siblings, [173, 900, 463, 608, 754, 0, 0]);

    for (path, content) in [("sub/x", b"X"), ("sub/y", b"Y"), ("z", b"Z")] {
        let entry = archive.entry_by_path(path).unwrap();
        assert_eq!(archive.extract(entry).unwrap(), content);
    }

    // Flat table lists files in emission order, uppercased.
    let flat = 28 + 1018;
    assert_eq!(read_u32_at(&bytes, flat), 3);
    assert_eq!(&bytes[flat + 4..flat + 9], b"SUB/X");
    assert_eq!(&bytes[flat + 268..flat + 273], b"SUB/Y");
    assert_eq!(&bytes[flat + 532..flat + 533], b"Z");
    assert_eq!(read_u32_at(&bytes, flat + 264), 608);
    assert_eq!(read_u32_at(&bytes, flat + 528), 754);
    assert_eq!(read_u32_at(&bytes, flat + 792), 900);
}

#[test]
fn case_insensitive_child_ordering() {
    let mut writer = VdiskWriter::new();
    writer.add_file("B.txt", b"1".to_vec());
    writer.add_file("c.txt", b"2".to_vec());
    writer.add_file("A.txt", b"3".to_vec());
    let bytes = archive_bytes(&writer, false);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let names: Vec<&str> = archive.files().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["A.txt", "B.txt", "c.txt"]);
}

#[test]
fn uncompressed_write_stores_payload_verbatim() {
    let content = vec![0u8; 1024];
    let mut writer = VdiskWriter::new();
    writer.add_file("zeros.bin", content.clone());
    let bytes = archive_bytes(&writer, false);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("zeros.bin").unwrap();
    assert_eq!(entry.compressed_size, entry.uncompressed_size);

    let start = entry.data_position as usize;
    assert_eq!(&bytes[start..start + 1024], &content[..]);
    assert_eq!(archive.extract(entry).unwrap(), content);
}

#[test]
fn compressible_payload_round_trip() {
    let content = vec![0u8; 4096];
    let mut writer = VdiskWriter::new();
    writer.add_file("zeros.bin", content.clone());
    let bytes = archive_bytes(&writer, true);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("zeros.bin").unwrap();
    assert!(entry.compressed_size < entry.uncompressed_size);

    let start = entry.data_position as usize;
    assert_eq!(&bytes[start..start + 2], &[0x78, 0x9C]);
    assert_eq!(archive.extract(entry).unwrap(), content);
}

#[test]
fn incompressible_payload_stored() {
    // A byte ramp has no repetition for deflate to exploit.
    let content: Vec<u8> = (0u8..=255).collect();
    let mut writer = VdiskWriter::new();
    writer.add_file("ramp.bin", content.clone());
    let bytes = archive_bytes(&writer, true);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("ramp.bin").unwrap();
    assert_eq!(entry.compressed_size, entry.uncompressed_size);
    assert_eq!(archive.extract(entry).unwrap(), content);
}

#[test]
fn bare_deflate_payload_falls_back() {
    use flate2::{Compression, write::DeflateEncoder};

    let content = b"hello hello hello hello hello hello";
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content).unwrap();
    let deflated = encoder.finish().unwrap();

    let hierarchical = (2 * 145 + deflated.len()) as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VDISK1.1");
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(1).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(hierarchical).unwrap();
    bytes.write_u32::<LittleEndian>(264 + 4).unwrap();
    push_entry(&mut bytes, true, ".", 0, 0, 173);
    push_entry(
        &mut bytes,
        false,
        "r.bin",
        content.len() as u32,
        deflated.len() as u32,
        0,
    );
    bytes.extend_from_slice(&deflated);
    bytes.write_u32::<LittleEndian>(1).unwrap();
    push_flat_record(&mut bytes, "R.BIN", 173);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("r.bin").unwrap();
    assert_eq!(archive.extract(entry).unwrap(), content);
}

#[test]
fn decompress_strategies() {
    // Sizes equal: verbatim, even if the bytes would inflate.
    let stored = decompress_payload(vec![0x78, 0x9C, 1, 2], 4, "a");
    assert_eq!(stored, [0x78, 0x9C, 1, 2]);

    // No strategy applies: stored bytes come back unchanged.
    let garbage = decompress_payload(vec![0x00], 5, "b");
    assert_eq!(garbage, [0x00]);
}

#[test]
fn vdisk10_magic_validation() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VDISK1.0");
    bytes.write_u32::<LittleEndian>(0xFFFF_FF00).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(145).unwrap();
    push_entry(&mut bytes, true, ".", 0, 0, 0);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    assert_eq!(archive.version(), VdiskVersion::V1_0);
    assert_eq!(archive.entries().len(), 1);

    // Same archive with a wrong magic word fails before the tree.
    bytes[8..12].copy_from_slice(&1234u32.to_le_bytes());
    let file = write_temp(&bytes);
    assert!(matches!(
        VdiskArchive::load(file.path()),
        Err(ArchiveError::InvalidHeader(_))
    ));
}

#[test]
fn vdisk11_flat_size_validation() {
    // Declared flat-table size disagrees with the file count; no entries
    // follow, proving the check fires before any record is parsed.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VDISK1.1");
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(2).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(145).unwrap();
    bytes.write_u32::<LittleEndian>(2 * 264).unwrap();

    let file = write_temp(&bytes);
    assert!(matches!(
        VdiskArchive::load(file.path()),
        Err(ArchiveError::InvalidHeader(_))
    ));
}

#[test]
fn unknown_version_tag() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VDISK2.0");
    bytes.extend_from_slice(&[0u8; 20]);

    let file = write_temp(&bytes);
    match VdiskArchive::load(file.path()) {
        Err(ArchiveError::UnknownFormat(tag)) => assert_eq!(tag, "VDISK2.0"),
        Err(other) => panic!("expected UnknownFormat, got {other}"),
        Ok(_) => panic!("expected UnknownFormat, archive loaded"),
    }
}

#[test]
fn truncated_tree() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VDISK1.1");
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(145).unwrap();
    bytes.write_u32::<LittleEndian>(4).unwrap();
    bytes.extend_from_slice(&[1u8; 40]); // partial entry record

    let file = write_temp(&bytes);
    assert!(matches!(
        VdiskArchive::load(file.path()),
        Err(ArchiveError::Truncated(_))
    ));
}

#[test]
fn korean_names_round_trip() {
    let mut writer = VdiskWriter::new();
    writer.add_file("데이터/한글이름.txt", b"content".to_vec());
    let bytes = archive_bytes(&writer, true);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("데이터/한글이름.txt").unwrap();
    assert_eq!(entry.name, "한글이름.txt");
    assert_eq!(archive.extract(entry).unwrap(), b"content");
}

#[test]
fn name_length_limits() {
    // 63 two-byte syllables plus one ASCII byte: 127 bytes, fits with the
    // reserved null terminator.
    let name_ok = format!("{}a", "가".repeat(63));
    let mut writer = VdiskWriter::new();
    writer.add_file(&name_ok, b"x".to_vec());
    let bytes = archive_bytes(&writer, true);
    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    assert!(archive.entry_by_path(&name_ok).is_some());

    // One more syllable makes 128 bytes and leaves no room for the null.
    let name_long = "가".repeat(64);
    let mut writer = VdiskWriter::new();
    writer.add_file(&name_long, b"x".to_vec());
    let mut cursor = Cursor::new(Vec::new());
    assert!(matches!(
        writer.write_to(&mut cursor, true),
        Err(ArchiveError::UnencodableName(name)) if name == name_long
    ));
}

#[test]
fn unencodable_name_rejected() {
    let mut writer = VdiskWriter::new();
    writer.add_file("🦀.txt", b"x".to_vec());
    let mut cursor = Cursor::new(Vec::new());
    assert!(matches!(
        writer.write_to(&mut cursor, true),
        Err(ArchiveError::UnencodableName(_))
    ));
}

#[test]
fn rewrite_is_byte_identical() {
    let mut writer = VdiskWriter::new();
    writer.add_file("sub/x.bin", vec![7u8; 2000]);
    writer.add_file("a.txt", b"alpha beta gamma delta".to_vec());
    let first = archive_bytes(&writer, true);

    let file = write_temp(&first);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let mut rebuilt = VdiskWriter::new();
    for entry in archive.files() {
        rebuilt.add_file(&entry.full_path, archive.extract(entry).unwrap());
    }
    let second = archive_bytes(&rebuilt, true);

    assert_eq!(first, second);
}

#[test]
fn add_directory_ingest() {
    let source = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(source.path().join("nested")).unwrap();
    std::fs::write(source.path().join("nested/inner.txt"), b"inner").unwrap();
    std::fs::write(source.path().join("top.txt"), b"top").unwrap();

    let mut writer = VdiskWriter::new();
    let mut seen = Vec::new();
    let added = writer
        .add_directory(source.path(), |path| seen.push(path.to_string()))
        .unwrap();
    assert_eq!(added, 2);
    assert_eq!(seen.len(), 2);

    let bytes = archive_bytes(&writer, true);
    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("nested/inner.txt").unwrap();
    assert_eq!(archive.extract(entry).unwrap(), b"inner");
    let entry = archive.entry_by_path("top.txt").unwrap();
    assert_eq!(archive.extract(entry).unwrap(), b"top");
}

#[test]
fn extract_to_creates_parents() {
    let mut writer = VdiskWriter::new();
    writer.add_file("sub/file.txt", b"payload".to_vec());
    let bytes = archive_bytes(&writer, true);

    let file = write_temp(&bytes);
    let archive = VdiskArchive::load(file.path()).unwrap();
    let entry = archive.entry_by_path("sub/file.txt").unwrap();

    let dest_root = tempfile::tempdir().unwrap();
    let dest = dest_root.path().join("out").join("sub").join("file.txt");
    archive.extract_to(entry, &dest).unwrap();
    assert_eq!(std::fs::read(dest).unwrap(), b"payload");
}
