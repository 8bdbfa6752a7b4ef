//! Loading an existing image back into a tree (spec §3.2 "image" leaf source; §8 round-trip
//! property; §4.5 "Drive back-end ... NWA is obtained from the last READ TRACK INFORMATION").
//!
//! This is the literal inverse of [`crate::write`]: every offset read here is one
//! `crate::write::render_pvd` / `render_directory_extent` wrote. It reconstructs the primary
//! (ISO 9660 + Rock Ridge NM/PX) hierarchy; Joliet, if present, describes the same file extents
//! under a second name and is not loaded as a separate tree since nothing in this crate's own
//! round trip needs two trees back. SUSP continuation areas (`CE`) are not parsed, matching
//! `crate::write`'s own choice not to emit them.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use scsi_lib::core::addressing::Lba;
use scsi_lib::core::constants::SECTOR_SIZE;

use crate::error::{Result, TreeError};
use crate::node::{DirectoryData, FileData, Mode, Node, NodeKind, NodeRef};
use crate::stream::{Leaf, StreamChain};
use crate::volume::Volume;

/// Read the image whose primary session starts at block 0 (the common case: a freshly written,
/// single-session file or the first session of a multi-session one). For a later session use
/// [`read_session_at`] with the session's data-start LBA, e.g. from
/// `growth_bridge::file_backend::FileBackend::sessions`.
pub fn read_volume(image_path: impl AsRef<Path>) -> Result<Volume> {
    read_session_at(image_path, Lba::ZERO)
}

/// Read one session's PVD and primary directory hierarchy, treating `session_base` as the
/// absolute LBA its system area starts at — exactly what `crate::write::write_session` used as
/// the base when it laid out that session's extents.
pub fn read_session_at(image_path: impl AsRef<Path>, session_base: Lba) -> Result<Volume> {
    let path = image_path.as_ref().to_path_buf();
    let mut file = File::open(&path)?;

    let pvd_lba = session_base.raw() as u32 + 16;
    let pvd = read_block(&mut file, pvd_lba)?;
    if pvd[0] != 1 || &pvd[1..6] != b"CD001" {
        return Err(TreeError::Corrupt(format!(
            "no Primary Volume Descriptor at LBA {pvd_lba} (session base {})",
            session_base.raw()
        )));
    }

    let mut volume = Volume::new();
    volume.system_id = field_str(&pvd[8..40]);
    volume.volume_id = field_str(&pvd[40..72]);
    volume.publisher = field_str(&pvd[318..446]);
    volume.data_preparer = field_str(&pvd[446..574]);
    volume.application_id = field_str(&pvd[574..702]);
    volume.copyright_file = non_empty(field_str(&pvd[702..739]));
    volume.abstract_file = non_empty(field_str(&pvd[739..776]));
    volume.bibliographic_file = non_empty(field_str(&pvd[776..813]));
    volume.creation_time = dec_datetime(&pvd[813..830]).unwrap_or(volume.creation_time);
    volume.modification_time = dec_datetime(&pvd[830..847]).unwrap_or(volume.modification_time);
    volume.expiration_time = dec_datetime(&pvd[847..864]);
    volume.effective_time = dec_datetime(&pvd[864..881]).unwrap_or(volume.effective_time);

    let root_record_len = pvd[156] as usize;
    let root_record = &pvd[156..156 + root_record_len];
    let root = parse_directory_record(root_record)?;

    volume.root = read_directory(&mut file, &path, root.extent, root.size, None)?;

    Ok(volume)
}

/// One parsed ISO 9660 directory record (spec-inverse of `crate::write::directory_record`).
struct ParsedRecord {
    extent: Lba,
    size: u32,
    is_dir: bool,
    recorded_at: DateTime<Utc>,
    name: Vec<u8>,
    rock_ridge_name: Option<String>,
    mode: Option<Mode>,
    uid: Option<u32>,
    gid: Option<u32>,
}

fn parse_directory_record(rec: &[u8]) -> Result<ParsedRecord> {
    if rec.len() < 34 {
        return Err(TreeError::Corrupt("directory record shorter than the fixed fields".into()));
    }
    let len = rec[0] as usize;
    if len == 0 || len > rec.len() {
        return Err(TreeError::Corrupt("directory record length out of range".into()));
    }
    let rec = &rec[..len];

    let extent = u32::from_le_bytes(rec[2..6].try_into().unwrap());
    let size = u32::from_le_bytes(rec[10..14].try_into().unwrap());
    let recorded_at = recording_datetime(&rec[18..25]);
    let flags = rec[25];
    let is_dir = flags & 0x02 != 0;
    let name_len = rec[32] as usize;
    let name_start = 33;
    let name_end = name_start + name_len;
    if name_end > rec.len() {
        return Err(TreeError::Corrupt("directory record name overruns record".into()));
    }
    let name = rec[name_start..name_end].to_vec();

    // A padding byte follows the name when its length is even, then SUSP entries if any.
    let susp_start = if name_len % 2 == 0 && name_end < rec.len() { name_end + 1 } else { name_end };

    let mut rock_ridge_name = None;
    let mut mode = None;
    let mut uid = None;
    let mut gid = None;
    let mut offset = susp_start;
    while offset + 4 <= rec.len() {
        let sig = &rec[offset..offset + 2];
        let entry_len = rec[offset + 2] as usize;
        if entry_len < 4 || offset + entry_len > rec.len() {
            break;
        }
        match sig {
            b"NM" => {
                let mut bytes = rec[offset + 5..offset + entry_len].to_vec();
                // `crate::write::rock_ridge_fields` pads an odd-length name with one trailing
                // zero to keep the entry length even; a real filename never ends in NUL.
                if bytes.last() == Some(&0) {
                    bytes.pop();
                }
                rock_ridge_name = String::from_utf8(bytes).ok();
            }
            b"PX" if entry_len >= 36 => {
                mode = Some(Mode::new(u32::from_le_bytes(rec[offset + 4..offset + 8].try_into().unwrap())));
                uid = Some(u32::from_le_bytes(rec[offset + 20..offset + 24].try_into().unwrap()));
                gid = Some(u32::from_le_bytes(rec[offset + 28..offset + 32].try_into().unwrap()));
            }
            _ => {}
        }
        offset += entry_len;
    }

    Ok(ParsedRecord { extent: lba_of(extent)?, size, is_dir, recorded_at, name, rock_ridge_name, mode, uid, gid })
}

fn lba_of(raw: u32) -> Result<Lba> {
    Lba::try_from(raw as i32).map_err(|_| TreeError::Corrupt(format!("extent {raw} out of range")))
}

/// Read one directory's extent and build its [`NodeRef`] plus every descendant, recursing into
/// subdirectories depth-first. `parent` is wired up as a weak back-reference once the child
/// `NodeRef` exists (spec §3.2 "parent pointer"). `image_path` is carried down so file leaves
/// can be recorded as [`Leaf::Image`] extents against the file this image was opened from.
fn read_directory(
    file: &mut File,
    image_path: &Path,
    extent: Lba,
    size: u32,
    parent: Option<&NodeRef>,
) -> Result<NodeRef> {
    let blocks = (size as usize).div_ceil(SECTOR_SIZE as usize).max(1);
    let mut buf = vec![0u8; blocks * SECTOR_SIZE as usize];
    file.seek(SeekFrom::Start(u64::from(extent.raw() as u32) * u64::from(SECTOR_SIZE)))?;
    file.read_exact(&mut buf)?;

    let dir_node = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
    if let Some(p) = parent {
        dir_node.borrow_mut().parent = Some(Rc::downgrade(p));
    }

    let mut offset = 0usize;
    while offset < buf.len() {
        let rec_len = buf[offset] as usize;
        if rec_len == 0 {
            // Zero bytes pad the remainder of the last sector of the extent.
            offset = (offset / SECTOR_SIZE as usize + 1) * SECTOR_SIZE as usize;
            continue;
        }
        let record = parse_directory_record(&buf[offset..offset + rec_len])?;
        offset += rec_len;

        // "." (0x00) and ".." (0x01) self/parent entries carry no child to create.
        if record.name == [0u8] || record.name == [1u8] {
            continue;
        }

        let real_name = record
            .rock_ridge_name
            .clone()
            .unwrap_or_else(|| iso_primary_name_to_real(&record.name));
        let mode = record.mode.unwrap_or_else(|| Mode::new(if record.is_dir { 0o755 } else { 0o644 }));

        let child = if record.is_dir {
            read_directory(file, image_path, record.extent, record.size, Some(&dir_node))?
        } else {
            let leaf = Leaf::Image {
                image_path: image_path.to_path_buf(),
                offset: u64::from(record.extent.raw() as u32) * u64::from(SECTOR_SIZE),
                size: u64::from(record.size),
            };
            let node = Node::new(
                real_name.clone(),
                NodeKind::File(FileData { content: StreamChain::from_leaf(leaf), size_override: Some(u64::from(record.size)) }),
                mode,
            );
            node.borrow_mut().parent = Some(Rc::downgrade(&dir_node));
            node
        };

        {
            let mut child_mut = child.borrow_mut();
            child_mut.name = real_name.clone();
            child_mut.mode = mode;
            if let Some(uid) = record.uid {
                child_mut.uid = uid;
            }
            if let Some(gid) = record.gid {
                child_mut.gid = gid;
            }
            child_mut.mtime = record.recorded_at;
            child_mut.atime = record.recorded_at;
            child_mut.ctime = record.recorded_at;
        }

        let mut dir_mut = dir_node.borrow_mut();
        let NodeKind::Directory(dir_data) = &mut dir_mut.kind else { unreachable!() };
        dir_data
            .insert(real_name, child)
            .map_err(|_| TreeError::Corrupt("duplicate name in directory extent".into()))?;
    }

    Ok(dir_node)
}

/// Strip the ISO 9660 primary-tree spelling back toward something readable when no Rock Ridge
/// `NM` field was recorded: drop the trailing `;1` version suffix (spec §4.4.8's translation is
/// otherwise lossy without Rock Ridge; this is the best a primary-tree-only name supports).
fn iso_primary_name_to_real(name: &[u8]) -> String {
    let s = String::from_utf8_lossy(name);
    s.rsplit_once(';').map(|(stem, _)| stem.to_string()).unwrap_or_else(|| s.into_owned())
}

fn read_block(file: &mut File, lba: u32) -> Result<[u8; SECTOR_SIZE as usize]> {
    let mut block = [0u8; SECTOR_SIZE as usize];
    file.seek(SeekFrom::Start(u64::from(lba) * u64::from(SECTOR_SIZE)))?;
    file.read_exact(&mut block)?;
    Ok(block)
}

fn field_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// ISO 9660 9.1.5 "Recording Date and Time": 7 binary bytes, the inverse of
/// `crate::write::recording_datetime`.
fn recording_datetime(bytes: &[u8]) -> DateTime<Utc> {
    let year = 1900 + i32::from(bytes[0]);
    let month = bytes[1].max(1) as u32;
    let day = bytes[2].max(1) as u32;
    Utc.with_ymd_and_hms(year, month, day, bytes[3] as u32, bytes[4] as u32, bytes[5] as u32)
        .single()
        .unwrap_or_else(Utc::now)
}

/// ISO 9660 8.4.26.1 "dec-datetime": 17 decimal-digit ASCII bytes (inverse of
/// `crate::write::dec_datetime`); an all-zero field means "not specified".
fn dec_datetime(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let text = std::str::from_utf8(&bytes[..16]).ok()?;
    if text.chars().all(|c| c == '0') {
        return None;
    }
    let year: i32 = text.get(0..4)?.parse().ok()?;
    let month: u32 = text.get(4..6)?.parse().ok()?;
    let day: u32 = text.get(6..8)?.parse().ok()?;
    let hour: u32 = text.get(8..10)?.parse().ok()?;
    let minute: u32 = text.get(10..12)?.parse().ok()?;
    let second: u32 = text.get(12..14)?.parse().ok()?;
    Utc.with_ymd_and_hms(year, month.max(1), day.max(1), hour, minute, second).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graft::{graft, GraftConfig, GraftOptions};
    use crate::write::{write_session, WriteOptions};
    use growth_bridge::file_backend::{AppendMode, FileBackend};
    use std::sync::atomic::AtomicBool;

    #[test]
    fn reads_back_volume_identity_mode_owner_and_content() {
        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), vec![0x61u8; 2048]).unwrap();

        let mut volume = Volume::new();
        volume.volume_id = "TESTVOL".to_string();
        volume.publisher = "TESTER".to_string();
        let node = graft(&volume.root, "/F", GraftOptions::disk(src.path()), GraftConfig::default(), &|_| false).unwrap();
        node.borrow_mut().mode = Mode::new(0o640);
        node.borrow_mut().uid = 1000;
        node.borrow_mut().gid = 1000;

        let out = tempfile::NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(out.path(), AppendMode::Overwrite).unwrap();
        let cancel = AtomicBool::new(false);
        write_session(&volume, &WriteOptions { rock_ridge: true, ..WriteOptions::default() }, &mut backend, &cancel).unwrap();
        drop(backend);

        let reopened = read_volume(out.path()).unwrap();
        assert_eq!(reopened.volume_id, "TESTVOL");
        assert_eq!(reopened.publisher, "TESTER");

        let NodeKind::Directory(root_dir) = &reopened.root.borrow().kind else { panic!("root not a directory") };
        let f = root_dir.get("F").expect("/F present after reopen").clone();
        assert_eq!(f.borrow().name, "F");
        assert_eq!(f.borrow().mode.permission_bits(), 0o640);
        assert_eq!(f.borrow().uid, 1000);
        assert_eq!(f.borrow().gid, 1000);

        let mut content = Vec::new();
        let NodeKind::File(file_data) = &f.borrow().kind else { panic!("F not a file") };
        file_data.content.open().unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, vec![0x61u8; 2048]);
    }

    #[test]
    fn second_session_reads_back_independently_of_first() {
        let out = tempfile::NamedTempFile::new().unwrap();
        let cancel = AtomicBool::new(false);

        let mut vol_a = Volume::new();
        vol_a.volume_id = "SESSA".to_string();
        let src_a = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src_a.path(), vec![0x41u8; 2048]).unwrap();
        graft(&vol_a.root, "/A", GraftOptions::disk(src_a.path()), GraftConfig::default(), &|_| false).unwrap();

        let mut backend = FileBackend::open(out.path(), AppendMode::Append).unwrap();
        write_session(&vol_a, &WriteOptions::default(), &mut backend, &cancel).unwrap();

        let mut vol_b = Volume::new();
        vol_b.volume_id = "SESSB".to_string();
        let src_b = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src_b.path(), vec![0x42u8; 2048]).unwrap();
        graft(&vol_b.root, "/B", GraftOptions::disk(src_b.path()), GraftConfig::default(), &|_| false).unwrap();
        write_session(&vol_b, &WriteOptions::default(), &mut backend, &cancel).unwrap();
        let sessions = backend.sessions().to_vec();
        drop(backend);

        assert_eq!(sessions.len(), 2);

        let first = read_session_at(out.path(), sessions[0].data_start).unwrap();
        assert_eq!(first.volume_id, "SESSA");

        let second = read_session_at(out.path(), sessions[1].data_start).unwrap();
        assert_eq!(second.volume_id, "SESSB");
    }
}
