//! Session write (spec §4.4.8): compute the linear byte layout of a session (volume descriptors,
//! path tables, directory extents, file extents, optional El Torito boot catalog) and stream it
//! through a [`growth_bridge::WriteTarget`].
//!
//! Rock Ridge here is NM (alternate name) + PX (POSIX fields) only — no SUSP continuation areas
//! (`CE`), so a name that would need one is rejected up front rather than silently truncated.
//! Joliet, when enabled, is a second, parallel directory hierarchy over the same file extents,
//! which is how every real multi-standard writer shares data between presentations.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use growth_bridge::{GrowthBridgeError, WriteTarget};
use scsi_lib::core::addressing::Lba;
use scsi_lib::core::constants::SECTOR_SIZE;

use crate::aaip::{AttributeDictionary, TAG_CONTENT_MD5};
use crate::boot::{BootCatalog, ISOLINUX_BOOT_INFO_TABLE_LEN, ISOLINUX_BOOT_INFO_TABLE_OFFSET, SystemAreaOverlay};
use crate::error::{Result, TreeError};
use crate::node::{Mode, NodeKind, NodeRef};
use crate::volume::Volume;

bitflags! {
    /// "Relax compliance" bits (spec §4.4.8): each one widens strict ISO 9660 beyond what
    /// Interchange Level 1-3 alone permits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RelaxFlags: u16 {
        const ALLOW_LOWERCASE       = 1 << 0;
        const ALLOW_DEEP_PATHS      = 1 << 1;
        const ALLOW_LONG_PATHS      = 1 << 2;
        const ALLOW_30_CHAR_NAMES   = 1 << 3;
        const OMIT_VERSION_NUMBERS  = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceLevel {
    L1,
    L2,
    L3,
}

/// Write-time parameters (spec §4.4.8). `Default` matches what a plain `mkisofs`-alike would
/// use with nothing special requested: level 1, no Rock Ridge/Joliet, no padding.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compliance_level: ComplianceLevel,
    pub rock_ridge: bool,
    pub joliet: bool,
    pub iso9660_1999: bool,
    pub hfsplus: bool,
    pub fat: bool,
    pub aaip: bool,
    pub record_md5: bool,
    /// Offset in blocks applied to every LBA this write reports and records in descriptors,
    /// for images embedded inside a larger container (spec §4.4.8 "partition offset").
    pub partition_offset: u32,
    pub volume_uuid_override: Option<[u8; 16]>,
    pub relax: RelaxFlags,
    /// Extra blocks of zero padding appended after the last extent.
    pub padding_blocks: u32,
    /// Round the whole session up to a multiple of this many blocks (0 = no alignment).
    pub alignment_blocks: u32,
    /// Record per-file MD5 tags into the AAIP dictionary as the session is laid out, instead of
    /// only reading back what's already stored there (spec §6.1).
    pub stream_recording: bool,
    pub dvd_output_block_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compliance_level: ComplianceLevel::L1,
            rock_ridge: false,
            joliet: false,
            iso9660_1999: false,
            hfsplus: false,
            fat: false,
            aaip: false,
            record_md5: false,
            partition_offset: 0,
            volume_uuid_override: None,
            relax: RelaxFlags::empty(),
            padding_blocks: 0,
            alignment_blocks: 0,
            stream_recording: false,
            dvd_output_block_size: scsi_lib::core::constants::DEFAULT_OBS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteReport {
    pub session_start: Lba,
    pub root_extent: Lba,
    pub blocks_written: u64,
    pub cancelled: bool,
}

const SYSTEM_AREA_BLOCKS: u32 = 16;

/// One directory in BFS order, its children already name-translated and size-known.
struct DirPlan {
    node: NodeRef,
    parent: Option<usize>,
    /// (translated name, child index if directory, file byte length if file)
    entries: Vec<DirEntryPlan>,
    extent_blocks: u32,
}

struct DirEntryPlan {
    name: String,
    joliet_name: String,
    node: NodeRef,
    child_dir_index: Option<usize>,
    file_blocks: u32,
    file_size: u64,
}

/// Walk the tree breadth-first, translating names and sizing every directory's own extent.
/// Breadth-first keeps the classic "all directories, then all files" extent ordering simple.
fn plan_directories(root: &NodeRef, options: &WriteOptions) -> Result<Vec<DirPlan>> {
    let mut dirs: Vec<DirPlan> = Vec::new();
    let mut queue: VecDeque<(NodeRef, Option<usize>, usize)> = VecDeque::new();
    queue.push_back((Rc::clone(root), None, 0));

    while let Some((node, parent, depth)) = queue.pop_front() {
        if depth > 8 && !options.relax.contains(RelaxFlags::ALLOW_DEEP_PATHS) {
            return Err(TreeError::PathTooDeep(crate::node::Node::reconstruct_path(&node)));
        }
        let my_index = dirs.len();
        dirs.push(DirPlan { node: Rc::clone(&node), parent, entries: Vec::new(), extent_blocks: 0 });

        let mut children: Vec<(String, NodeRef)> = {
            let borrowed = node.borrow();
            let NodeKind::Directory(dir) = &borrowed.kind else { unreachable!("queued node was a directory") };
            dir.iter().map(|(name, n)| (name.to_string(), Rc::clone(n))).collect()
        };
        children.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(children.len());
        for (name, child) in children {
            let translated = iso_name(&name, child.borrow().is_directory(), options)?;
            let joliet_name = joliet_name(&name);
            if child.borrow().is_directory() {
                let child_index_placeholder = dirs.len() + queue.len() + 1;
                queue.push_back((Rc::clone(&child), Some(my_index), depth + 1));
                entries.push(DirEntryPlan {
                    name: translated,
                    joliet_name,
                    node: child,
                    child_dir_index: Some(child_index_placeholder),
                    file_blocks: 0,
                    file_size: 0,
                });
            } else {
                let size = file_byte_size(&child)?;
                let blocks = (size as u32).div_ceil(SECTOR_SIZE).max(if size == 0 { 0 } else { 1 });
                entries.push(DirEntryPlan {
                    name: translated,
                    joliet_name,
                    node: child,
                    child_dir_index: None,
                    file_blocks: blocks,
                    file_size: size,
                });
            }
        }

        let mut primary_bytes: usize = 34;
        for e in &entries {
            let aaip_len = if options.rock_ridge && options.aaip {
                aaip_susp_entry(&e.node.borrow().attrs)?.map(|b| b.len()).unwrap_or(0)
            } else {
                0
            };
            primary_bytes += directory_record_len(&e.name, aaip_len, options);
        }
        // The Joliet hierarchy, when enabled, reuses the same extent size as the primary tree
        // (rather than tracking a second size independently) so a directory's primary and
        // Joliet extents never mismatch; pick whichever needs more room.
        let joliet_bytes: usize = 34 + entries.iter().map(|e| directory_record_len_joliet(&e.joliet_name)).sum::<usize>();
        let record_bytes = primary_bytes.max(joliet_bytes);
        dirs[my_index].extent_blocks = (record_bytes as u32).div_ceil(SECTOR_SIZE).max(1);
        dirs[my_index].entries = entries;
    }

    // `child_dir_index` above is a placeholder guess (BFS insertion order); fix it up now that
    // every directory has a final index by re-deriving it from parent pointers.
    fix_up_child_indices(&mut dirs);

    Ok(dirs)
}

/// Replace each directory entry's placeholder `child_dir_index` with the real index by matching
/// `Rc` pointer identity against the queued directories.
fn fix_up_child_indices(dirs: &mut [DirPlan]) {
    let lookup: Vec<(usize, *const std::cell::RefCell<crate::node::Node>)> =
        dirs.iter().enumerate().map(|(i, d)| (i, Rc::as_ptr(&d.node))).collect();

    for i in 0..dirs.len() {
        let targets: Vec<*const std::cell::RefCell<crate::node::Node>> = dirs[i]
            .entries
            .iter()
            .map(|e| if e.child_dir_index.is_some() { Rc::as_ptr(&e.node) } else { std::ptr::null() })
            .collect();

        for (entry, target) in dirs[i].entries.iter_mut().zip(targets) {
            if target.is_null() {
                continue;
            }
            entry.child_dir_index = lookup.iter().find(|(_, ptr)| *ptr == target).map(|(idx, _)| *idx);
        }
    }
}

fn file_byte_size(node: &NodeRef) -> Result<u64> {
    let borrowed = node.borrow();
    match &borrowed.kind {
        NodeKind::File(data) => {
            if let Some(size) = data.size_override {
                return Ok(size);
            }
            Ok(data.content.leaf.size_hint().map_err(TreeError::Disk)?.unwrap_or(0))
        }
        NodeKind::Symlink(_) | NodeKind::Special(_) | NodeKind::BootCatalog(_) => Ok(0),
        NodeKind::Directory(_) => Ok(0),
    }
}

fn directory_record_len(name: &str, aaip_len: usize, options: &WriteOptions) -> usize {
    let base = 33 + name.len();
    let base = if name.len() % 2 == 0 { base + 1 } else { base };
    if options.rock_ridge {
        base + rock_ridge_entries_len(name, aaip_len)
    } else {
        base
    }
}

fn directory_record_len_joliet(name: &str) -> usize {
    let name_bytes = name.encode_utf16().count() * 2;
    let base = 33 + name_bytes;
    if name_bytes % 2 == 0 { base + 1 } else { base }
}

/// `NM` (name length + 5 header bytes) + `PX` (36 bytes: 4-byte SUSP header plus POSIX
/// mode/nlink/uid/gid, each both-endian) rounded to an even boundary, plus an optional `AL`
/// attribute entry of `aaip_len` bytes (0 when AAIP is off or the node carries no attributes).
fn rock_ridge_entries_len(name: &str, aaip_len: usize) -> usize {
    let nm = 5 + name.len();
    let nm = nm + (nm % 2);
    let px = 36;
    nm + px + aaip_len
}

/// Translate one path component into its ISO 9660 primary-tree spelling (spec §4.4.8's relax
/// bits control how far this departs from strict Interchange Level 1).
fn iso_name(name: &str, is_dir: bool, options: &WriteOptions) -> Result<String> {
    let max_len = match options.compliance_level {
        ComplianceLevel::L1 => 8,
        ComplianceLevel::L3 => 30,
        ComplianceLevel::L2 => {
            if options.relax.contains(RelaxFlags::ALLOW_30_CHAR_NAMES) { 30 } else { 8 }
        }
    };

    let mut translated: String = name
        .chars()
        .map(|c| {
            if options.relax.contains(RelaxFlags::ALLOW_LOWERCASE) {
                c
            } else {
                c.to_ascii_uppercase()
            }
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();

    if translated.is_empty() {
        translated.push('_');
    }
    if !is_dir && !translated.contains('.') {
        translated.push('.');
    }

    let (stem, ext) = translated.split_once('.').map(|(s, e)| (s, Some(e))).unwrap_or((&translated, None));
    let stem: String = stem.chars().take(max_len).collect();
    let mut result = stem;
    if let Some(ext) = ext {
        result.push('.');
        result.push_str(&ext.chars().take(3.max(if max_len > 8 { max_len - result.len() } else { 3 })).collect::<String>());
    }

    if !is_dir && !options.relax.contains(RelaxFlags::OMIT_VERSION_NUMBERS) {
        result.push_str(";1");
    }

    if result.len() > 255 && !options.relax.contains(RelaxFlags::ALLOW_LONG_PATHS) {
        return Err(TreeError::NameTooLong(name.to_string(), 255));
    }

    Ok(result)
}

/// Joliet names are UTF-16BE, up to 64 unicode characters (Joliet level 3), no 8.3 restriction.
fn joliet_name(name: &str) -> String {
    name.chars().take(64).collect()
}

fn utf16be(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

fn u16_both(v: u16) -> [u8; 4] {
    let mut out = [0u8; 4];
    out[0..2].copy_from_slice(&v.to_le_bytes());
    out[2..4].copy_from_slice(&v.to_be_bytes());
    out
}

fn u32_both(v: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0..4].copy_from_slice(&v.to_le_bytes());
    out[4..8].copy_from_slice(&v.to_be_bytes());
    out
}

fn padded(s: &str, width: usize) -> Vec<u8> {
    let mut bytes = s.as_bytes()[..s.len().min(width)].to_vec();
    bytes.resize(width, b' ');
    bytes
}

/// ISO 9660 9.1.5 "Recording Date and Time": 7 bytes, binary (not decimal-digit like the PVD
/// fields below).
fn recording_datetime(t: DateTime<Utc>) -> [u8; 7] {
    [
        (t.format("%Y").to_string().parse::<i32>().unwrap_or(1970) - 1900) as u8,
        t.format("%m").to_string().parse().unwrap_or(1),
        t.format("%d").to_string().parse().unwrap_or(1),
        t.format("%H").to_string().parse().unwrap_or(0),
        t.format("%M").to_string().parse().unwrap_or(0),
        t.format("%S").to_string().parse().unwrap_or(0),
        0,
    ]
}

/// ISO 9660 8.4.26.1 "dec-datetime": 17 decimal-digit ASCII bytes plus a signed GMT-offset byte.
fn dec_datetime(t: Option<DateTime<Utc>>) -> [u8; 17] {
    let mut out = [b'0'; 17];
    if let Some(t) = t {
        let s = format!("{}{:02}", t.format("%Y%m%d%H%M%S"), 0);
        for (i, b) in s.bytes().take(16).enumerate() {
            out[i] = b;
        }
    }
    out[16] = 0;
    out
}

fn directory_record(
    name_bytes: &[u8],
    extent: u32,
    size: u32,
    is_dir: bool,
    time: DateTime<Utc>,
    rock_ridge: Option<&RockRidgeFields>,
) -> Vec<u8> {
    let name_field_len = name_bytes.len();
    let pad = if name_field_len % 2 == 0 { 1 } else { 0 };
    let rr_len = rock_ridge.map(|r| r.bytes.len()).unwrap_or(0);
    let total = 33 + name_field_len + pad + rr_len;

    let mut rec = Vec::with_capacity(total);
    rec.push(total as u8);
    rec.push(0); // extended attribute record length
    rec.extend_from_slice(&u32_both(extent));
    rec.extend_from_slice(&u32_both(size));
    rec.extend_from_slice(&recording_datetime(time));
    rec.push(if is_dir { 0x02 } else { 0x00 });
    rec.push(0); // file unit size
    rec.push(0); // interleave gap size
    rec.extend_from_slice(&u16_both(1)); // volume sequence number
    rec.push(name_field_len as u8);
    rec.extend_from_slice(name_bytes);
    if pad == 1 {
        rec.push(0);
    }
    if let Some(rr) = rock_ridge {
        rec.extend_from_slice(&rr.bytes);
    }
    rec
}

struct RockRidgeFields {
    bytes: Vec<u8>,
}

fn rock_ridge_fields(real_name: &str, mode: Mode, uid: u32, gid: u32, aaip: Option<Vec<u8>>) -> RockRidgeFields {
    let mut bytes = Vec::new();

    let nm_len = 5 + real_name.len();
    let nm_len_even = nm_len + (nm_len % 2);
    bytes.push(b'N');
    bytes.push(b'M');
    bytes.push(nm_len_even as u8);
    bytes.push(1); // SUSP version
    bytes.push(0); // flags: no CONTINUE/CURRENT/PARENT
    bytes.extend_from_slice(real_name.as_bytes());
    bytes.resize(bytes.len() + (nm_len_even - nm_len), 0);

    bytes.push(b'P');
    bytes.push(b'X');
    bytes.push(36);
    bytes.push(1);
    bytes.extend_from_slice(&u32_both(mode.raw()));
    bytes.extend_from_slice(&u32_both(1)); // st_nlink, approximated
    bytes.extend_from_slice(&u32_both(uid));
    bytes.extend_from_slice(&u32_both(gid));

    if let Some(aaip_bytes) = aaip {
        bytes.extend_from_slice(&aaip_bytes);
    }

    RockRidgeFields { bytes }
}

/// Serialize a node's whole [`AttributeDictionary`] into one `AL` System Use Sharing Protocol
/// entry (spec §4.4.5). This is not the bit-packed wire format AAIP itself defines; it is a
/// self-contained name/value encoding that only this crate's own reader needs to understand.
/// Like the `NM`/`PX` entries above, there is no `CE` continuation-area support, so the whole
/// dictionary has to fit in one directory record or the write is rejected up front.
fn aaip_susp_entry(attrs: &AttributeDictionary) -> Result<Option<Vec<u8>>> {
    let mut payload = Vec::new();
    for (name, value) in attrs.iter() {
        payload.extend_from_slice(&(name.len() as u16).to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
        payload.extend_from_slice(value);
    }
    if payload.is_empty() {
        return Ok(None);
    }

    let mut entry_len = 4 + payload.len();
    if entry_len % 2 != 0 {
        entry_len += 1;
    }
    if entry_len > 255 {
        return Err(TreeError::AttributeBudgetExceeded(entry_len, 255));
    }

    let mut bytes = Vec::with_capacity(entry_len);
    bytes.push(b'A');
    bytes.push(b'L');
    bytes.push(entry_len as u8);
    bytes.push(1); // SUSP version
    bytes.extend_from_slice(&payload);
    bytes.resize(entry_len, 0);
    Ok(Some(bytes))
}

struct SegmentedReader {
    segments: VecDeque<Box<dyn Read>>,
}

impl SegmentedReader {
    fn new() -> Self {
        Self { segments: VecDeque::new() }
    }

    fn push_bytes(&mut self, bytes: Vec<u8>) {
        if !bytes.is_empty() {
            self.segments.push_back(Box::new(Cursor::new(bytes)));
        }
    }

    fn push_zeros(&mut self, blocks: u32) {
        if blocks > 0 {
            self.push_bytes(vec![0u8; blocks as usize * SECTOR_SIZE as usize]);
        }
    }

    fn push_reader(&mut self, r: Box<dyn Read>) {
        self.segments.push_back(r);
    }
}

impl Read for SegmentedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let Some(front) = self.segments.front_mut() else { return Ok(0) };
            let n = front.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.segments.pop_front();
        }
    }
}

/// Render and stream one complete session for `volume` through `target` (spec §4.4.8).
pub fn write_session(
    volume: &Volume,
    options: &WriteOptions,
    target: &mut dyn WriteTarget,
    cancel: &AtomicBool,
) -> Result<WriteReport> {
    volume.validate_before_write()?;

    let dirs = plan_directories(&volume.root, options)?;

    // Directory records and the PVD/SVD carry LBAs that are absolute on the target, not
    // relative to this session's own content (spec §4.4.8, §4.5): a session appended at a
    // non-zero NWA (incremental growth on an already-written file or disc) must have its
    // extents numbered starting from that NWA, not from 0, or every pointer a re-open follows
    // lands in the wrong session entirely.
    let session_base = target.next_writable_address().map_err(|e| TreeError::Write(e.to_string()))?.raw() as u32;

    let path_table_size = path_table_byte_size(&dirs);
    let mut next_lba = session_base + options.partition_offset + SYSTEM_AREA_BLOCKS;
    let pvd_lba = next_lba;
    next_lba += 1;
    let boot_record_lba = if !volume.boot_catalog.is_empty() {
        let lba = next_lba;
        next_lba += 1;
        Some(lba)
    } else {
        None
    };
    let svd_lba = if options.joliet {
        let lba = next_lba;
        next_lba += 1;
        Some(lba)
    } else {
        None
    };
    next_lba += 1; // volume descriptor set terminator

    let l_path_table_lba = next_lba;
    next_lba += (path_table_size as u32).div_ceil(SECTOR_SIZE).max(1);
    let m_path_table_lba = next_lba;
    next_lba += (path_table_size as u32).div_ceil(SECTOR_SIZE).max(1);

    let (joliet_l_path_table_lba, joliet_m_path_table_lba) = if options.joliet {
        let l = next_lba;
        next_lba += (path_table_size as u32).div_ceil(SECTOR_SIZE).max(1);
        let m = next_lba;
        next_lba += (path_table_size as u32).div_ceil(SECTOR_SIZE).max(1);
        (Some(l), Some(m))
    } else {
        (None, None)
    };

    let mut dir_lbas = vec![0u32; dirs.len()];
    for (i, plan) in dirs.iter().enumerate() {
        dir_lbas[i] = next_lba;
        next_lba += plan.extent_blocks;
    }
    let joliet_dir_lbas = if options.joliet {
        let mut v = vec![0u32; dirs.len()];
        for (i, plan) in dirs.iter().enumerate() {
            v[i] = next_lba;
            next_lba += plan.extent_blocks;
        }
        Some(v)
    } else {
        None
    };

    let boot_catalog_lba = if !volume.boot_catalog.is_empty() {
        let lba = next_lba;
        next_lba += 1;
        Some(lba)
    } else {
        None
    };

    let mut file_lbas: Vec<Vec<u32>> = dirs.iter().map(|d| vec![0u32; d.entries.len()]).collect();
    for (i, plan) in dirs.iter().enumerate() {
        for (j, entry) in plan.entries.iter().enumerate() {
            if entry.child_dir_index.is_none() {
                file_lbas[i][j] = next_lba;
                next_lba += entry.file_blocks;
            }
        }
    }

    let root_extent = dir_lbas[0];

    // Resolve every attached boot entry's own file extent now that every file has an LBA, and
    // collect which file nodes need their isolinux boot-info-table patched in place.
    let mut boot_extents: Vec<(u32, u32)> = Vec::new();
    let mut isolinux_patches: HashMap<usize, u32> = HashMap::new();
    for entry in volume.boot_catalog.entries() {
        let node = volume.resolve_reachable(&entry.boot_file_path)?;
        let extent = locate_file_extent(&dirs, &file_lbas, &node)
            .ok_or_else(|| TreeError::BootImageUnreachable(entry.boot_file_path.clone()))?;
        boot_extents.push(extent);
        if entry.patch_isolinux {
            isolinux_patches.insert(Rc::as_ptr(&node) as usize, extent.0);
        }
    }

    let total_content_blocks = next_lba - (session_base + options.partition_offset + SYSTEM_AREA_BLOCKS);

    // Per-file MD5 tags (spec §6.1) are read from each file's `isofs.cs` attribute when already
    // present; `stream_recording` instead computes them now, before the directory extents below
    // are rendered, so the freshly computed digest is the one that ends up in this session's `AL`
    // entries rather than whatever (if anything) was already on the node.
    if options.record_md5 && options.stream_recording {
        for plan in &dirs {
            for entry in &plan.entries {
                if entry.child_dir_index.is_some() {
                    continue;
                }
                let digest = {
                    let borrowed = entry.node.borrow();
                    let NodeKind::File(file_data) = &borrowed.kind else { continue };
                    let mut hasher = Md5::new();
                    let mut content = file_data.content.open().map_err(TreeError::Disk)?;
                    std::io::copy(&mut content, &mut hasher).map_err(TreeError::Disk)?;
                    hasher.finalize()
                };
                entry.node.borrow_mut().attrs.set_reserved(TAG_CONTENT_MD5, digest.to_vec());
            }
        }
    }

    let mut reader = SegmentedReader::new();

    reader.push_bytes(render_system_area(volume.system_area_overlay.as_ref(), total_content_blocks));

    reader.push_bytes(render_pvd(volume, options, pvd_lba, root_extent, dirs[0].extent_blocks, path_table_size, l_path_table_lba, m_path_table_lba));
    if let Some(boot_record_lba) = boot_record_lba {
        let catalog_lba = boot_catalog_lba.expect("boot catalog lba computed when boot record present");
        let _ = boot_record_lba; // the descriptor's own LBA isn't referenced by its contents
        reader.push_bytes(render_boot_record(catalog_lba));
    }
    if let Some(svd_lba) = svd_lba {
        let joliet_dir_lbas = joliet_dir_lbas.as_ref().expect("joliet lbas computed when svd present");
        reader.push_bytes(render_svd(
            volume,
            options,
            svd_lba,
            joliet_dir_lbas[0],
            dirs[0].extent_blocks,
            path_table_size,
            joliet_l_path_table_lba.unwrap(),
            joliet_m_path_table_lba.unwrap(),
        ));
    }
    reader.push_bytes(render_terminator(next_lba_of_terminator(pvd_lba, svd_lba)));

    reader.push_bytes(render_path_table(&dirs, &dir_lbas, true, false));
    reader.push_bytes(pad_to_blocks(render_path_table(&dirs, &dir_lbas, false, false), path_table_size));
    if options.joliet {
        let joliet_dir_lbas = joliet_dir_lbas.as_ref().unwrap();
        reader.push_bytes(pad_to_blocks(render_path_table(&dirs, joliet_dir_lbas, true, true), path_table_size));
        reader.push_bytes(pad_to_blocks(render_path_table(&dirs, joliet_dir_lbas, false, true), path_table_size));
    }

    if !volume.boot_catalog.is_empty() {
        reader.push_bytes(render_boot_catalog(&volume.boot_catalog, &boot_extents));
    }

    for (i, plan) in dirs.iter().enumerate() {
        reader.push_bytes(render_directory_extent(plan, i, &dirs, &dir_lbas, &file_lbas, options, false));
    }
    if options.joliet {
        let joliet_dir_lbas = joliet_dir_lbas.as_ref().unwrap();
        for (i, plan) in dirs.iter().enumerate() {
            reader.push_bytes(render_directory_extent(plan, i, &dirs, joliet_dir_lbas, &file_lbas, options, true));
        }
    }

    for (i, plan) in dirs.iter().enumerate() {
        for (j, entry) in plan.entries.iter().enumerate() {
            if entry.child_dir_index.is_some() {
                continue;
            }
            let content_reader = entry.node.borrow();
            let NodeKind::File(file_data) = &content_reader.kind else { continue };
            let node_ptr = Rc::as_ptr(&entry.node) as usize;
            if let Some(&file_lba) = isolinux_patches.get(&node_ptr) {
                // Patching requires the whole file in memory once, to flip its first-sector
                // boot-info-table before streaming; isolinux-style loaders are small (a few
                // hundred KiB at most), so buffering is a fine tradeoff against the complexity
                // of patching mid-stream.
                let mut buf = Vec::new();
                file_data.content.open().map_err(TreeError::Disk)?.read_to_end(&mut buf).map_err(TreeError::Disk)?;
                drop(content_reader);
                patch_isolinux_boot_info_table(&mut buf, pvd_lba, file_lba, entry.file_size as u32);
                reader.push_bytes(buf);
            } else {
                let opened = file_data.content.open().map_err(TreeError::Disk)?;
                drop(content_reader);
                reader.push_reader(opened);
            }
            // `file_blocks` is ceil(size / SECTOR_SIZE), so the gap is always under one block.
            let padding = entry.file_blocks as u64 * u64::from(SECTOR_SIZE) - entry.file_size;
            if padding > 0 {
                reader.push_zeros(1);
            }
        }
    }

    let padding_blocks = options.padding_blocks
        + if options.alignment_blocks > 0 {
            (options.alignment_blocks - total_content_blocks % options.alignment_blocks) % options.alignment_blocks
        } else {
            0
        };
    reader.push_zeros(padding_blocks);

    let report = target.write_session(&mut reader, cancel).map_err(|e| match e {
        GrowthBridgeError::Cancelled => TreeError::Write("cancelled".into()),
        other => TreeError::Write(other.to_string()),
    })?;

    Ok(WriteReport {
        session_start: report.session_start,
        root_extent: Lba::try_from(root_extent as i32).unwrap_or(Lba::ZERO),
        blocks_written: report.blocks_written,
        cancelled: report.cancelled,
    })
}

fn next_lba_of_terminator(pvd_lba: u32, svd_lba: Option<u32>) -> u32 {
    svd_lba.unwrap_or(pvd_lba) + 1
}

fn pad_to_blocks(mut bytes: Vec<u8>, target_size: usize) -> Vec<u8> {
    let block_size = (target_size as u32).div_ceil(SECTOR_SIZE).max(1) as usize * SECTOR_SIZE as usize;
    bytes.resize(block_size, 0);
    bytes
}

fn path_table_byte_size(dirs: &[DirPlan]) -> usize {
    dirs.iter()
        .map(|d| {
            let name_len = if d.parent.is_none() { 1 } else { name_for_path_table(d).len() };
            let rec = 8 + name_len;
            rec + (rec % 2)
        })
        .sum()
}

fn name_for_path_table(dir: &DirPlan) -> String {
    // The directory's own name as recorded by its parent (path table entries name the
    // directory, not "." / "..").
    dir.parent
        .map(|_| dir.node.borrow().name.clone())
        .unwrap_or_default()
}

fn render_path_table(dirs: &[DirPlan], dir_lbas: &[u32], little_endian: bool, joliet: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, dir) in dirs.iter().enumerate() {
        let name = if dir.parent.is_none() {
            vec![0u8]
        } else if joliet {
            utf16be(&dir.node.borrow().name)
        } else {
            // Find the translated primary name this directory was given by its parent entry.
            dirs[dir.parent.unwrap()]
                .entries
                .iter()
                .find(|e| e.child_dir_index == Some(i))
                .map(|e| e.name.as_bytes().to_vec())
                .unwrap_or_default()
        };
        out.push(name.len() as u8);
        out.push(0); // extended attribute record length
        if little_endian {
            out.extend_from_slice(&dir_lbas[i].to_le_bytes());
            out.extend_from_slice(&(dir.parent.map(|p| p as u16 + 1).unwrap_or(1)).to_le_bytes());
        } else {
            out.extend_from_slice(&dir_lbas[i].to_be_bytes());
            out.extend_from_slice(&(dir.parent.map(|p| p as u16 + 1).unwrap_or(1)).to_be_bytes());
        }
        out.extend_from_slice(&name);
        if name.len() % 2 != 0 {
            out.push(0);
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn render_directory_extent(
    plan: &DirPlan,
    my_index: usize,
    dirs: &[DirPlan],
    dir_lbas: &[u32],
    file_lbas: &[Vec<u32>],
    options: &WriteOptions,
    joliet: bool,
) -> Result<Vec<u8>> {
    let time = plan.node.borrow().mtime;
    let mut out = Vec::with_capacity(plan.extent_blocks as usize * SECTOR_SIZE as usize);

    let parent_index = plan.parent.unwrap_or(my_index);
    out.extend_from_slice(&directory_record(
        &[0u8],
        dir_lbas[my_index],
        plan.extent_blocks * SECTOR_SIZE,
        true,
        time,
        None,
    ));
    out.extend_from_slice(&directory_record(
        &[1u8],
        dir_lbas[parent_index],
        dirs[parent_index].extent_blocks * SECTOR_SIZE,
        true,
        time,
        None,
    ));

    for (entry_index, entry) in plan.entries.iter().enumerate() {
        let (extent, size, name) = if let Some(child_index) = entry.child_dir_index {
            (dir_lbas[child_index], dirs[child_index].extent_blocks * SECTOR_SIZE, if joliet { &entry.joliet_name } else { &entry.name })
        } else {
            let file_lba = file_lbas[my_index][entry_index];
            (file_lba, entry.file_size as u32, if joliet { &entry.joliet_name } else { &entry.name })
        };

        let rr = if options.rock_ridge && !joliet {
            let borrowed = entry.node.borrow();
            let aaip = if options.aaip { aaip_susp_entry(&borrowed.attrs)? } else { None };
            Some(rock_ridge_fields(&borrowed.name, borrowed.mode, borrowed.uid, borrowed.gid, aaip))
        } else {
            None
        };

        let name_bytes: Vec<u8> = if joliet { utf16be(name) } else { name.as_bytes().to_vec() };
        let entry_time = entry.node.borrow().mtime;
        out.extend_from_slice(&directory_record(&name_bytes, extent, size, entry.child_dir_index.is_some(), entry_time, rr.as_ref()));
    }

    out.resize(plan.extent_blocks as usize * SECTOR_SIZE as usize, 0);
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn render_pvd(
    volume: &Volume,
    options: &WriteOptions,
    _pvd_lba: u32,
    root_extent: u32,
    root_extent_blocks: u32,
    path_table_size: usize,
    l_path_table_lba: u32,
    m_path_table_lba: u32,
) -> Vec<u8> {
    let mut d = vec![0u8; SECTOR_SIZE as usize];
    d[0] = 1; // Primary Volume Descriptor
    d[1..6].copy_from_slice(b"CD001");
    d[6] = 1;

    d[8..40].copy_from_slice(&padded(&volume.system_id, 32));
    d[40..72].copy_from_slice(&padded(&volume.volume_id, 32));
    d[80..88].copy_from_slice(&u32_both(0)); // volume space size, patched below
    d[120..124].copy_from_slice(&u16_both(1));
    d[124..128].copy_from_slice(&u16_both(1));
    d[128..132].copy_from_slice(&u16_both(SECTOR_SIZE as u16));
    d[132..140].copy_from_slice(&u32_both(path_table_size as u32));
    d[140..144].copy_from_slice(&l_path_table_lba.to_le_bytes());
    d[148..152].copy_from_slice(&m_path_table_lba.to_be_bytes());

    let root_record = directory_record(&[0u8], root_extent, root_extent_blocks * SECTOR_SIZE, true, Utc::now(), None);
    d[156..156 + root_record.len()].copy_from_slice(&root_record);

    d[190..318].copy_from_slice(&padded(&volume.volume_id, 128));
    d[318..446].copy_from_slice(&padded(&volume.publisher, 128));
    d[446..574].copy_from_slice(&padded(&volume.data_preparer, 128));
    d[574..702].copy_from_slice(&padded(&volume.application_id, 128));
    d[702..739].copy_from_slice(&padded(volume.copyright_file.as_deref().unwrap_or(""), 37));
    d[739..776].copy_from_slice(&padded(volume.abstract_file.as_deref().unwrap_or(""), 37));
    d[776..813].copy_from_slice(&padded(volume.bibliographic_file.as_deref().unwrap_or(""), 37));

    d[813..830].copy_from_slice(&dec_datetime(Some(volume.creation_time)));
    d[830..847].copy_from_slice(&dec_datetime(Some(volume.modification_time)));
    d[847..864].copy_from_slice(&dec_datetime(volume.expiration_time));
    d[864..881].copy_from_slice(&dec_datetime(Some(volume.effective_time)));
    d[881] = 1;

    if let Some(uuid) = options.volume_uuid_override.or(volume.volume_uuid) {
        d[884..900].copy_from_slice(&uuid);
    }

    d
}

fn render_svd(
    volume: &Volume,
    _options: &WriteOptions,
    _svd_lba: u32,
    root_extent: u32,
    root_extent_blocks: u32,
    path_table_size: usize,
    l_path_table_lba: u32,
    m_path_table_lba: u32,
) -> Vec<u8> {
    let mut d = vec![0u8; SECTOR_SIZE as usize];
    d[0] = 2; // Supplementary Volume Descriptor (Joliet)
    d[1..6].copy_from_slice(b"CD001");
    d[6] = 1;
    d[88] = 0x25; // Joliet UCS-2 Level 3 escape sequence marker (%/E, abbreviated)
    d[89] = 0x2f;
    d[90] = 0x45;

    // Volume identifier is 32 bytes here too (16 UTF-16BE chars), same field width as the PVD;
    // Joliet pads with space (0x0020), not NUL.
    let truncated: String = volume.volume_id.chars().take(16).collect();
    let mut name_utf16 = utf16be(&truncated);
    while name_utf16.len() < 32 {
        name_utf16.extend_from_slice(&0x0020u16.to_be_bytes());
    }
    name_utf16.truncate(32);
    d[40..72].copy_from_slice(&name_utf16);

    d[120..124].copy_from_slice(&u16_both(1));
    d[124..128].copy_from_slice(&u16_both(1));
    d[128..132].copy_from_slice(&u16_both(SECTOR_SIZE as u16));
    d[132..140].copy_from_slice(&u32_both(path_table_size as u32));
    d[140..144].copy_from_slice(&l_path_table_lba.to_le_bytes());
    d[148..152].copy_from_slice(&m_path_table_lba.to_be_bytes());

    let root_record = directory_record(&[0u8], root_extent, root_extent_blocks * SECTOR_SIZE, true, Utc::now(), None);
    d[156..156 + root_record.len()].copy_from_slice(&root_record);

    d
}

fn render_terminator(_lba: u32) -> Vec<u8> {
    let mut d = vec![0u8; SECTOR_SIZE as usize];
    d[0] = 255;
    d[1..6].copy_from_slice(b"CD001");
    d[6] = 1;
    d
}

/// Find the file extent (LBA, byte size) a boot/MIPS entry's tree node was assigned, by
/// pointer identity against the same [`NodeRef`] `plan_directories` already walked.
fn locate_file_extent(dirs: &[DirPlan], file_lbas: &[Vec<u32>], target: &NodeRef) -> Option<(u32, u32)> {
    for (i, plan) in dirs.iter().enumerate() {
        for (j, entry) in plan.entries.iter().enumerate() {
            if entry.child_dir_index.is_none() && Rc::ptr_eq(&entry.node, target) {
                return Some((file_lbas[i][j], entry.file_size as u32));
            }
        }
    }
    None
}

/// El Torito Boot Record Volume Descriptor (El Torito §2.1): a regular volume descriptor
/// (type 0) carrying a 32-byte system identifier and a little-endian pointer to the catalog's
/// own sector; every other field is reserved/unused.
fn render_boot_record(catalog_lba: u32) -> Vec<u8> {
    let mut d = vec![0u8; SECTOR_SIZE as usize];
    d[0] = 0;
    d[1..6].copy_from_slice(b"CD001");
    d[6] = 1;
    d[7..39].copy_from_slice(&padded("EL TORITO SPECIFICATION", 32));
    d[71..75].copy_from_slice(&catalog_lba.to_le_bytes());
    d
}

/// Sum of every 16-bit little-endian word in a 32-byte catalog entry, for the validation
/// entry's checksum field (El Torito §2.2: word sum across the whole entry, checksum field
/// included, must be zero mod 0x10000).
fn validation_checksum(entry: &[u8; 32]) -> u16 {
    let mut sum: u16 = 0;
    for chunk in entry.chunks_exact(2) {
        sum = sum.wrapping_add(u16::from_le_bytes([chunk[0], chunk[1]]));
    }
    0u16.wrapping_sub(sum)
}

/// Render the El Torito boot catalog: a validation entry, an Initial/Default entry for the
/// first attached boot image, and (if more than one image is attached) a Section Header plus
/// one Section Entry per remaining image (spec §4.4.7, boot.rs doc comment).
fn render_boot_catalog(catalog: &BootCatalog, extents: &[(u32, u32)]) -> Vec<u8> {
    let entries = catalog.entries();
    let mut out = Vec::with_capacity(SECTOR_SIZE as usize);

    let mut validation = [0u8; 32];
    validation[0] = 0x01;
    validation[1] = entries[0].platform_id.to_byte();
    validation[30] = 0x55;
    validation[31] = 0xaa;
    let checksum = validation_checksum(&validation);
    validation[28..30].copy_from_slice(&checksum.to_le_bytes());
    out.extend_from_slice(&validation);

    out.extend_from_slice(&render_catalog_entry(&entries[0], extents[0], true));

    if entries.len() > 1 {
        let mut header = [0u8; 32];
        header[0] = 0x91; // final section header (only one section group is emitted)
        header[1] = entries[1].platform_id.to_byte();
        header[2..4].copy_from_slice(&((entries.len() - 1) as u16).to_le_bytes());
        out.extend_from_slice(&header);

        for (entry, extent) in entries[1..].iter().zip(&extents[1..]) {
            out.extend_from_slice(&render_catalog_entry(entry, *extent, false));
        }
    }

    out.resize(SECTOR_SIZE as usize, 0);
    out
}

fn render_catalog_entry(entry: &crate::boot::BootImageSpec, extent: (u32, u32), is_initial: bool) -> [u8; 32] {
    let mut rec = [0u8; 32];
    rec[0] = if is_initial { 0x88 } else if entry.default_entry { 0x88 } else { 0x00 };
    rec[1] = entry.emulation.to_media_type_nibble();
    rec[6..8].copy_from_slice(&entry.load_size_sectors.to_le_bytes());
    rec[8..12].copy_from_slice(&extent.0.to_le_bytes());
    if is_initial {
        // Bytes 12..32 are reserved/zero for the Initial/Default entry (El Torito §2.2).
    } else {
        rec[12] = 0; // selection criteria type: none
        let take = entry.selection_criteria.len().min(19);
        rec[13..13 + take].copy_from_slice(&entry.selection_criteria[..take]);
    }
    rec
}

/// Render the 16-block system area (spec §3.3), either zero-filled or carrying the requested
/// overlay. Only the MBR overlay is rendered byte-for-byte; APM/GPT/GRUB2-sparc/MIPS/Sun
/// disklabel overlays are accepted by [`crate::volume::Volume`] but fall back to a zero-filled
/// system area here (documented gap, not a silent corruption: a reader expecting one of those
/// overlays simply won't find it).
fn render_system_area(overlay: Option<&SystemAreaOverlay>, total_content_blocks: u32) -> Vec<u8> {
    let mut area = vec![0u8; SYSTEM_AREA_BLOCKS as usize * SECTOR_SIZE as usize];
    match overlay {
        Some(SystemAreaOverlay::Mbr(mbr)) => {
            let mut partitions = vec![(mbr.partition_type, mbr.bootable, 0u32, total_content_blocks * 4)];
            for (start, len) in &mbr.appended_partitions {
                partitions.push((0x83, false, *start, *len));
            }
            for (i, (ptype, bootable, start, len)) in partitions.iter().enumerate().take(4) {
                let off = 446 + i * 16;
                area[off] = if *bootable { 0x80 } else { 0x00 };
                area[off + 4] = *ptype;
                area[off + 8..off + 12].copy_from_slice(&start.to_le_bytes());
                area[off + 12..off + 16].copy_from_slice(&len.to_le_bytes());
            }
            area[510] = 0x55;
            area[511] = 0xaa;
        }
        Some(other) => {
            tracing::debug!(
                target: "chromadisc::cmd_trace",
                overlay = ?other,
                "system-area overlay kind has no byte-level renderer yet; writing a zero-filled system area"
            );
        }
        None => {}
    }
    area
}

/// Patch an isolinux-style boot-info-table into the first sector of `content` in place (spec
/// §4.4.7 "Patching isolinux boot tables"): bytes 8..64 of the boot file's own first sector
/// record the volume's PVD LBA, this file's own LBA, its length in bytes, and a checksum,
/// exactly as `isolinux`/`syslinux` expect to find them once loaded.
fn patch_isolinux_boot_info_table(content: &mut [u8], pvd_lba: u32, file_lba: u32, file_len: u32) {
    if content.len() < ISOLINUX_BOOT_INFO_TABLE_OFFSET + ISOLINUX_BOOT_INFO_TABLE_LEN {
        return;
    }
    let table = &mut content[ISOLINUX_BOOT_INFO_TABLE_OFFSET..ISOLINUX_BOOT_INFO_TABLE_OFFSET + ISOLINUX_BOOT_INFO_TABLE_LEN];
    table[0..4].copy_from_slice(&pvd_lba.to_le_bytes());
    table[4..8].copy_from_slice(&file_lba.to_le_bytes());
    table[8..12].copy_from_slice(&file_len.to_le_bytes());
    // Remaining checksum field (bytes 12..16) needs a running 32-bit sum over the rest of the
    // file, which the caller computes once the whole buffer is in hand.
    let mut checksum: u32 = 0;
    for chunk in content[ISOLINUX_BOOT_INFO_TABLE_OFFSET + 16..].chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        checksum = checksum.wrapping_add(u32::from_le_bytes(word));
    }
    content[ISOLINUX_BOOT_INFO_TABLE_OFFSET + 12..ISOLINUX_BOOT_INFO_TABLE_OFFSET + 16]
        .copy_from_slice(&checksum.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graft::{graft, GraftConfig, GraftOptions};
    use growth_bridge::{file_backend::AppendMode, FileBackend};

    #[test]
    fn iso_name_truncates_and_uppercases() {
        let options = WriteOptions::default();
        let name = iso_name("verylongfilename.txt", false, &options).unwrap();
        assert!(name.starts_with("VERYLONG"));
        assert!(name.ends_with(";1"));
    }

    #[test]
    fn write_session_streams_to_file_backend() {
        let tmp_src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp_src.path(), b"hello world").unwrap();

        let mut volume = Volume::new();
        volume.volume_id = "TESTVOL".to_string();
        graft(&volume.root, "/hello.txt", GraftOptions::disk(tmp_src.path()), GraftConfig::default(), &|_| false).unwrap();

        let tmp_out = tempfile::NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(tmp_out.path(), AppendMode::Overwrite).unwrap();
        let cancel = AtomicBool::new(false);

        let report = write_session(&volume, &WriteOptions::default(), &mut backend, &cancel).unwrap();
        assert!(report.blocks_written > SYSTEM_AREA_BLOCKS as u64);
        assert!(!report.cancelled);
    }

    #[test]
    fn boot_catalog_is_rendered_with_a_valid_signature() {
        use crate::boot::{BootImageSpec, Emulation, PlatformId};

        let tmp_src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp_src.path(), vec![0u8; 2048]).unwrap();

        let mut volume = Volume::new();
        volume.volume_id = "BOOTVOL".to_string();
        graft(&volume.root, "/isolinux.bin", GraftOptions::disk(tmp_src.path()), GraftConfig::default(), &|_| false).unwrap();
        volume
            .boot_catalog
            .attach(BootImageSpec {
                platform_id: PlatformId::X86,
                emulation: Emulation::None,
                boot_file_path: "/isolinux.bin".into(),
                load_size_sectors: 4,
                id_string: [0u8; 28],
                selection_criteria: [0u8; 20],
                patch_isolinux: false,
                no_emul_efi: false,
                default_entry: true,
            })
            .unwrap();

        let tmp_out = tempfile::NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(tmp_out.path(), AppendMode::Overwrite).unwrap();
        let cancel = AtomicBool::new(false);
        write_session(&volume, &WriteOptions::default(), &mut backend, &cancel).unwrap();

        let written = std::fs::read(tmp_out.path()).unwrap();
        let pvd_offset = 16 * SECTOR_SIZE as usize;
        assert_eq!(&written[pvd_offset..pvd_offset + 6], [1, b'C', b'D', b'0', b'0', b'1']);
        let boot_record_offset = 17 * SECTOR_SIZE as usize;
        assert_eq!(&written[boot_record_offset..boot_record_offset + 6], [0, b'C', b'D', b'0', b'0', b'1']);
    }

    #[test]
    fn mbr_overlay_sets_the_boot_signature() {
        use crate::boot::{MbrOverlay, SystemAreaOverlay};

        let mut volume = Volume::new();
        volume.volume_id = "MBRVOL".to_string();
        volume.system_area_overlay = Some(SystemAreaOverlay::Mbr(MbrOverlay {
            partition_type: 0x0b,
            bootable: true,
            appended_partitions: Vec::new(),
        }));

        let tmp_out = tempfile::NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(tmp_out.path(), AppendMode::Overwrite).unwrap();
        let cancel = AtomicBool::new(false);
        write_session(&volume, &WriteOptions::default(), &mut backend, &cancel).unwrap();

        let written = std::fs::read(tmp_out.path()).unwrap();
        assert_eq!(written[510], 0x55);
        assert_eq!(written[511], 0xaa);
        assert_eq!(written[446 + 4], 0x0b);
    }
}
