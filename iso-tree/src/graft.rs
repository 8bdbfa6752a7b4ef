//! Graft-in: the core insertion primitive (spec §4.4.2).
//!
//! `graft(disk_path?, img_path, options)` walks or creates every intermediate directory
//! component of `img_path`, then creates (or merges into) the leaf according to the overwrite
//! policy. Regular disk files larger than the configured split threshold become a directory of
//! `cut_out` slices instead of one oversized node.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::error::{Result, TreeError};
use crate::node::{DirectoryData, HideFlags, Mode, Node, NodeKind, NodeRef, SpecialKind, DeviceNumber, FileData};
use crate::path::{self, validate_component};
use crate::stream::{Leaf, StreamChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Fail if a node already exists at the target name.
    Never,
    /// Overwrite anything but a directory.
    NonDir,
    /// Overwrite anything; overwriting directory-with-directory merges.
    Always,
}

/// What to create at the leaf (spec §4.4.2 table).
#[derive(Debug, Clone)]
pub enum GraftSource {
    /// Import from disk: a regular file, directory (recursed into unless `no_dive`), symlink
    /// (followed per `follow_symlink_interior`, or recreated verbatim), or special file.
    Disk(PathBuf),
    Mkdir,
    Symlink(String),
    CutOut { path: PathBuf, offset: u64, size: u64 },
}

#[derive(Debug, Clone)]
pub struct GraftOptions {
    pub source: GraftSource,
    pub hide_iso_rr: bool,
    pub hide_joliet: bool,
    pub hide_hfsplus: bool,
    pub no_dive: bool,
    pub no_reassure: bool,
    pub overwrite: OverwritePolicy,
    /// Follow a symlink passed directly as `disk_path` for this call.
    pub follow_symlink_param: bool,
    /// Follow symlinks encountered while recursing into a directory.
    pub follow_symlink_interior: bool,
    /// Cross filesystem boundaries while recursing.
    pub follow_mount: bool,
}

impl GraftOptions {
    pub fn disk(path: impl Into<PathBuf>) -> Self {
        Self {
            source: GraftSource::Disk(path.into()),
            hide_iso_rr: false,
            hide_joliet: false,
            hide_hfsplus: false,
            no_dive: false,
            no_reassure: false,
            overwrite: OverwritePolicy::Never,
            follow_symlink_param: false,
            follow_symlink_interior: false,
            follow_mount: false,
        }
    }

    pub fn mkdir() -> Self {
        Self { source: GraftSource::Mkdir, ..Self::disk(PathBuf::new()) }
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Self { source: GraftSource::Symlink(target.into()), ..Self::disk(PathBuf::new()) }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GraftConfig {
    /// Files at or above this size are split into `part_NNN_of_MMM_...` slices (spec §4.4.2
    /// step 4).
    pub split_threshold: u64,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self { split_threshold: 4 * 1024 * 1024 * 1024 }
    }
}

/// Exclusion check hook: returns true if `disk_path` should be skipped. Kept as a plain
/// callback rather than a trait object so callers (the CLI's pattern-expansion layer) can
/// plug in Unix-shell semantics without this crate depending on them (spec §1 "Out of scope").
pub type ExclusionPredicate<'a> = dyn Fn(&Path) -> bool + 'a;

struct GraftCtx<'a> {
    cfg: GraftConfig,
    excluded: &'a ExclusionPredicate<'a>,
    visiting: HashSet<PathBuf>,
}

/// Insert `options.source` at `img_path` under `root`, creating intermediate directories as
/// needed (spec §4.4.2).
pub fn graft(
    root: &NodeRef,
    img_path: &str,
    options: GraftOptions,
    cfg: GraftConfig,
    excluded: &ExclusionPredicate<'_>,
) -> Result<NodeRef> {
    let normalized = path::normalize("/", img_path)?;
    let components = path::components(&normalized);
    let Some((leaf_name, parent_components)) = components.split_last() else {
        return Err(TreeError::InvalidComponent("/".to_string()));
    };
    validate_component(leaf_name)?;

    let mut ctx = GraftCtx { cfg, excluded, visiting: HashSet::new() };
    let parent = ensure_dir_path(root, parent_components)?;
    place_leaf(&parent, leaf_name, options, &mut ctx)
}

/// Walk/create every intermediate directory component, returning the final directory.
fn ensure_dir_path(root: &NodeRef, components: &[&str]) -> Result<NodeRef> {
    let mut current = Rc::clone(root);
    for name in components {
        validate_component(name)?;
        let existing = {
            let borrowed = current.borrow();
            let NodeKind::Directory(dir) = &borrowed.kind else {
                return Err(TreeError::NotADirectory(Node::reconstruct_path(&current)));
            };
            dir.get(*name).cloned()
        };
        current = match existing {
            Some(node) => {
                if !node.borrow().is_directory() {
                    return Err(TreeError::NotADirectory(Node::reconstruct_path(&node)));
                }
                node
            }
            None => {
                let child = Node::new(name.to_string(), NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
                child.borrow_mut().parent = Some(Rc::downgrade(&current));
                let mut borrowed = current.borrow_mut();
                let NodeKind::Directory(dir) = &mut borrowed.kind else { unreachable!() };
                dir.insert(name.to_string(), Rc::clone(&child)).ok();
                drop(borrowed);
                child
            }
        };
    }
    Ok(current)
}

fn place_leaf(parent: &NodeRef, name: &str, options: GraftOptions, ctx: &mut GraftCtx<'_>) -> Result<NodeRef> {
    if let GraftSource::Disk(ref disk_path) = options.source {
        if disk_path.as_os_str().len() > 0 && (ctx.excluded)(disk_path) {
            return Err(TreeError::Disk(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is excluded", disk_path.display()),
            )));
        }
    }

    let existing = {
        let NodeKind::Directory(dir) = &parent.borrow().kind else {
            return Err(TreeError::NotADirectory(Node::reconstruct_path(parent)));
        };
        dir.get(name).cloned()
    };

    if let Some(existing_node) = existing {
        match options.overwrite {
            OverwritePolicy::Never => return Err(TreeError::OverwriteRefused(name.to_string())),
            OverwritePolicy::NonDir => {
                if existing_node.borrow().is_directory() {
                    return Err(TreeError::OverwriteRefused(name.to_string()));
                }
                remove_child(parent, name);
            }
            OverwritePolicy::Always => {
                let merging_dirs = existing_node.borrow().is_directory()
                    && matches!(options.source, GraftSource::Disk(ref p) if p.is_dir());
                if !merging_dirs {
                    remove_child(parent, name);
                }
            }
        }
    }

    let node = build_node(name, &options, ctx)?;
    node.borrow_mut().hide = hide_flags(&options);
    node.borrow_mut().parent = Some(Rc::downgrade(parent));

    {
        let mut borrowed = parent.borrow_mut();
        let NodeKind::Directory(dir) = &mut borrowed.kind else { unreachable!() };
        if dir.get(name).is_none() {
            dir.insert(name.to_string(), Rc::clone(&node))
                .map_err(|_| TreeError::DuplicateFilename(name.to_string()))?;
        }
    }

    if let GraftSource::Disk(disk_path) = &options.source {
        if disk_path.is_dir() && !options.no_dive {
            recurse_directory(&node, disk_path, &options, ctx)?;
        }
    }

    Ok(node)
}

fn hide_flags(options: &GraftOptions) -> HideFlags {
    let mut flags = HideFlags::empty();
    if options.hide_iso_rr {
        flags |= HideFlags::ISO_RR;
    }
    if options.hide_joliet {
        flags |= HideFlags::JOLIET;
    }
    if options.hide_hfsplus {
        flags |= HideFlags::HFSPLUS;
    }
    flags
}

fn remove_child(parent: &NodeRef, name: &str) {
    let mut borrowed = parent.borrow_mut();
    if let NodeKind::Directory(dir) = &mut borrowed.kind {
        dir.remove(name);
    }
}

fn build_node(name: &str, options: &GraftOptions, ctx: &mut GraftCtx<'_>) -> Result<NodeRef> {
    match &options.source {
        GraftSource::Mkdir => Ok(Node::new(name, NodeKind::Directory(DirectoryData::default()), Mode::new(0o755))),
        GraftSource::Symlink(target) => {
            Ok(Node::new(name, NodeKind::Symlink(target.clone()), Mode::new(0o120777)))
        }
        GraftSource::CutOut { path, offset, size } => {
            let chain = StreamChain::from_leaf(Leaf::CutOut { path: path.clone(), offset: *offset, size: *size });
            let node = Node::new(name, NodeKind::File(FileData { content: chain, size_override: Some(*size) }), Mode::new(0o644));
            apply_disk_metadata(&node, path)?;
            Ok(node)
        }
        GraftSource::Disk(disk_path) => build_from_disk(name, disk_path, options, ctx),
    }
}

fn build_from_disk(name: &str, disk_path: &Path, options: &GraftOptions, ctx: &mut GraftCtx<'_>) -> Result<NodeRef> {
    let follow = options.follow_symlink_param;
    let metadata = if follow { fs::metadata(disk_path) } else { fs::symlink_metadata(disk_path) }?;
    let file_type = metadata.file_type();

    let node = if file_type.is_dir() {
        let canonical = fs::canonicalize(disk_path).unwrap_or_else(|_| disk_path.to_path_buf());
        if !ctx.visiting.insert(canonical.clone()) {
            return Err(TreeError::SymlinkLoop(disk_path.display().to_string()));
        }
        let node = Node::new(name, NodeKind::Directory(DirectoryData::default()), Mode::new(metadata.mode()));
        ctx.visiting.remove(&canonical);
        node
    } else if file_type.is_symlink() {
        let target = fs::read_link(disk_path)?;
        Node::new(name, NodeKind::Symlink(target.to_string_lossy().into_owned()), Mode::new(0o120777))
    } else if file_type.is_file() {
        let size = metadata.len();
        if size >= ctx.cfg.split_threshold {
            return build_split_file(name, disk_path, size, ctx.cfg.split_threshold);
        }
        let chain = StreamChain::from_leaf(Leaf::Disk(disk_path.to_path_buf()));
        Node::new(name, NodeKind::File(FileData { content: chain, size_override: Some(size) }), Mode::new(metadata.mode()))
    } else if file_type.is_fifo() {
        Node::new(name, NodeKind::Special(SpecialKind::Fifo), Mode::new(metadata.mode()))
    } else if file_type.is_socket() {
        Node::new(name, NodeKind::Special(SpecialKind::Socket), Mode::new(metadata.mode()))
    } else if file_type.is_char_device() {
        let dev = DeviceNumber { major: rdev_major(metadata.rdev()), minor: rdev_minor(metadata.rdev()) };
        Node::new(name, NodeKind::Special(SpecialKind::CharDevice(dev)), Mode::new(metadata.mode()))
    } else if file_type.is_block_device() {
        let dev = DeviceNumber { major: rdev_major(metadata.rdev()), minor: rdev_minor(metadata.rdev()) };
        Node::new(name, NodeKind::Special(SpecialKind::BlockDevice(dev)), Mode::new(metadata.mode()))
    } else {
        return Err(TreeError::Disk(std::io::Error::new(std::io::ErrorKind::Unsupported, "unsupported disk file type")));
    };

    apply_disk_metadata(&node, disk_path)?;
    if node.borrow().is_regular_file() {
        node.borrow_mut().attrs.set_disk_inode(metadata.dev(), metadata.ino());
    }
    Ok(node)
}

/// Split a file at or above the threshold into `part_NNN_of_MMM_at_BYTES_with_LEN_of_TOTAL`
/// cut-out slices under a synthetic directory (spec §4.4.2 step 4).
fn build_split_file(name: &str, disk_path: &Path, total_size: u64, split_threshold: u64) -> Result<NodeRef> {
    let dir_node = Node::new(name, NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
    let part_count = total_size.div_ceil(split_threshold);

    for part_index in 0..part_count {
        let offset = part_index * split_threshold;
        let len = split_threshold.min(total_size - offset);
        let part_name = format!(
            "part_{:03}_of_{:03}_at_{}_with_LEN_of_{}",
            part_index + 1,
            part_count,
            offset,
            total_size
        );
        let chain = StreamChain::from_leaf(Leaf::CutOut { path: disk_path.to_path_buf(), offset, size: len });
        let part_node = Node::new(part_name.clone(), NodeKind::File(FileData { content: chain, size_override: Some(len) }), Mode::new(0o644));
        part_node.borrow_mut().parent = Some(Rc::downgrade(&dir_node));
        let mut borrowed = dir_node.borrow_mut();
        let NodeKind::Directory(dir) = &mut borrowed.kind else { unreachable!() };
        dir.insert(part_name, part_node).ok();
    }

    Ok(dir_node)
}

fn recurse_directory(dir_node: &NodeRef, disk_path: &Path, options: &GraftOptions, ctx: &mut GraftCtx<'_>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(disk_path)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let entry_path = entry.path();
        if (ctx.excluded)(&entry_path) {
            continue;
        }
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        validate_component(&entry_name)?;

        let child_options = GraftOptions {
            source: GraftSource::Disk(entry_path.clone()),
            hide_iso_rr: options.hide_iso_rr,
            hide_joliet: options.hide_joliet,
            hide_hfsplus: options.hide_hfsplus,
            no_dive: options.no_dive,
            no_reassure: options.no_reassure,
            overwrite: options.overwrite,
            follow_symlink_param: options.follow_symlink_interior,
            follow_symlink_interior: options.follow_symlink_interior,
            follow_mount: options.follow_mount,
        };

        place_leaf(dir_node, &entry_name, child_options, ctx)?;
    }
    Ok(())
}

/// Transfer mode/uid/gid/atime/mtime/ctime from the disk side (spec §4.4.2 step 5).
fn apply_disk_metadata(node: &NodeRef, disk_path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(disk_path)?;
    let mut borrowed = node.borrow_mut();
    borrowed.uid = metadata.uid();
    borrowed.gid = metadata.gid();
    borrowed.atime = epoch_seconds_to_datetime(metadata.atime());
    borrowed.mtime = epoch_seconds_to_datetime(metadata.mtime());
    borrowed.ctime = epoch_seconds_to_datetime(metadata.ctime());
    Ok(())
}

fn epoch_seconds_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

fn rdev_major(rdev: u64) -> u32 {
    ((rdev >> 8) & 0xfff) as u32
}

fn rdev_minor(rdev: u64) -> u32 {
    (rdev & 0xff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn no_exclusions(_: &Path) -> bool {
        false
    }

    #[test]
    fn graft_single_file_preserves_mode_and_content() {
        let tmp = tempfile::tempdir().unwrap();
        let file_path = tmp.path().join("f");
        fs::write(&file_path, vec![0x61u8; 2048]).unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o640)).unwrap();

        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let node = graft(&root, "/F", GraftOptions::disk(&file_path), GraftConfig::default(), &no_exclusions).unwrap();

        assert_eq!(node.borrow().mode.permission_bits(), 0o640);
        assert!(node.borrow().is_regular_file());
    }

    #[test]
    fn graft_creates_intermediate_directories() {
        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        graft(&root, "/a/b/c", GraftOptions::mkdir(), GraftConfig::default(), &no_exclusions).unwrap();

        let borrowed = root.borrow();
        let NodeKind::Directory(dir) = &borrowed.kind else { unreachable!() };
        let a = dir.get("a").unwrap();
        assert!(a.borrow().is_directory());
    }

    #[test]
    fn graft_never_policy_refuses_existing() {
        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        graft(&root, "/x", GraftOptions::mkdir(), GraftConfig::default(), &no_exclusions).unwrap();
        let result = graft(&root, "/x", GraftOptions::mkdir(), GraftConfig::default(), &no_exclusions);
        assert!(result.is_err());
    }

    #[test]
    fn oversized_file_splits_into_parts() {
        let tmp = tempfile::tempdir().unwrap();
        let file_path = tmp.path().join("big");
        fs::write(&file_path, vec![0u8; 3000]).unwrap();

        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let cfg = GraftConfig { split_threshold: 1000 };
        let node = graft(&root, "/big", GraftOptions::disk(&file_path), cfg, &no_exclusions).unwrap();

        assert!(node.borrow().is_directory());
        let NodeKind::Directory(dir) = &node.borrow().kind else { unreachable!() };
        assert_eq!(dir.len(), 3);
    }
}
