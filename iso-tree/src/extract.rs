//! Restore-to-disk reconstruction (spec §4.4.3): materialize an in-memory tree (typically one
//! just produced by [`crate::read::read_volume`]) as real files under a destination directory.
//!
//! This is the inverse of [`crate::graft`]: where grafting reads disk metadata into a node,
//! extraction writes a node's attributes back out via `chown`/`chmod`/`utimensat`. Hardlink
//! reconstruction leans on [`crate::hardlink::HardlinkArrays`] exactly as spec §3.4 describes:
//! the first sibling extracted under a fingerprint is written out in full and recorded as the
//! link target; every later sibling just calls `link(2)` against it.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;

use nix::sys::stat::{mknod, utimes, Mode as NixMode, SFlag};
use nix::sys::time::TimeVal;
use nix::unistd::{chown, Gid, Uid};

use crate::error::{Result, TreeError};
use crate::hardlink::HardlinkArrays;
use crate::node::{DirectoryData, NodeKind, NodeRef, SpecialKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Apply the recorded uid/gid (spec §4.4.3); normally only meaningful running as root.
    pub preserve_owner: bool,
    /// Apply the recorded mtime/atime after writing content.
    pub preserve_times: bool,
}

/// Recreate `root` and everything under it as real files rooted at `dest`. `dest` itself must
/// already exist; its own metadata is left untouched (spec §4.4.3 talks only about what's
/// extracted, not the extraction target itself).
pub fn restore_to_disk(root: &NodeRef, dest: &Path, options: RestoreOptions) -> Result<()> {
    let mut hardlinks = HardlinkArrays::new();
    hardlinks.rebuild(collect_file_nodes(root));
    restore_directory_contents(root, dest, options, &mut hardlinks)
}

fn collect_file_nodes(node: &NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    collect_file_nodes_into(node, &mut out);
    out
}

fn collect_file_nodes_into(node: &NodeRef, out: &mut Vec<NodeRef>) {
    let borrowed = node.borrow();
    match &borrowed.kind {
        NodeKind::Directory(dir) => {
            for (_, child) in dir.iter() {
                collect_file_nodes_into(child, out);
            }
        }
        NodeKind::File(_) => out.push(std::rc::Rc::clone(node)),
        _ => {}
    }
}

fn restore_directory_contents(
    dir_node: &NodeRef,
    dest: &Path,
    options: RestoreOptions,
    hardlinks: &mut HardlinkArrays,
) -> Result<()> {
    let entries: Vec<(String, NodeRef)> = {
        let borrowed = dir_node.borrow();
        let NodeKind::Directory(dir) = &borrowed.kind else {
            return Err(TreeError::NotADirectory(crate::node::Node::reconstruct_path(dir_node)));
        };
        dir.snapshot()
    };

    for (name, child) in entries {
        let child_path = dest.join(&name);
        restore_node(&child, &child_path, options, hardlinks)?;
    }
    Ok(())
}

fn restore_node(node: &NodeRef, path: &Path, options: RestoreOptions, hardlinks: &mut HardlinkArrays) -> Result<()> {
    let kind_is_dir = node.borrow().is_directory();

    if !kind_is_dir {
        if let Some(fingerprint) = node.borrow().attrs.disk_inode() {
            if hardlinks.siblings(fingerprint).count() >= 2 {
                if let Some(target) = hardlinks.target_for(fingerprint) {
                    fs::hard_link(target, path).map_err(TreeError::Disk)?;
                    apply_attributes(node, path, options)?;
                    return Ok(());
                }
            }
        }
    }

    {
        let borrowed = node.borrow();
        match &borrowed.kind {
            NodeKind::Directory(_) => {
                fs::create_dir_all(path).map_err(TreeError::Disk)?;
            }
            NodeKind::File(file_data) => {
                let mut out = fs::File::create(path).map_err(TreeError::Disk)?;
                let mut reader = file_data.content.open().map_err(TreeError::Disk)?;
                std::io::copy(&mut reader, &mut out).map_err(TreeError::Disk)?;
                out.flush().map_err(TreeError::Disk)?;
            }
            NodeKind::Symlink(target) => {
                symlink(target, path).map_err(TreeError::Disk)?;
            }
            NodeKind::Special(special) => {
                create_special(path, *special)?;
            }
            NodeKind::BootCatalog(_) => {
                // The boot catalog is a virtual entry rendered only into the ISO image itself
                // (spec §3.2); it has no on-disk counterpart to restore.
                return Ok(());
            }
        }
    }

    apply_attributes(node, path, options)?;

    if kind_is_dir {
        restore_directory_contents(node, path, options, hardlinks)?;
    } else if let Some(fingerprint) = node.borrow().attrs.disk_inode() {
        if hardlinks.siblings(fingerprint).count() >= 2 && hardlinks.target_for(fingerprint).is_none() {
            hardlinks.record_target(fingerprint, path.to_string_lossy().into_owned());
        }
    }

    Ok(())
}

fn create_special(path: &Path, special: SpecialKind) -> Result<()> {
    let (sflag, dev) = match special {
        SpecialKind::Fifo => (SFlag::S_IFIFO, 0),
        SpecialKind::Socket => (SFlag::S_IFSOCK, 0),
        SpecialKind::CharDevice(d) => (SFlag::S_IFCHR, nix::sys::stat::makedev(d.major as u64, d.minor as u64)),
        SpecialKind::BlockDevice(d) => (SFlag::S_IFBLK, nix::sys::stat::makedev(d.major as u64, d.minor as u64)),
    };
    mknod(path, sflag, NixMode::from_bits_truncate(0o644), dev).map_err(|e| TreeError::Disk(std::io::Error::from(e)))
}

fn apply_attributes(node: &NodeRef, path: &Path, options: RestoreOptions) -> Result<()> {
    let borrowed = node.borrow();
    let is_symlink = matches!(borrowed.kind, NodeKind::Symlink(_));

    if !is_symlink {
        let perm = fs::Permissions::from_mode(borrowed.mode.permission_bits());
        fs::set_permissions(path, perm).map_err(TreeError::Disk)?;
    }

    if options.preserve_owner {
        let uid = Uid::from_raw(borrowed.uid);
        let gid = Gid::from_raw(borrowed.gid);
        let _ = chown(path, Some(uid), Some(gid));
    }

    if options.preserve_times && !is_symlink {
        let atime = TimeVal::new(borrowed.atime.timestamp(), 0);
        let mtime = TimeVal::new(borrowed.mtime.timestamp(), 0);
        let _ = utimes(path, &atime, &mtime);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graft::{graft, GraftConfig, GraftOptions};
    use crate::node::{Mode, Node};
    use std::os::unix::fs::MetadataExt;

    #[test]
    fn restores_file_content_and_mode() {
        let src_dir = tempfile::tempdir().unwrap();
        let src_file = src_dir.path().join("f");
        fs::write(&src_file, b"payload").unwrap();
        fs::set_permissions(&src_file, fs::Permissions::from_mode(0o640)).unwrap();

        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        graft(&root, "/f", GraftOptions::disk(&src_file), GraftConfig::default(), &|_| false).unwrap();

        let dest = tempfile::tempdir().unwrap();
        restore_to_disk(&root, dest.path(), RestoreOptions::default()).unwrap();

        let restored = dest.path().join("f");
        assert_eq!(fs::read(&restored).unwrap(), b"payload");
        assert_eq!(fs::metadata(&restored).unwrap().mode() & 0o777, 0o640);
    }

    #[test]
    fn restores_directory_tree() {
        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        graft(&root, "/a/b", GraftOptions::mkdir(), GraftConfig::default(), &|_| false).unwrap();

        let dest = tempfile::tempdir().unwrap();
        restore_to_disk(&root, dest.path(), RestoreOptions::default()).unwrap();

        assert!(dest.path().join("a/b").is_dir());
    }

    #[test]
    fn hardlinked_siblings_share_an_inode_after_restore() {
        let src_dir = tempfile::tempdir().unwrap();
        let src_file = src_dir.path().join("f");
        fs::write(&src_file, b"shared").unwrap();

        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let a = graft(&root, "/a", GraftOptions::disk(&src_file), GraftConfig::default(), &|_| false).unwrap();
        let fingerprint = a.borrow().attrs.disk_inode().unwrap();
        let b = graft(&root, "/b", GraftOptions::disk(&src_file), GraftConfig::default(), &|_| false).unwrap();
        b.borrow_mut().attrs.set_disk_inode(fingerprint.0, fingerprint.1);

        let dest = tempfile::tempdir().unwrap();
        restore_to_disk(&root, dest.path(), RestoreOptions::default()).unwrap();

        let meta_a = fs::metadata(dest.path().join("a")).unwrap();
        let meta_b = fs::metadata(dest.path().join("b")).unwrap();
        assert_eq!(meta_a.ino(), meta_b.ino());
    }
}
