//! The ISO Node (spec §3.2): directory / file / symlink / special / boot-catalog variants, plus
//! the attributes every node carries.
//!
//! Parent↔child references are cyclic by nature (a directory's children need to find their way
//! back to it for path reconstruction) so they are modeled per spec §9 "Design notes": each
//! directory owns its children strongly (`Rc`), and children hold only a weak back-reference.
//! Orphans (not yet linked under any parent) are permitted transiently during rename/move.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::aaip::AttributeDictionary;
use crate::stream::StreamChain;

pub type NodeRef = Rc<RefCell<Node>>;
pub type WeakNodeRef = Weak<RefCell<Node>>;

bitflags! {
    /// Which published trees a node is hidden from (spec §3.2 "hide-flags").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HideFlags: u8 {
        const ISO_RR  = 1 << 0;
        const JOLIET  = 1 << 1;
        const HFSPLUS = 1 << 2;
    }
}

/// POSIX mode bits including the type nibble, newtype'd so ACL/graft code can manipulate
/// permission bits without reaching into a bare `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(u32);

impl Mode {
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn permission_bits(self) -> u32 {
        self.0 & 0o7777
    }

    /// Reinterpret the group triplet from a `group::rwx`-style ACL text fragment (spec §4.4.6:
    /// "Setting an ACL whose group:: entry differs from st_mode automatically adjusts
    /// st_mode").
    pub fn set_group_rwx_from_text(&mut self, perm: &str) {
        let mut bits = 0u32;
        let chars: Vec<char> = perm.chars().collect();
        if chars.first() == Some(&'r') {
            bits |= 0o040;
        }
        if chars.get(1) == Some(&'w') {
            bits |= 0o020;
        }
        if chars.get(2) == Some(&'x') {
            bits |= 0o010;
        }
        self.0 = (self.0 & !0o070) | bits;
    }
}

/// A device node's major/minor, stored in a fixed-width carrier regardless of the host
/// platform's native `dev_t` width (spec §9 "Portability of st_rdev and dev_t").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    CharDevice(DeviceNumber),
    BlockDevice(DeviceNumber),
    Fifo,
    Socket,
}

/// One El Torito boot catalog entry, carried as the payload of a `BootCatalog` node (spec
/// §3.2, §4.4.7). The catalog bytes themselves are assembled at session-write time from
/// [`crate::boot::BootCatalog`]; this node only makes the catalog addressable/visible as a
/// virtual file in the tree the way the original engine does.
#[derive(Debug, Clone, Default)]
pub struct BootCatalogData {
    pub rendered: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct DirectoryData {
    children: BTreeMap<String, NodeRef>,
}

impl DirectoryData {
    pub fn get(&self, name: &str) -> Option<&NodeRef> {
        self.children.get(name)
    }

    /// Insert a child, failing if the name is already taken (spec §3.2 invariant: "Filenames
    /// within one directory are unique").
    pub fn insert(&mut self, name: String, node: NodeRef) -> Result<(), NodeRef> {
        if self.children.contains_key(&name) {
            return Err(node);
        }
        self.children.insert(name, node);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<NodeRef> {
        self.children.remove(name)
    }

    /// Live iterator (spec §9 "Iteration during mutation"): valid only while the caller does
    /// not mutate this directory during iteration.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeRef)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Snapshot iterator (spec §9): materializes `(name, NodeRef)` pairs up front, safe to use
    /// across a rename/delete loop.
    pub fn snapshot(&self) -> Vec<(String, NodeRef)> {
        self.children.iter().map(|(k, v)| (k.clone(), Rc::clone(v))).collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug)]
pub struct FileData {
    pub content: StreamChain,
    pub size_override: Option<u64>,
}

#[derive(Debug)]
pub enum NodeKind {
    Directory(DirectoryData),
    File(FileData),
    Symlink(String),
    Special(SpecialKind),
    BootCatalog(BootCatalogData),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Directory(_) => "directory",
            NodeKind::File(_) => "file",
            NodeKind::Symlink(_) => "symlink",
            NodeKind::Special(_) => "special",
            NodeKind::BootCatalog(_) => "boot-catalog",
        }
    }
}

/// One node in the image tree (spec §3.2). Attributes are shared across every variant; the
/// variant-specific payload lives in [`NodeKind`].
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub mode: Mode,
    pub uid: u32,
    pub gid: u32,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub parent: Option<WeakNodeRef>,
    pub hide: HideFlags,
    pub sort_weight: i32,
    pub attrs: AttributeDictionary,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind, mode: Mode) -> NodeRef {
        let now = Utc::now();
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind,
            mode,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
            parent: None,
            hide: HideFlags::empty(),
            sort_weight: 0,
            attrs: AttributeDictionary::new(),
        }))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn is_regular_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    /// Reconstruct this node's absolute path by walking weak parent links to the root (spec
    /// §3.2 "parent pointer (weak, for path reconstruction)").
    pub fn reconstruct_path(node: &NodeRef) -> String {
        let mut components = Vec::new();
        let mut current = Rc::clone(node);
        loop {
            let parent = current.borrow().parent.clone();
            match parent.and_then(|w| w.upgrade()) {
                Some(parent_rc) => {
                    components.push(current.borrow().name.clone());
                    current = parent_rc;
                }
                None => break,
            }
        }
        components.reverse();
        format!("/{}", components.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_rejects_duplicate_names() {
        let mut dir = DirectoryData::default();
        let a = Node::new("x", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let b = Node::new("x", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        assert!(dir.insert("x".into(), a).is_ok());
        assert!(dir.insert("x".into(), b).is_err());
    }

    #[test]
    fn path_reconstruction_walks_weak_parents() {
        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let child = Node::new("a", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        child.borrow_mut().parent = Some(Rc::downgrade(&root));
        assert_eq!(Node::reconstruct_path(&child), "/a");
    }
}
