//! Hardlink and disk-inode auxiliary arrays (spec §3.4, §4.4.3): `hln_array`/`hln_targets` for
//! restore-to-disk reconstruction, `di_array`/`di_do_widen` for propagating disk-side updates
//! across hardlink siblings. Both are invalidated by any tree mutation that changes membership
//! or fingerprint; a dirty flag forces regeneration before the next consumer.

use std::rc::Rc;

use crate::node::NodeRef;

/// One entry in the sorted hardlink array: the (dev, inode) fingerprint, the node itself, and
/// (once discovered) the path under which it should be extracted first so later siblings can
/// `link(2)` to it.
#[derive(Debug, Clone)]
pub struct HardlinkEntry {
    pub fingerprint: (u64, u64),
    pub node: NodeRef,
    pub target_path: Option<String>,
}

/// `hln_array` + `hln_targets` (spec §3.4): all image nodes sharing a fingerprint with at
/// least one sibling, sorted by `(fingerprint, node pointer)` for O(log n) sibling search.
#[derive(Debug, Default)]
pub struct HardlinkArrays {
    entries: Vec<HardlinkEntry>,
    dirty: bool,
}

impl HardlinkArrays {
    pub fn new() -> Self {
        Self { entries: Vec::new(), dirty: true }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild from every file node the caller hands in, keeping only fingerprints that occur
    /// more than once (a hardlink *set*, not a singleton).
    pub fn rebuild(&mut self, file_nodes: impl IntoIterator<Item = NodeRef>) {
        let mut by_fingerprint: Vec<(u64, u64, NodeRef)> = Vec::new();
        for node in file_nodes {
            let fingerprint = node.borrow().attrs.disk_inode();
            if let Some(fp) = fingerprint {
                by_fingerprint.push((fp.0, fp.1, node));
            }
        }
        by_fingerprint.sort_by(|a, b| (a.0, a.1, Rc::as_ptr(&a.2) as usize).cmp(&(b.0, b.1, Rc::as_ptr(&b.2) as usize)));

        self.entries.clear();
        let mut i = 0;
        while i < by_fingerprint.len() {
            let mut j = i + 1;
            while j < by_fingerprint.len() && by_fingerprint[j].0 == by_fingerprint[i].0 && by_fingerprint[j].1 == by_fingerprint[i].1 {
                j += 1;
            }
            if j - i >= 2 {
                for entry in &by_fingerprint[i..j] {
                    self.entries.push(HardlinkEntry {
                        fingerprint: (entry.0, entry.1),
                        node: Rc::clone(&entry.2),
                        target_path: None,
                    });
                }
            }
            i = j;
        }
        self.dirty = false;
    }

    /// All siblings sharing one fingerprint, in array order.
    pub fn siblings(&self, fingerprint: (u64, u64)) -> impl Iterator<Item = &HardlinkEntry> {
        self.entries.iter().filter(move |e| e.fingerprint == fingerprint)
    }

    /// Record the path the first sibling was extracted to, so later siblings can `link(2)` to
    /// it instead of copying content again (spec §4.4.3 "Restore reconstruction").
    pub fn record_target(&mut self, fingerprint: (u64, u64), path: String) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.fingerprint == fingerprint && e.target_path.is_none()) {
            entry.target_path = Some(path);
        }
    }

    pub fn target_for(&self, fingerprint: (u64, u64)) -> Option<&str> {
        self.entries.iter().find_map(|e| if e.fingerprint == fingerprint { e.target_path.as_deref() } else { None })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `di_array` + `di_do_widen` (spec §3.4): nodes known to share dev/inode with at least one
/// on-disk file, used to propagate updates across siblings. `di_do_widen` marks siblings that
/// still need re-restore after one member of the set was updated.
#[derive(Debug, Default)]
pub struct DiskInodeArrays {
    nodes: Vec<NodeRef>,
    do_widen: Vec<bool>,
    dirty: bool,
}

impl DiskInodeArrays {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), do_widen: Vec::new(), dirty: true }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn rebuild(&mut self, disk_backed_nodes: impl IntoIterator<Item = NodeRef>) {
        self.nodes = disk_backed_nodes.into_iter().collect();
        self.do_widen = vec![false; self.nodes.len()];
        self.dirty = false;
    }

    /// Mark every other node sharing `fingerprint` with `updated` as needing re-restore (spec
    /// §4.4.3: "all siblings are marked for re-restore during the next on-disk extraction").
    pub fn mark_siblings_for_widen(&mut self, updated: &NodeRef, fingerprint: (u64, u64)) {
        for (node, widen) in self.nodes.iter().zip(self.do_widen.iter_mut()) {
            if !Rc::ptr_eq(node, updated) && node.borrow().attrs.disk_inode() == Some(fingerprint) {
                *widen = true;
            }
        }
    }

    pub fn needs_widen(&self, node: &NodeRef) -> bool {
        self.nodes
            .iter()
            .zip(self.do_widen.iter())
            .find(|(n, _)| Rc::ptr_eq(n, node))
            .map(|(_, w)| *w)
            .unwrap_or(false)
    }

    pub fn clear_widen(&mut self, node: &NodeRef) {
        if let Some((_, widen)) = self.nodes.iter().zip(self.do_widen.iter_mut()).find(|(n, _)| Rc::ptr_eq(n, node)) {
            *widen = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FileData, Mode, Node, NodeKind};
    use crate::stream::{Leaf, StreamChain};

    fn file_node(dev: u64, inode: u64) -> NodeRef {
        let node = Node::new(
            "f",
            NodeKind::File(FileData {
                content: StreamChain::from_leaf(Leaf::Disk("/nonexistent".into())),
                size_override: None,
            }),
            Mode::new(0o644),
        );
        node.borrow_mut().attrs.set_disk_inode(dev, inode);
        node
    }

    #[test]
    fn rebuild_keeps_only_true_sibling_sets() {
        let mut arrays = HardlinkArrays::new();
        let a = file_node(1, 100);
        let b = file_node(1, 100);
        let c = file_node(1, 200);
        arrays.rebuild(vec![a, b, c]);
        assert_eq!(arrays.siblings((1, 100)).count(), 2);
        assert_eq!(arrays.siblings((1, 200)).count(), 0);
    }
}
