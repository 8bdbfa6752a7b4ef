//! Path-addressed node lookup shared by callers that already hold a root and just need the
//! node a path resolves to (spec §4.4.1), as opposed to [`crate::graft`]'s create-as-you-walk
//! behavior or [`crate::volume::Volume::resolve_reachable`]'s reachability-only check.

use std::rc::Rc;

use crate::error::{Result, TreeError};
use crate::node::{Node, NodeKind, NodeRef};
use crate::path;

/// Resolve `img_path` against `root`, failing if any intermediate component is missing or not
/// a directory, or the leaf itself does not exist.
pub fn resolve(root: &NodeRef, img_path: &str) -> Result<NodeRef> {
    let normalized = path::normalize("/", img_path)?;
    let mut current = Rc::clone(root);
    for component in path::components(&normalized) {
        let next = {
            let borrowed = current.borrow();
            let NodeKind::Directory(dir) = &borrowed.kind else {
                return Err(TreeError::NotADirectory(Node::reconstruct_path(&current)));
            };
            dir.get(component).cloned()
        };
        current = next.ok_or_else(|| TreeError::NotFound(img_path.to_string()))?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graft::{graft, GraftConfig, GraftOptions};

    #[test]
    fn resolves_grafted_leaf() {
        let root = Node::new("", NodeKind::Directory(Default::default()), crate::node::Mode::new(0o755));
        graft(&root, "/a/b", GraftOptions::mkdir(), GraftConfig::default(), &|_| false).unwrap();
        let found = resolve(&root, "/a/b").unwrap();
        assert_eq!(found.borrow().name, "b");
    }

    #[test]
    fn missing_leaf_is_not_found() {
        let root = Node::new("", NodeKind::Directory(Default::default()), crate::node::Mode::new(0o755));
        assert!(resolve(&root, "/nope").is_err());
    }
}
