//! Path-addressed filter management (spec §4.4.4): `setFilter`/`removeFilter`/
//! `removeAllFilters` wrap or unwrap a file node's stream chain and keep the node's filename in
//! sync with whichever suffix the outermost filter calls for.

use crate::error::{Result, TreeError};
use crate::lookup::resolve;
use crate::node::{NodeKind, NodeRef};
use crate::stream::FilterStage;

/// Wrap the file at `path`'s current stream with `stage`, appending its suffix to the
/// filename if it has one (spec §4.4.4: "attach the filename suffix ... on forward filter").
pub fn set_filter(root: &NodeRef, path: &str, stage: FilterStage) -> Result<NodeRef> {
    let node = resolve(root, path)?;
    {
        let mut borrowed = node.borrow_mut();
        let suffix = stage.suffix().map(str::to_string);
        let NodeKind::File(file) = &mut borrowed.kind else {
            return Err(TreeError::NotADirectory(path.to_string()));
        };
        file.content.push_filter(stage);
        drop(file);
        if let Some(suffix) = suffix {
            borrowed.name.push_str(&suffix);
        }
    }
    Ok(node)
}

/// Pop the outermost filter from the file at `path`, stripping the suffix it was wearing if
/// the filename still ends with it (spec §4.4.4 `removeFilter`).
pub fn remove_filter(root: &NodeRef, path: &str) -> Result<()> {
    let node = resolve(root, path)?;
    let mut borrowed = node.borrow_mut();
    let NodeKind::File(file) = &mut borrowed.kind else {
        return Err(TreeError::NotADirectory(path.to_string()));
    };
    let Some(popped) = file.content.pop_filter() else {
        return Ok(());
    };
    if let Some(suffix) = popped.suffix() {
        if let Some(stripped) = borrowed.name.strip_suffix(suffix) {
            let stripped = stripped.to_string();
            borrowed.name = stripped;
        }
    }
    Ok(())
}

/// Pop every filter down to the leaf, restoring the filename to what it was before any filter
/// was ever applied (spec §4.4.4 `removeAllFilters`).
pub fn remove_all_filters(root: &NodeRef, path: &str) -> Result<()> {
    loop {
        let node = resolve(root, path)?;
        let has_filters = {
            let borrowed = node.borrow();
            let NodeKind::File(file) = &borrowed.kind else {
                return Err(TreeError::NotADirectory(path.to_string()));
            };
            !file.content.filters.is_empty()
        };
        if !has_filters {
            return Ok(());
        }
        remove_filter(root, path)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graft::{graft, GraftConfig, GraftOptions};
    use crate::node::{DirectoryData, Mode, Node, NodeKind as NK};

    fn root_with_file(content: &[u8]) -> (NodeRef, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long");
        std::fs::write(&path, content).unwrap();
        let root = Node::new("", NK::Directory(DirectoryData::default()), Mode::new(0o755));
        graft(&root, "/long", GraftOptions::disk(&path), GraftConfig::default(), &|_| false).unwrap();
        (root, dir)
    }

    #[test]
    fn set_filter_appends_suffix_and_wraps_stream() {
        let (root, _dir) = root_with_file(b"abcd".repeat(16384).as_slice());
        set_filter(&root, "/long", FilterStage::GzipEncode).unwrap();
        let node = resolve(&root, "/long.gz").unwrap();
        assert_eq!(node.borrow().name, "long.gz");

        use std::io::Read;
        let NodeKind::File(file) = &node.borrow().kind else { unreachable!() };
        let mut compressed = Vec::new();
        file.content.open().unwrap().read_to_end(&mut compressed).unwrap();
        assert_eq!(&compressed[0..2], &[0x1F, 0x8B]);
    }

    #[test]
    fn remove_all_filters_restores_original_name() {
        let (root, _dir) = root_with_file(b"hello world");
        set_filter(&root, "/long", FilterStage::GzipEncode).unwrap();
        remove_all_filters(&root, "/long.gz").unwrap();
        assert!(resolve(&root, "/long").is_ok());
        assert!(resolve(&root, "/long.gz").is_err());
    }
}
