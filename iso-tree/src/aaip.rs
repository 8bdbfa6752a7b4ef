//! AAIP (Arbitrary Attribute Interchange Protocol) attribute dictionary (spec §4.4.5).
//!
//! Names beginning with `isofs.` are reserved for engine use (the disk-inode fingerprint, the
//! persistent HFS+ carriers, per-file MD5 tags); names beginning with `user.` are the ones a
//! caller may set directly. Values are arbitrary bytes, including embedded NULs.

use std::collections::BTreeMap;

use crate::error::{Result, TreeError};

/// Reserved tag carrying the (dev, inode) fingerprint used for hardlink tracking (spec §4.4.3).
pub const TAG_DISK_INODE: &str = "isofs.di";
/// Reserved tag carrying a persistent HFS+ metadata blob (creator/type/blessing) across
/// re-opens of an image that was never mounted on a Mac.
pub const TAG_HFS_EXTRA: &str = "isofs.hx";
/// Reserved tag carrying the HFS+ "blessed" marker independent of `isofs.hx`.
pub const TAG_HFS_BLESS: &str = "isofs.hb";
/// Reserved tag carrying the per-file MD5 content checksum (spec §6.1).
pub const TAG_CONTENT_MD5: &str = "isofs.cs";
/// Reserved tag carrying the POSIX access ACL text.
pub const TAG_ACL_ACCESS: &str = "isofs.aa";
/// Reserved tag carrying the POSIX default ACL text (directories only).
pub const TAG_ACL_DEFAULT: &str = "isofs.da";

const RESERVED_PREFIX: &str = "isofs.";
const USER_PREFIX: &str = "user.";
const REMOVE_ALL_PSEUDO_NAME: &str = "--remove-all";

/// One node's AAIP extension: an ordered map from attribute name to raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDictionary {
    entries: BTreeMap<String, Vec<u8>>,
}

impl AttributeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Engine-internal set, bypassing the `isofs.`-reservation check; used by the tree engine
    /// itself to record `isofs.di`, MD5 tags, etc.
    pub fn set_reserved(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    /// Caller-facing `setAttr` (spec §4.4.5): rejects writes to the `isofs.` namespace, and
    /// treats the pseudo-name `--remove-all` with an empty value as "clear every `user.`
    /// attribute".
    pub fn set_attr(&mut self, name: &str, value: Vec<u8>) -> Result<()> {
        if name == REMOVE_ALL_PSEUDO_NAME {
            if !value.is_empty() {
                return Err(TreeError::ReservedAttributeName(name.to_string()));
            }
            self.entries.retain(|k, _| !k.starts_with(USER_PREFIX));
            return Ok(());
        }
        if name.starts_with(RESERVED_PREFIX) {
            return Err(TreeError::ReservedAttributeName(name.to_string()));
        }
        self.entries.insert(name.to_string(), value);
        Ok(())
    }

    /// Caller-facing delete; same reservation rule as `set_attr`.
    pub fn delete_attr(&mut self, name: &str) -> Result<()> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(TreeError::ReservedAttributeName(name.to_string()));
        }
        self.entries.remove(name);
        Ok(())
    }

    pub fn user_attrs(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(USER_PREFIX))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total serialized size estimate used to check against the ISO ER budget at write time
    /// (spec §8 "Overflow of extended attribute total size").
    pub fn serialized_size(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len() + 8).sum()
    }

    pub fn disk_inode(&self) -> Option<(u64, u64)> {
        let raw = self.get(TAG_DISK_INODE)?;
        if raw.len() != 16 {
            return None;
        }
        let dev = u64::from_be_bytes(raw[0..8].try_into().ok()?);
        let inode = u64::from_be_bytes(raw[8..16].try_into().ok()?);
        Some((dev, inode))
    }

    pub fn set_disk_inode(&mut self, dev: u64, inode: u64) {
        let mut raw = Vec::with_capacity(16);
        raw.extend_from_slice(&dev.to_be_bytes());
        raw.extend_from_slice(&inode.to_be_bytes());
        self.set_reserved(TAG_DISK_INODE, raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_namespace_round_trips() {
        let mut dict = AttributeDictionary::new();
        dict.set_attr("user.comment", b"hello".to_vec()).unwrap();
        assert_eq!(dict.get("user.comment"), Some(b"hello".as_slice()));
    }

    #[test]
    fn isofs_namespace_rejected_from_caller() {
        let mut dict = AttributeDictionary::new();
        assert!(dict.set_attr("isofs.di", vec![0; 16]).is_err());
    }

    #[test]
    fn remove_all_clears_only_user_namespace() {
        let mut dict = AttributeDictionary::new();
        dict.set_attr("user.a", b"1".to_vec()).unwrap();
        dict.set_attr("user.b", b"2".to_vec()).unwrap();
        dict.set_disk_inode(1, 2);
        dict.set_attr(REMOVE_ALL_PSEUDO_NAME, Vec::new()).unwrap();
        assert_eq!(dict.user_attrs().count(), 0);
        assert!(dict.disk_inode().is_some());
    }

    #[test]
    fn disk_inode_round_trip() {
        let mut dict = AttributeDictionary::new();
        dict.set_disk_inode(42, 1337);
        assert_eq!(dict.disk_inode(), Some((42, 1337)));
    }
}
