//! The Volume (spec §3.3): the root directory plus every field ISO 9660 hangs off the Primary
//! Volume Descriptor, and the optional El Torito / system-area / HFS+ extras a session write may
//! carry.

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::boot::{BootCatalog, SystemAreaOverlay};
use crate::error::{Result, TreeError};
use crate::node::{DirectoryData, Mode, Node, NodeKind, NodeRef};

bitflags! {
    /// HFS+ volume-level options (spec §3.3 "HFS+ volume options"); per-node HFS+ carriers
    /// (creator/type/blessing) live in the node's AAIP dictionary instead (spec §3.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HfsPlusOptions: u8 {
        /// Emit an Apple Partition Map alongside the ISO 9660 volume so the same image mounts on
        /// classic Mac OS / macOS directly.
        const EMIT_APM = 1 << 0;
        /// Case-insensitive HFS+ catalog (the default HFS+ behavior).
        const CASE_INSENSITIVE = 1 << 1;
    }
}

/// One MIPS boot file list entry (spec §3.3 "optional MIPS boot file list"): a path reachable in
/// the tree plus the load address the MIPS volume header records for it.
#[derive(Debug, Clone)]
pub struct MipsBootFile {
    pub path_in_image: String,
    pub load_address: u32,
}

/// Everything that makes this image's Primary Volume Descriptor and ancillary structures (spec
/// §3.3). The tree itself (root directory and everything under it) is owned separately by
/// [`Volume::root`]; this type is otherwise a plain data bag validated at write time.
#[derive(Debug, Clone)]
pub struct Volume {
    pub root: NodeRef,
    pub volume_id: String,
    pub publisher: String,
    pub data_preparer: String,
    pub application_id: String,
    pub system_id: String,
    pub abstract_file: Option<String>,
    pub bibliographic_file: Option<String>,
    pub copyright_file: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub effective_time: DateTime<Utc>,
    pub volume_uuid: Option<[u8; 16]>,
    pub boot_catalog: BootCatalog,
    pub system_area_overlay: Option<SystemAreaOverlay>,
    pub mips_boot_files: Vec<MipsBootFile>,
    pub hfsplus: HfsPlusOptions,
}

impl Volume {
    /// A new, empty volume: a bare root directory and blank identification fields, ready for
    /// grafts before the first session write.
    pub fn new() -> Self {
        let root = Node::new("", NodeKind::Directory(DirectoryData::default()), Mode::new(0o755));
        let now = Utc::now();
        Self {
            root,
            volume_id: String::new(),
            publisher: String::new(),
            data_preparer: String::new(),
            application_id: String::new(),
            system_id: String::new(),
            abstract_file: None,
            bibliographic_file: None,
            copyright_file: None,
            creation_time: now,
            modification_time: now,
            expiration_time: None,
            effective_time: now,
            volume_uuid: None,
            boot_catalog: BootCatalog::default(),
            system_area_overlay: None,
            mips_boot_files: Vec::new(),
            hfsplus: HfsPlusOptions::empty(),
        }
    }

    /// Validate cross-cutting invariants that must hold before a session write may start (spec
    /// §3.3, §4.4.7): at most one El Torito default entry, every referenced boot file reachable
    /// in the tree, and every MIPS boot file path likewise reachable.
    pub fn validate_before_write(&self) -> Result<()> {
        self.boot_catalog.validate()?;
        for entry in self.boot_catalog.entries() {
            self.resolve_reachable(&entry.boot_file_path)?;
        }
        for mips_file in &self.mips_boot_files {
            self.resolve_reachable(&mips_file.path_in_image)?;
        }
        Ok(())
    }

    /// Resolve an image-tree path to its node, for callers (El Torito/MIPS boot rendering in
    /// `crate::write`) that need the node itself rather than just a reachability check.
    pub(crate) fn resolve_reachable(&self, path: &str) -> Result<NodeRef> {
        let normalized = crate::path::normalize("/", path)?;
        let mut current = std::rc::Rc::clone(&self.root);
        for component in crate::path::components(&normalized) {
            let next = {
                let borrowed = current.borrow();
                let NodeKind::Directory(dir) = &borrowed.kind else {
                    return Err(TreeError::BootImageUnreachable(path.to_string()));
                };
                dir.get(component).cloned()
            };
            current = next.ok_or_else(|| TreeError::BootImageUnreachable(path.to_string()))?;
        }
        Ok(current)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::{BootImageSpec, Emulation, PlatformId};
    use crate::graft::{graft, GraftConfig, GraftOptions};

    #[test]
    fn unreachable_boot_image_fails_validation() {
        let mut volume = Volume::new();
        volume
            .boot_catalog
            .attach(BootImageSpec {
                platform_id: PlatformId::X86,
                emulation: Emulation::None,
                boot_file_path: "/boot/isolinux.bin".into(),
                load_size_sectors: 4,
                id_string: [0u8; 28],
                selection_criteria: [0u8; 20],
                patch_isolinux: true,
                no_emul_efi: false,
                default_entry: true,
            })
            .unwrap();

        assert!(volume.validate_before_write().is_err());
    }

    #[test]
    fn reachable_boot_image_passes_validation() {
        let mut volume = Volume::new();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; 2048]).unwrap();
        graft(&volume.root, "/boot/isolinux.bin", GraftOptions::disk(tmp.path()), GraftConfig::default(), &|_| false).unwrap();

        volume
            .boot_catalog
            .attach(BootImageSpec {
                platform_id: PlatformId::X86,
                emulation: Emulation::None,
                boot_file_path: "/boot/isolinux.bin".into(),
                load_size_sectors: 4,
                id_string: [0u8; 28],
                selection_criteria: [0u8; 20],
                patch_isolinux: true,
                no_emul_efi: false,
                default_entry: true,
            })
            .unwrap();

        assert!(volume.validate_before_write().is_ok());
    }
}
