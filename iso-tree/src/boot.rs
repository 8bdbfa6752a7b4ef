//! El Torito boot catalog assembly and system-area overlays (spec §4.4.7).
//!
//! `BootCatalog` only collects and validates boot entries; the actual catalog bytes (validation
//! entry + section header + section entries, each a 32-byte record per the El Torito spec) are
//! rendered by [`crate::write`] once the session layout is known, since entry records carry LBAs
//! that aren't assigned until then.

use crate::error::{Result, TreeError};

/// El Torito platform ID byte (spec §4.4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformId {
    X86,
    PowerPC,
    Mac,
    Efi,
    Other(u8),
}

impl PlatformId {
    pub fn to_byte(self) -> u8 {
        match self {
            PlatformId::X86 => 0x00,
            PlatformId::PowerPC => 0x01,
            PlatformId::Mac => 0x02,
            PlatformId::Efi => 0xef,
            PlatformId::Other(b) => b,
        }
    }
}

/// Boot media emulation mode a BIOS-mode entry presents to the firmware (spec §4.4.7); EFI
/// entries always use `None` regardless of this field's historical meaning for BIOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emulation {
    None,
    Floppy1_2M,
    Floppy1_44M,
    Floppy2_88M,
    HardDisk,
}

impl Emulation {
    pub fn to_media_type_nibble(self) -> u8 {
        match self {
            Emulation::None => 0x0,
            Emulation::Floppy1_2M => 0x1,
            Emulation::Floppy1_44M => 0x2,
            Emulation::Floppy2_88M => 0x3,
            Emulation::HardDisk => 0x4,
        }
    }
}

/// One boot image entry to attach to the catalog (spec §4.4.7).
#[derive(Debug, Clone)]
pub struct BootImageSpec {
    pub platform_id: PlatformId,
    pub emulation: Emulation,
    /// Path to the boot file within the image tree; must be reachable before a session write
    /// may start ([`crate::volume::Volume::validate_before_write`]).
    pub boot_file_path: String,
    pub load_size_sectors: u16,
    /// Free-form 28-byte ID string the catalog carries for this entry.
    pub id_string: [u8; 28],
    /// 20-byte selection-criteria block (El Torito §2.2's "Selection criteria").
    pub selection_criteria: [u8; 20],
    /// Patch the boot file's `isolinux.bin` boot-info-table in place once its LBA is known
    /// (spec §4.4.7 "Patching isolinux boot tables").
    pub patch_isolinux: bool,
    /// EFI entries with no-emulation media may still set this to request a GPT/FAT stub
    /// attachment instead of a raw catalog entry; kept as a flag since the write engine treats
    /// it as a hint, not a different entry shape.
    pub no_emul_efi: bool,
    /// At most one entry across the whole catalog may claim this (spec §4.4.7 invariant).
    pub default_entry: bool,
}

/// El Torito boot catalog: a validation entry (implicit, derived from the first attached
/// platform) plus zero or more section entries (spec §3.3, §4.4.7).
#[derive(Debug, Clone, Default)]
pub struct BootCatalog {
    entries: Vec<BootImageSpec>,
}

impl BootCatalog {
    pub fn attach(&mut self, spec: BootImageSpec) -> Result<()> {
        if spec.default_entry && self.entries.iter().any(|e| e.default_entry) {
            return Err(TreeError::MultipleDefaultBootEntries);
        }
        self.entries.push(spec);
        Ok(())
    }

    pub fn entries(&self) -> &[BootImageSpec] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-check the at-most-one-default invariant (spec §4.4.7); `attach` already enforces it
    /// incrementally, this is the belt-and-suspenders pre-write check alongside reachability.
    pub fn validate(&self) -> Result<()> {
        if self.entries.iter().filter(|e| e.default_entry).count() > 1 {
            return Err(TreeError::MultipleDefaultBootEntries);
        }
        Ok(())
    }
}

/// A boot file's boot-info-table patch location, computed once the file's starting LBA is known
/// (spec §4.4.7): isolinux expects a 56-byte table at offset 8 within its own first sector.
pub const ISOLINUX_BOOT_INFO_TABLE_OFFSET: usize = 8;
pub const ISOLINUX_BOOT_INFO_TABLE_LEN: usize = 56;

/// Which system-area overlay, if any, occupies the first 16 blocks ahead of the volume
/// descriptor set (spec §3.3); mutually exclusive by construction (one field, one variant).
#[derive(Debug, Clone)]
pub enum SystemAreaOverlay {
    Mbr(MbrOverlay),
    Apm,
    Gpt,
    Grub2Sparc,
    MipsBigEndian,
    MipsLittleEndian,
    SunDisklabel,
}

/// An MBR overlay's appended-partition tagging (spec §3.3 "optional MBR/APM/GPT system-area
/// overlay"): a partition entry pointing at image-relative extents the ISO tree also knows
/// about, so both presentations stay consistent after a later append session.
#[derive(Debug, Clone)]
pub struct MbrOverlay {
    pub partition_type: u8,
    pub bootable: bool,
    /// Extra partitions appended past the ISO 9660 data partition itself, as
    /// (start_lba, sector_count) pairs already relative to the final image.
    pub appended_partitions: Vec<(u32, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_default_entry_is_rejected() {
        let mut catalog = BootCatalog::default();
        let spec = |default_entry| BootImageSpec {
            platform_id: PlatformId::X86,
            emulation: Emulation::None,
            boot_file_path: "/boot/a".into(),
            load_size_sectors: 4,
            id_string: [0u8; 28],
            selection_criteria: [0u8; 20],
            patch_isolinux: false,
            no_emul_efi: false,
            default_entry,
        };
        catalog.attach(spec(true)).unwrap();
        assert!(catalog.attach(spec(true)).is_err());
        assert!(catalog.attach(spec(false)).is_ok());
    }
}
