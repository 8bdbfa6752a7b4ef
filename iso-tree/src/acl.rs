//! POSIX ACL carriage (spec §4.4.6): access and default ACLs stored textually in the AAIP
//! dictionary (`isofs.aa` / `isofs.da`), with `st_mode` group bits reinterpreted as the ACL
//! mask entry whenever an ACL is present.

use crate::aaip::{AttributeDictionary, TAG_ACL_ACCESS, TAG_ACL_DEFAULT};
use crate::node::Mode;

/// One ACL in POSIX short text form (`user::rwx,group::r-x,other::r--,...`), stored verbatim;
/// the engine does not parse entries beyond finding `group::` to reconcile with `st_mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclText(pub String);

impl AclText {
    /// The `group::` entry's permission triplet, if present.
    fn group_perm(&self) -> Option<&str> {
        self.0.split(',').find_map(|entry| entry.trim().strip_prefix("group::"))
    }
}

pub fn set_access_acl(attrs: &mut AttributeDictionary, mode: &mut Mode, acl: AclText) {
    if let Some(perm) = acl.group_perm() {
        mode.set_group_rwx_from_text(perm);
    }
    attrs.set_reserved(TAG_ACL_ACCESS, acl.0.into_bytes());
}

pub fn set_default_acl(attrs: &mut AttributeDictionary, acl: AclText) {
    attrs.set_reserved(TAG_ACL_DEFAULT, acl.0.into_bytes());
}

pub fn access_acl(attrs: &AttributeDictionary) -> Option<AclText> {
    attrs.get(TAG_ACL_ACCESS).map(|b| AclText(String::from_utf8_lossy(b).into_owned()))
}

pub fn default_acl(attrs: &AttributeDictionary) -> Option<AclText> {
    attrs.get(TAG_ACL_DEFAULT).map(|b| AclText(String::from_utf8_lossy(b).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_acl_with_differing_group_adjusts_mode() {
        let mut attrs = AttributeDictionary::new();
        let mut mode = Mode::new(0o644);
        set_access_acl(
            &mut attrs,
            &mut mode,
            AclText("user::rwx,group::rwx,other::r--".into()),
        );
        assert_eq!(mode.permission_bits() & 0o070, 0o070);
    }
}
