//! Device enumeration and the in-memory `Drive` model (spec §3.1): identity, status,
//! capabilities and media state for one grabbed optical drive.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::{fs, thread};

use array_concat::*;
use const_format::concatcp;
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use seq_macro::seq;
use thiserror::Error;

use crate::core::addressing::Lba;
use crate::scsi::mmc::commands::inquiry::{Inquiry, InquiryResponse};
use crate::scsi::mmc::types::spc;
use crate::scsi::spc::mode_pages::{ModeSense10, Page2a};
use crate::scsi::{Control, ExecuteError, execute};
use crate::transport::Adapter;

macro_rules! device_files {
    ($prefix:expr, $($range:tt)+) => {{
        const P: &str = $prefix;
        seq!(N in $($range)+ {
            [
                #(concatcp!(P, N), )*
            ]
        })
    }};
}

const NAMED_DEVICES: [&str; 2] = ["/dev/cdrom", "/dev/dvd"];
const HD_DEVICES: [&str; 26] = device_files!("/dev/hd", 'a'..='z');
const SCD_DEVICES: [&str; 28] = device_files!("/dev/scd", 0u8..=27u8);
const SR_DEVICES: [&str; 28] = device_files!("/dev/sr", 0u8..=27u8);

/// Candidate device node names probed when no explicit devnode is given, cheapest (named
/// symlinks) first.
pub const DEVICES: [&str; concat_arrays_size!(NAMED_DEVICES, HD_DEVICES, SCD_DEVICES, SR_DEVICES)] =
    concat_arrays!(NAMED_DEVICES, HD_DEVICES, SCD_DEVICES, SR_DEVICES);

#[derive(Debug, Error)]
pub enum DriveError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("INQUIRY failed: {0}")]
    Inquiry(#[from] ExecuteError<Inquiry, 6>),
}

pub fn get_file_descriptor(device: &str) -> io::Result<OwnedFd> {
    Ok(open(
        device,
        OFlag::O_RDONLY | OFlag::O_NONBLOCK,
        Mode::empty(),
    )?)
}

/// Walk `/sys/class/block` for nodes whose `device/type` marks them as optical (SCSI peripheral
/// type 5), independent of which of [`DEVICES`]' static names happen to exist on this host.
pub fn scan_sysfs() -> io::Result<Vec<String>> {
    const OPTICAL_DEVICE_TYPE: &str = "5";

    let mut devnodes = Vec::new();
    let base = Path::new("/sys/class/block");

    for entry in fs::read_dir(base)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let type_path = entry.path().join("device").join("type");

        let dev_type = match fs::read_to_string(&type_path) {
            Ok(t) => t.trim().to_string(),
            Err(_) => continue,
        };

        if dev_type == OPTICAL_DEVICE_TYPE {
            devnodes.push(format!("/dev/{name}"));
        }
    }

    Ok(devnodes)
}

/// Static identity established once at grab time via INQUIRY; does not change for the lifetime
/// of the handle.
#[derive(Debug, Clone)]
pub struct DriveIdentity {
    pub devnode: String,
    pub removable_medium: bool,
    pub spc_version: spc::Version,
    pub vendor: String,
    pub product_id: String,
    pub revision: String,
}

impl From<(&str, InquiryResponse)> for DriveIdentity {
    fn from((devnode, res): (&str, InquiryResponse)) -> Self {
        Self {
            devnode: devnode.to_string(),
            removable_medium: res.removable_media,
            spc_version: res.version,
            vendor: res.t10_vendor_identification,
            product_id: res.product_identification,
            revision: res.product_revision_level,
        }
    }
}

/// Mutable lifecycle flags the Drive Lifecycle Engine flips as it drives one grabbed device
/// through scan/grab/probe/write/release (spec §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveStatus {
    pub busy: bool,
    pub cancel_requested: bool,
    pub released_for_burn: bool,
    pub needs_release: bool,
}

/// What a MODE SENSE page 2Ah probe found the drive capable of; `None` until `probe()` runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveCapabilities {
    pub page_2a: Option<Page2a>,
}

/// Current-medium state as last observed by READ TRACK INFORMATION / READ DISC INFORMATION;
/// populated and kept current by the drive lifecycle engine, not by this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaState {
    pub blank: bool,
    pub appendable: bool,
    pub current_session: Option<u16>,
    pub next_writable_address: Option<Lba>,
    pub last_track_end: Option<Lba>,
}

/// One grabbed optical drive: an open handle plus everything the higher layers have learned
/// about it so far.
#[derive(Debug)]
pub struct Drive {
    pub fd: OwnedFd,
    pub identity: DriveIdentity,
    pub status: DriveStatus,
    pub capabilities: DriveCapabilities,
    pub media: MediaState,
    /// Set once a MODE SELECT page 05h has been staged but not yet confirmed written.
    pub mode_page_05_dirty: bool,
}

impl Drive {
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Open `devnode` and issue INQUIRY to establish identity (spec §4.3 "grab").
    pub fn grab<A: Adapter>(adapter: &A, devnode: &str) -> Result<Self, DriveError> {
        let fd = get_file_descriptor(devnode)?;
        let inquiry = Inquiry::standard(Control::default());
        let response = execute(adapter, fd.as_raw_fd(), inquiry)?;

        Ok(Self {
            identity: DriveIdentity::from((devnode, response)),
            status: DriveStatus::default(),
            capabilities: DriveCapabilities::default(),
            media: MediaState::default(),
            mode_page_05_dirty: false,
            fd,
        })
    }

    /// Issue MODE SENSE page 2Ah and record what this drive claims to support (spec §4.3
    /// "probe"). A failed or truncated page is recorded as `None` rather than propagated, since
    /// probe failures only narrow capability bits rather than aborting the lifecycle.
    pub fn probe<A: Adapter>(&mut self, adapter: &A) {
        let cmd = ModeSense10::page_2a(Control::default());
        match execute(adapter, self.raw_fd(), cmd) {
            Ok(response) => {
                self.capabilities.page_2a = Page2a::parse(response.page_data());
            }
            Err(err) => {
                tracing::debug!(target: "chromadisc::cmd_trace", error = %err, "page 2Ah probe failed");
                self.capabilities.page_2a = None;
            }
        }
    }
}

/// Enumerate every optical drive visible via sysfs and grab each one (spec §4.3 "scan").
/// Drives that fail INQUIRY are skipped rather than aborting the whole scan.
pub fn get_devices<A: Adapter>(adapter: &A) -> Vec<Drive> {
    scan_sysfs()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|devnode| match Drive::grab(adapter, &devnode) {
            Ok(drive) => Some(drive),
            Err(err) => {
                tracing::warn!(target: "chromadisc::cmd_trace", %devnode, error = %err, "skipping device");
                None
            }
        })
        .collect()
}

/// Briefly yield so a just-issued START STOP UNIT load has a chance to begin before the first
/// TEST UNIT READY poll; a real wait-for-ready loop lives in the drive lifecycle engine.
pub fn settle() {
    thread::yield_now();
}
