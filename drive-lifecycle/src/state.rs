//! The Drive Lifecycle Engine state machine (spec §4.3):
//!
//! ```text
//!   Scanned ──grab──▶ Open(Released) ──probe──▶ Open(Characterized)
//!                           │                         │
//!                           └──release◀───────────────┤
//!                                        │
//!                                        ├──readTOC──▶ Open(KnownMedia)
//!                                        │
//!                                        ├──writeTrack(s)──▶ Writing
//!                                        │                     │
//!                                        │                 SyncCache
//!                                        │                     │
//!                                        └─────────────── Open(KnownMedia')
//! ```
//!
//! Each transition is guarded per spec: `grab` refuses a drive already grabbed by this
//! process; `probe` never refuses the drive outright (only INQUIRY failing entirely does, and
//! that happens inside [`scsi_lib::device::Drive::grab`] itself, before this type exists);
//! `writeTrack` requires [`Stage::KnownMedia`] and a valid NWA.

use std::os::fd::AsRawFd;

use scsi_lib::core::addressing::Lba;
use scsi_lib::core::constants::{DEFAULT_OBS, LONG_OPERATION_TIMEOUT_MS, SECTOR_SIZE};
use scsi_lib::device::{Drive, DriveError};
use scsi_lib::scsi::mmc::commands::close_track_session::CloseTrackSession;
use scsi_lib::scsi::mmc::commands::read_disc_info::{DiscStatus, ReadDiscInformation};
use scsi_lib::scsi::mmc::commands::read_track_info::ReadTrackInfo;
use scsi_lib::scsi::mmc::commands::send_cue_sheet::{CueEntry, SendCueSheet};
use scsi_lib::scsi::mmc::commands::synchronize_cache::SynchronizeCache;
use scsi_lib::scsi::mmc::commands::write::Write10;
use scsi_lib::scsi::spc::{ModeSelect10, WriteOptions, WriteType};
use scsi_lib::scsi::{Control, execute};
use scsi_lib::transport::Adapter;

use crate::wait::{self, WaitError};

/// Where one drive sits in the lifecycle, mirroring spec §4.3's diagram. `Disposed` is not a
/// variant here; disposal consumes the `DriveLifecycle` value instead of leaving it in a
/// terminal state that could be misused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Open but capabilities have not been probed yet.
    Released,
    /// INQUIRY, MODE SENSE 2Ah etc have run; capability bits reflect what was learned.
    Characterized,
    /// READ TOC / READ DISC INFORMATION has run; NWA and session state are current.
    KnownMedia,
    /// A WRITE streaming loop is in progress.
    Writing,
    /// A FAIL occurred while `Writing`; the caller must still call `release` (spec §4.3
    /// "Failure semantics"), but no further writes may be issued.
    NeedsRelease,
}

/// For overwriteable media the engine never issues CLOSE TRACK/SESSION (spec §4.3
/// "Media-type peculiarities"); this is learned from the profile reported by GET CONFIGURATION
/// and carried here rather than re-derived at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    /// CD-R/CD-RW/DVD-R/DVD+R/BD-R sequential: tracks and sessions must be explicitly closed.
    Sequential,
    /// DVD+RW/DVD-RAM/BD-RE/formatted DVD-RW: no CLOSE is issued; the drive just overwrites.
    Overwriteable,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("operation requires stage {required:?}, drive is at {actual:?}")]
    WrongStage { required: &'static str, actual: Stage },
    #[error("no writable NWA known for this drive")]
    NoNwa,
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("READ DISC INFORMATION failed: {0}")]
    ReadDiscInfo(String),
    #[error("READ TRACK INFORMATION failed: {0}")]
    ReadTrackInfo(String),
    #[error("write burst failed: {0}")]
    Write(String),
    #[error("SYNCHRONIZE CACHE failed: {0}")]
    SyncCache(String),
    #[error("CLOSE TRACK/SESSION failed: {0}")]
    Close(String),
    #[error("MODE SELECT page 05h (write parameters) failed: {0}")]
    WriteParameters(String),
}

/// Drives one grabbed [`Drive`] through its lifecycle. Owns the `Drive` value; callers reach
/// the underlying identity/capabilities/media snapshot through [`DriveLifecycle::drive`].
pub struct DriveLifecycle<A: Adapter> {
    adapter: A,
    drive: Drive,
    stage: Stage,
    media_class: MediaClass,
}

impl<A: Adapter> DriveLifecycle<A> {
    /// Grab `devnode` and enter [`Stage::Released`] (spec §4.3 "grab").
    pub fn grab(adapter: A, devnode: &str) -> Result<Self, LifecycleError> {
        let drive = Drive::grab(&adapter, devnode)?;
        Ok(Self { adapter, drive, stage: Stage::Released, media_class: MediaClass::Sequential })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    fn require(&self, stage: Stage, name: &'static str) -> Result<(), LifecycleError> {
        if self.stage != stage {
            return Err(LifecycleError::WrongStage { required: name, actual: self.stage });
        }
        Ok(())
    }

    /// INQUIRY already ran inside `grab`; `probe` additionally reads MODE SENSE page 2Ah and
    /// records capability bits. A failed probe only narrows capabilities (spec §4.3 "probe");
    /// it never refuses the drive or changes `stage` back.
    pub fn probe(&mut self) -> Stage {
        self.drive.probe(&self.adapter);
        self.stage = Stage::Characterized;
        self.stage
    }

    /// READ DISC INFORMATION + READ TRACK INFORMATION (open track), populating
    /// [`scsi_lib::device::MediaState`] and deciding whether the medium needs explicit closing
    /// (spec §4.3 "readTOC").
    pub fn read_toc(&mut self) -> Result<Stage, LifecycleError> {
        self.require(Stage::Characterized, "Characterized")?;

        let fd = self.drive.raw_fd();
        let disc_info = execute(&self.adapter, fd, ReadDiscInformation::new(Control::default()))
            .map_err(|e| LifecycleError::ReadDiscInfo(e.to_string()))?;

        self.drive.media.blank = matches!(disc_info.status, DiscStatus::Empty);
        self.drive.media.appendable = matches!(disc_info.status, DiscStatus::Appendable);
        self.drive.media.current_session = Some(disc_info.number_of_sessions);
        self.media_class = if disc_info.erasable {
            MediaClass::Overwriteable
        } else {
            MediaClass::Sequential
        };

        if self.drive.media.blank || self.drive.media.appendable {
            match execute(&self.adapter, fd, ReadTrackInfo::open_track(Control::default())) {
                Ok(track) if track.nwa_v => {
                    let nwa = Lba::try_from(track.next_writable_addr)
                        .map_err(|_| LifecycleError::ReadTrackInfo("NWA out of range".into()))?;
                    self.drive.media.next_writable_address = Some(nwa);
                    self.drive.media.last_track_end =
                        Lba::try_from(track.logical_track_start_addr + track.logical_track_size as i32)
                            .ok();
                }
                Ok(_) => self.drive.media.next_writable_address = None,
                Err(e) => {
                    // No open track (e.g. brand new blank disc): NWA defaults to 0 and a cue
                    // sheet will be required before the first write.
                    tracing::debug!(target: "chromadisc::cmd_trace", error = %e, "no open track");
                    self.drive.media.next_writable_address = Some(Lba::ZERO);
                }
            }
        }

        self.stage = Stage::KnownMedia;
        Ok(self.stage)
    }

    /// Assemble and stage page 05h (Write Parameters) via MODE SELECT(10) ahead of the first
    /// write of a session (spec §4.2 "Mode pages"): write type follows the media class this
    /// lifecycle already determined from READ DISC INFORMATION, and `leave_open` controls
    /// whether the MULTI-SESSION field permits a later append.
    pub fn stage_write_parameters(&mut self, leave_open: bool) -> Result<(), LifecycleError> {
        self.require(Stage::KnownMedia, "KnownMedia")?;
        let write_type = match self.media_class {
            MediaClass::Sequential => WriteType::TrackAtOnce,
            MediaClass::Overwriteable => WriteType::Packet,
        };
        let page = WriteOptions::iso_session(write_type, leave_open).assemble();
        let cmd = ModeSelect10 { save_pages: false, page_data: page.to_vec(), control: Control::default() };
        execute(&self.adapter, self.drive.raw_fd(), cmd)
            .map_err(|e| LifecycleError::WriteParameters(e.to_string()))?;
        self.drive.mode_page_05_dirty = false;
        Ok(())
    }

    /// Send a one-track cue sheet for the upcoming session (sequential CD media only; spec
    /// §4.3 "Media-type peculiarities").
    pub fn send_cue_sheet(&mut self, track_number: u8) -> Result<(), LifecycleError> {
        self.require(Stage::KnownMedia, "KnownMedia")?;
        if self.media_class != MediaClass::Sequential {
            return Ok(());
        }
        let start = self.drive.media.next_writable_address.ok_or(LifecycleError::NoNwa)?;
        let entries = vec![CueEntry::data_track(track_number, start.raw())];
        execute(&self.adapter, self.drive.raw_fd(), SendCueSheet::new(entries, Control::default()))
            .map_err(|e| LifecycleError::Write(e.to_string()))?;
        Ok(())
    }

    /// Stream `content` starting at the current NWA in bursts of at most
    /// `min(drive buffer / 2, obs)` (spec §4.3 "writeTrack"), padding the final burst with
    /// zeros up to a sector boundary. Returns the number of sectors written.
    ///
    /// A FAIL partway through forces [`Stage::NeedsRelease`] (spec §4.3 "Failure semantics");
    /// the caller remains responsible for calling [`DriveLifecycle::release`].
    pub fn write_track(
        &mut self,
        mut content: impl std::io::Read,
        cancel: &std::sync::atomic::AtomicBool,
    ) -> Result<u64, LifecycleError> {
        self.require(Stage::KnownMedia, "KnownMedia")?;
        self.stage = Stage::Writing;

        let burst_bytes = self
            .drive
            .capabilities
            .page_2a
            .and_then(|p| {
                let half_buf = usize::from(p.buffer_size_supported_kb) * 1024 / 2;
                if half_buf == 0 { None } else { Some(half_buf.min(DEFAULT_OBS)) }
            })
            .unwrap_or(DEFAULT_OBS);
        let sectors_per_burst = (burst_bytes / SECTOR_SIZE as usize).max(1);
        let mut burst = vec![0u8; sectors_per_burst * SECTOR_SIZE as usize];

        let mut lba = self
            .drive
            .media
            .next_writable_address
            .ok_or_else(|| {
                self.stage = Stage::NeedsRelease;
                LifecycleError::NoNwa
            })?
            .raw();
        let mut sectors_written: u64 = 0;

        loop {
            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            let mut filled = 0usize;
            while filled < burst.len() {
                match content.read(&mut burst[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) => {
                        self.stage = Stage::NeedsRelease;
                        return Err(LifecycleError::Write(e.to_string()));
                    }
                }
            }
            if filled == 0 {
                break;
            }

            // Pad the final partial burst with zeros to the next sector boundary.
            let padded_len = filled.div_ceil(SECTOR_SIZE as usize) * SECTOR_SIZE as usize;
            for b in &mut burst[filled..padded_len] {
                *b = 0;
            }

            let cmd = Write10::new(
                lba,
                SECTOR_SIZE as usize,
                burst[..padded_len].to_vec(),
                Control::default(),
            );
            if let Err(e) = execute(&self.adapter, self.drive.raw_fd(), cmd) {
                self.stage = Stage::NeedsRelease;
                return Err(LifecycleError::Write(e.to_string()));
            }

            let sectors_this_burst = (padded_len / SECTOR_SIZE as usize) as i32;
            lba += sectors_this_burst;
            sectors_written += sectors_this_burst as u64;

            if filled < burst.len() {
                break;
            }
        }

        self.drive.media.next_writable_address = Lba::try_from(lba).ok();
        self.stage = Stage::KnownMedia;
        Ok(sectors_written)
    }

    /// CLOSE TRACK/SESSION with Immed=1, then poll TEST UNIT READY (spec §4.3
    /// "closeTrack/closeSession"). No-op on overwriteable media.
    pub fn close_session(&mut self) -> Result<(), LifecycleError> {
        self.require(Stage::KnownMedia, "KnownMedia")?;
        if self.media_class != MediaClass::Sequential {
            return Ok(());
        }
        execute(&self.adapter, self.drive.raw_fd(), CloseTrackSession::session(Control::default()))
            .map_err(|e| LifecycleError::Close(e.to_string()))?;
        // CLOSE TRACK/SESSION's own command timeout (spec §6.4) is also how long we're willing
        // to wait for the drive to report ready afterward.
        let budget = std::time::Duration::from_millis(u64::from(LONG_OPERATION_TIMEOUT_MS));
        wait::wait_for_ready(&self.adapter, self.drive.raw_fd(), budget)?;
        Ok(())
    }

    /// SYNCHRONIZE CACHE, mandatory before release whenever writing occurred (spec §4.3
    /// "syncCache").
    pub fn sync_cache(&mut self) -> Result<(), LifecycleError> {
        execute(&self.adapter, self.drive.raw_fd(), SynchronizeCache::new(false, Control::default()))
            .map_err(|e| LifecycleError::SyncCache(e.to_string()))?;
        Ok(())
    }

    /// Release the drive. Always allowed, including from [`Stage::NeedsRelease`]: the caller
    /// is responsible for calling this even after a write failure (spec §4.3 "Failure
    /// semantics"), and it is the only way out of that stage.
    pub fn release(self) -> Drive {
        self.drive
    }

    /// True once a FAIL during `Writing` has forced the terminal state; the caller must not
    /// attempt further writes, only `release`.
    pub fn needs_release(&self) -> bool {
        self.stage == Stage::NeedsRelease
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scsi_lib::transport::dummy::DummyAdapter;

    #[test]
    fn grab_starts_at_released() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; 4096]).unwrap();
        let adapter = DummyAdapter::default();
        let lifecycle = DriveLifecycle::grab(adapter, tmp.path().to_str().unwrap());
        // DummyAdapter refuses real INQUIRY CDBs against an arbitrary file by design; this
        // test only asserts that the type-level flow compiles and a failure surfaces as an
        // error rather than a panic.
        assert!(lifecycle.is_err() || lifecycle.unwrap().stage() == Stage::Released);
    }
}
