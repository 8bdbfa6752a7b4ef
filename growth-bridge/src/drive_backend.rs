//! Drive back-end (spec §4.5 "Drive back-end"): the target is a DLE-managed optical drive. NWA
//! comes from the last READ TRACK INFORMATION the lifecycle engine ran; writes stream through
//! [`DriveLifecycle::write_track`].

use std::io::Read;
use std::sync::atomic::AtomicBool;

use drive_lifecycle::{DriveLifecycle, Stage};
use scsi_lib::core::addressing::Lba;
use scsi_lib::transport::Adapter;

use crate::backend::{GrowthBridgeError, SessionWriteReport, WriteTarget};

pub struct DriveBackend<A: Adapter> {
    lifecycle: DriveLifecycle<A>,
    track_number: u8,
}

impl<A: Adapter> DriveBackend<A> {
    /// Wrap an already-`read_toc`'d lifecycle. The caller drives `grab`/`probe`/`read_toc`
    /// itself (spec §4.3) since those steps may need interactive retry/progress reporting the
    /// growth bridge has no opinion about.
    pub fn new(lifecycle: DriveLifecycle<A>, track_number: u8) -> Self {
        Self { lifecycle, track_number }
    }

    pub fn into_lifecycle(self) -> DriveLifecycle<A> {
        self.lifecycle
    }
}

impl<A: Adapter> WriteTarget for DriveBackend<A> {
    fn next_writable_address(&self) -> Result<Lba, GrowthBridgeError> {
        self.lifecycle.drive().media.next_writable_address.ok_or(GrowthBridgeError::NoNwa)
    }

    fn capacity_blocks(&self) -> Option<u64> {
        // MMC capacity reporting (READ CAPACITY / READ FORMAT CAPACITIES) is a session-scoped
        // concept for optical media and is deliberately left to callers that actually issued the
        // command; the bridge itself only ever needs the running NWA to decide whether a single
        // session fits, which `write_session`'s caller checks against what it already knows.
        None
    }

    fn write_session(
        &mut self,
        content: &mut dyn Read,
        cancel: &AtomicBool,
    ) -> Result<SessionWriteReport, GrowthBridgeError> {
        if self.lifecycle.stage() != Stage::KnownMedia {
            return Err(GrowthBridgeError::Drive(format!(
                "drive backend requires Stage::KnownMedia, got {:?}",
                self.lifecycle.stage()
            )));
        }

        let session_start = self.next_writable_address()?;
        self.lifecycle
            .stage_write_parameters(true)
            .map_err(|e| GrowthBridgeError::Drive(e.to_string()))?;
        self.lifecycle
            .send_cue_sheet(self.track_number)
            .map_err(|e| GrowthBridgeError::Drive(e.to_string()))?;

        let sectors_written = self
            .lifecycle
            .write_track(content, cancel)
            .map_err(|e| GrowthBridgeError::Drive(e.to_string()))?;
        let cancelled = cancel.load(std::sync::atomic::Ordering::Relaxed);

        if self.lifecycle.needs_release() {
            return Err(GrowthBridgeError::Drive(
                "write failed partway through; drive needs release without further writes".into(),
            ));
        }

        self.lifecycle.close_session().map_err(|e| GrowthBridgeError::Drive(e.to_string()))?;

        Ok(SessionWriteReport { session_start, blocks_written: sectors_written, cancelled })
    }

    fn finalize(&mut self) -> Result<(), GrowthBridgeError> {
        self.lifecycle.sync_cache().map_err(|e| GrowthBridgeError::Drive(e.to_string()))
    }
}
