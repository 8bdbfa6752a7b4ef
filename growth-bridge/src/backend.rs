//! The `WriteTarget` contract every Growth Bridge backend implements (spec §4.5).

use std::io::Read;
use std::sync::atomic::AtomicBool;

use scsi_lib::core::addressing::Lba;

#[derive(Debug, thiserror::Error)]
pub enum GrowthBridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("drive backend error: {0}")]
    Drive(String),
    #[error("capacity exceeded: session needs {needed} blocks, only {available} available")]
    CapacityExceeded { needed: u64, available: u64 },
    #[error("no writable NWA known for this target")]
    NoNwa,
    #[error("session write cancelled before completion")]
    Cancelled,
}

/// What a completed (or cancelled) session write produced.
#[derive(Debug, Clone, Copy)]
pub struct SessionWriteReport {
    pub session_start: Lba,
    pub blocks_written: u64,
    pub cancelled: bool,
}

/// One random-access byte space an ISO session can be appended to (spec §4.5): a regular file,
/// a block device, or a real optical drive. Callers of the ISO Tree Engine's session-write
/// operation (spec §4.4.8) depend only on this trait, never on the concrete backend.
pub trait WriteTarget {
    /// The address the next session must start at.
    fn next_writable_address(&self) -> Result<Lba, GrowthBridgeError>;

    /// Total capacity in 2 KiB blocks, when knowable ahead of time (a growing regular file has
    /// none; a block device or optical disc does).
    fn capacity_blocks(&self) -> Option<u64>;

    /// Stream `content` to `next_writable_address()`, advancing it on success. `cancel` is
    /// polled between write bursts (spec §5 "Cancellation"); a cancellation still leaves the
    /// target in a consistent, reopenable state (the backend closes the in-progress track or
    /// truncates to the last complete marker, per its own lifecycle).
    fn write_session(
        &mut self,
        content: &mut dyn Read,
        cancel: &AtomicBool,
    ) -> Result<SessionWriteReport, GrowthBridgeError>;

    /// Finalize after one or more sessions have been written: SYNCHRONIZE CACHE for a drive,
    /// `fsync` for a file. Always safe to call even if nothing was written this run.
    fn finalize(&mut self) -> Result<(), GrowthBridgeError>;
}
