//! The Transport Adapter (TA) contract: deliver one CDB plus optional data buffer to one
//! drive, wait, and return sense data plus host/driver status. Concrete adapters (Linux `sg`,
//! the `dummy` file-backed adapter) implement this trait; the Command Library (§4.2) is the
//! only consumer and never reaches around it to a specific adapter.

use std::os::fd::RawFd;
use thiserror::Error;

/// Direction of the data-out phase, mirrored from the `sg` ioctl's own vocabulary since every
/// other adapter's direction enum reduces to the same three cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No data phase (e.g. TEST UNIT READY).
    None,
    /// Host to device (e.g. WRITE(10), MODE SELECT).
    ToDevice,
    /// Device to host (e.g. READ(10), INQUIRY).
    FromDevice,
}

/// One command's raw outcome as reported by the transport, before sense decoding.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    /// Bytes actually transferred into/out of the data buffer.
    pub data: Vec<u8>,
    /// Sense buffer as returned by the adapter (may be shorter than requested, or empty when
    /// the command did not end in CHECK CONDITION).
    pub sense: Vec<u8>,
    /// True if the command ended in CHECK CONDITION (non-fatal at the transport layer; the
    /// Command Library classifies the sense bytes to decide severity).
    pub check_condition: bool,
    /// Host adapter status code, adapter-specific.
    pub host_status: u16,
    /// Low-level driver status code, adapter-specific.
    pub driver_status: u16,
    /// Wall-clock duration of the command, as reported by the adapter when available.
    pub duration_ms: u32,
}

/// A transport-level failure distinct from a device sense error: the adapter itself could not
/// deliver the command (bad fd, ioctl rejected, would need privileges it doesn't have, ...).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error issuing command: {0}")]
    Io(#[from] std::io::Error),
    #[error("adapter refused: {0}")]
    Refused(&'static str),
    #[error("sense buffer smaller than required")]
    BufferTooSmall,
}

/// One CDB plus its data-phase parameters, as handed from the Command Library to the adapter.
pub struct CommandRequest<'a> {
    pub cdb: &'a [u8],
    pub direction: Direction,
    /// Buffer to fill (FromDevice) or send (ToDevice). Ignored when `direction` is `None`.
    pub data: &'a mut [u8],
    /// Explicit transfer length, which may be smaller than `data.len()`.
    pub transfer_len: usize,
    pub timeout_ms: u32,
    /// Minimum sense buffer length the caller wants back (at least 32 per spec §4.1).
    pub sense_len: usize,
}

/// The Transport Adapter contract (spec §4.1). Implementations need not converge bit-for-bit
/// on platform peculiarities; they only need to honor this contract.
pub trait Adapter {
    /// A short identifier for diagnostics, e.g. `"linux-sg"` or `"dummy"`.
    fn id_string(&self) -> &'static str;

    /// Acquire whatever process-global resource the adapter needs (e.g. none, for `sg`).
    fn initialize(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Execute one CDB against an already-open device handle.
    fn issue(&self, fd: RawFd, request: CommandRequest<'_>) -> Result<IssueOutcome, TransportError>;
}
