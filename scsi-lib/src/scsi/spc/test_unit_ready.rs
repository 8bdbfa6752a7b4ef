//! TEST UNIT READY (spec §4.2 polling loop).

use crate::scsi::{Command, Control, Direction};

#[derive(Debug, Default)]
pub struct TestUnitReady {
    pub control: Control,
}

impl Command<6> for TestUnitReady {
    const OP_CODE: u8 = 0x00;

    type Response = super::request_sense::Ack;

    fn as_cdb(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        bytes[0] = Self::OP_CODE;
        bytes[5] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> Direction {
        Direction::None
    }

    /// Single-shot: the Drive Lifecycle Engine's own wait loop (spec §4.2, §6.4) owns the
    /// polling backoff and the overall budget. The default nonzero timeout would make
    /// `execute()` retry internally on every call (under `Backoff::POLLING`, since a retryable
    /// CHECK CONDITION is exactly what a "not ready yet" poll returns), hiding up to
    /// `DEFAULT_TIMEOUT_MS` of retrying inside what the caller expects to be one probe.
    fn timeout_ms(&self) -> u32 {
        0
    }
}
