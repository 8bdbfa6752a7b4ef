//! CLOSE TRACK/SESSION: issued with Immed=1 then polled via TEST UNIT READY (spec §4.3
//! "closeTrack/closeSession"). Not issued at all for overwriteable media.

use crate::core::constants::LONG_OPERATION_TIMEOUT_MS;
use crate::scsi::Direction;

use super::{Command, Control};

#[derive(Debug, Clone, Copy)]
pub struct Ack;

impl TryFrom<Vec<u8>> for Ack {
    type Error = std::convert::Infallible;

    fn try_from(_value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Ack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseFunction {
    /// Close the current incomplete (open) track, leaving the session open.
    Track,
    /// Close the current session, writing lead-out if the medium requires it.
    Session,
}

#[derive(Debug)]
pub struct CloseTrackSession {
    pub function: CloseFunction,
    pub track_number: u16,
    pub control: Control,
}

impl CloseTrackSession {
    pub fn track(track_number: u16, control: Control) -> Self {
        Self { function: CloseFunction::Track, track_number, control }
    }

    pub fn session(control: Control) -> Self {
        Self { function: CloseFunction::Session, track_number: 0, control }
    }
}

impl Command<10> for CloseTrackSession {
    const OP_CODE: u8 = 0x5B;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[1] = 0x01; // Immed
        let function_code = match self.function {
            CloseFunction::Track => 0x01,
            CloseFunction::Session => 0x02,
        };
        bytes[2] = function_code;
        bytes[4..6].copy_from_slice(&self.track_number.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> Direction {
        Direction::None
    }

    fn timeout_ms(&self) -> u32 {
        LONG_OPERATION_TIMEOUT_MS
    }
}
