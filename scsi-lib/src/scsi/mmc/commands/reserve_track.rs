//! RESERVE TRACK: pre-allocate a fixed-size track on sequential media before streaming WRITE
//! bursts into it, so the eventual CLOSE TRACK/SESSION doesn't need to guess the final extent.

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

#[derive(Debug)]
pub struct ReserveTrack {
    pub reservation_size_blocks: u32,
    pub control: Control,
}

impl ReserveTrack {
    pub fn new(reservation_size_blocks: u32, control: Control) -> Self {
        Self { reservation_size_blocks, control }
    }
}

impl Command<10> for ReserveTrack {
    const OP_CODE: u8 = 0x53;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[5..9].copy_from_slice(&self.reservation_size_blocks.to_be_bytes());
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
