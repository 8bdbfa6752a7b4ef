//! SYNCHRONIZE CACHE: flush the drive's write buffer. Mandatory before release whenever
//! writing occurred (spec §4.3 "syncCache").

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
pub struct SynchronizeCache {
    pub immediate: bool,
    pub control: Control,
}

impl SynchronizeCache {
    pub fn new(immediate: bool, control: Control) -> Self {
        Self { immediate, control }
    }
}

impl Command<10> for SynchronizeCache {
    const OP_CODE: u8 = 0x35;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[1] |= u8::from(self.immediate) << 1;
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
