//! SET CD SPEED: request a read/write speed in kB/s ahead of a burn; `0xFFFF` means "as fast as
//! the drive likes" (spec §3.1 min/max/current write speed).

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

pub const SPEED_MAX: u16 = 0xFFFF;

#[derive(Debug)]
pub struct SetCdSpeed {
    pub read_speed_kbps: u16,
    pub write_speed_kbps: u16,
    pub control: Control,
}

impl SetCdSpeed {
    pub fn max(control: Control) -> Self {
        Self { read_speed_kbps: SPEED_MAX, write_speed_kbps: SPEED_MAX, control }
    }

    pub fn write_speed(write_speed_kbps: u16, control: Control) -> Self {
        Self { read_speed_kbps: SPEED_MAX, write_speed_kbps, control }
    }
}

impl Command<12> for SetCdSpeed {
    const OP_CODE: u8 = 0xBB;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = Self::OP_CODE;
        bytes[2..4].copy_from_slice(&self.read_speed_kbps.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.write_speed_kbps.to_be_bytes());
        bytes[11] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> Direction {
        Direction::None
    }
}
