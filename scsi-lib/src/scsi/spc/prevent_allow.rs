//! PREVENT ALLOW MEDIUM REMOVAL: locks/unlocks the tray around a write session so nothing
//! (including the user) can interrupt it halfway.

use crate::scsi::{Command, Control, Direction};

use super::request_sense::Ack;

#[derive(Debug)]
pub struct PreventAllowMediumRemoval {
    pub prevent: bool,
    pub control: Control,
}

impl Command<6> for PreventAllowMediumRemoval {
    const OP_CODE: u8 = 0x1E;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        bytes[0] = Self::OP_CODE;
        bytes[4] = u8::from(self.prevent);
        bytes[5] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> Direction {
        Direction::None
    }
}
