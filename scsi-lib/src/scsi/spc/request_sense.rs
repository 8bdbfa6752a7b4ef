//! REQUEST SENSE: pulls deferred sense data explicitly, for adapters/situations where the
//! triggering command's own CHECK CONDITION sense was truncated or auto-cleared.

use crate::scsi::{Command, Control};

/// Marker response for commands with no data-out phase at all.
#[derive(Debug, Clone, Copy)]
pub struct Ack;

impl TryFrom<Vec<u8>> for Ack {
    type Error = std::convert::Infallible;

    fn try_from(_value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Ack)
    }
}

#[derive(Debug)]
pub struct RequestSense {
    pub desc: bool,
    pub allocation_length: u8,
    pub control: Control,
}

impl Default for RequestSense {
    fn default() -> Self {
        Self {
            desc: false,
            allocation_length: 252,
            control: Control::default(),
        }
    }
}

impl Command<6> for RequestSense {
    const OP_CODE: u8 = 0x03;

    type Response = Vec<u8>;

    fn as_cdb(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        bytes[0] = Self::OP_CODE;
        bytes[1] |= u8::from(self.desc);
        bytes[4] = self.allocation_length;
        bytes[5] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.allocation_length.into()
    }
}
