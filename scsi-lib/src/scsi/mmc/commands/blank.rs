//! BLANK: erase rewritable media, either fully or just enough to make it appendable again.

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

/// BLANK TYPE field (MMC-5 Table 258), the subset actually exercised by the growth bridge and
/// drive lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankKind {
    /// Blank the entire disc.
    Full,
    /// Blank only enough to make the disc appendable (minimal blanking).
    Minimal,
    /// Unclose the last session, turning a closed-but-appendable disc back into one with an
    /// incomplete track.
    UncloseLastSession,
}

#[derive(Debug)]
pub struct Blank {
    pub kind: BlankKind,
    pub immediate: bool,
    pub control: Control,
}

impl Blank {
    pub fn new(kind: BlankKind, immediate: bool, control: Control) -> Self {
        Self { kind, immediate, control }
    }
}

impl Command<12> for Blank {
    const OP_CODE: u8 = 0xA1;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = Self::OP_CODE;
        let blank_type = match self.kind {
            BlankKind::Full => 0x00,
            BlankKind::Minimal => 0x01,
            BlankKind::UncloseLastSession => 0x02,
        };
        bytes[1] = blank_type | (u8::from(self.immediate) << 4);
        bytes[11] = self.control.into();
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
