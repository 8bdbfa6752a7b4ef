//! SET STREAMING: set up a speed performance descriptor for streaming reads/writes over a given
//! LBA range. Used before long sequential burns on drives that default to adaptive speed
//! stepping, so a transient slowdown doesn't interrupt the write stream.

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
pub struct SetStreaming {
    pub starting_lba: u32,
    pub ending_lba: u32,
    pub read_speed_kbps: u32,
    pub write_speed_kbps: u32,
    pub control: Control,
}

impl SetStreaming {
    pub fn whole_disc(write_speed_kbps: u32, control: Control) -> Self {
        Self {
            starting_lba: 0,
            ending_lba: u32::MAX,
            read_speed_kbps: write_speed_kbps,
            write_speed_kbps,
            control,
        }
    }

    fn descriptor(&self) -> [u8; 28] {
        let mut d = [0u8; 28];
        // Performance descriptor block, MMC-5 Table 250: wrc=0 (CAV), rdd=0, exact=0.
        d[8..12].copy_from_slice(&self.starting_lba.to_be_bytes());
        d[12..16].copy_from_slice(&(self.read_speed_kbps * 1000).to_be_bytes());
        d[16..20].copy_from_slice(&self.ending_lba.to_be_bytes());
        d[20..24].copy_from_slice(&(self.write_speed_kbps * 1000).to_be_bytes());
        d
    }
}

impl Command<12> for SetStreaming {
    const OP_CODE: u8 = 0xB6;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        let len = self.descriptor().len() as u16;
        bytes[0] = Self::OP_CODE;
        bytes[9..11].copy_from_slice(&len.to_be_bytes());
        bytes[11] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> Direction {
        Direction::ToDevice
    }

    fn write_payload(&self) -> Option<Vec<u8>> {
        Some(self.descriptor().to_vec())
    }
}
