//! GET PERFORMANCE: per-LBA-range read/write speed descriptors, feeding the drive's
//! min/max/current write speed fields (spec §3.1 "Capabilities").

use thiserror::Error;

use super::{Command, Control};

const HEADER_LEN: usize = 8;
const DESCRIPTOR_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {0} bytes of GET PERFORMANCE response, expected at least {min}", min = HEADER_LEN)]
    IncompleteHeader(usize),
}

#[derive(Debug)]
pub struct GetPerformance {
    pub starting_lba: u32,
    pub max_descriptors: u16,
    pub control: Control,
}

impl GetPerformance {
    pub fn write_speed_descriptors(control: Control) -> Self {
        Self { starting_lba: 0, max_descriptors: 8, control }
    }
}

impl Command<10> for GetPerformance {
    const OP_CODE: u8 = 0xAC;

    type Response = GetPerformanceResponse;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[1] = 0x1C; // TYPE=011b: exceptional/write-speed performance data
        bytes[2..6].copy_from_slice(&self.starting_lba.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.max_descriptors.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        HEADER_LEN + usize::from(self.max_descriptors) * DESCRIPTOR_LEN
    }
}

/// One write-speed descriptor: the LBA range it applies to plus the speed in kB/s.
#[derive(Debug, Clone, Copy)]
pub struct SpeedDescriptor {
    pub start_lba: u32,
    pub end_lba: u32,
    pub speed_kbps: u32,
}

#[derive(Debug)]
pub struct GetPerformanceResponse {
    pub descriptors: Vec<SpeedDescriptor>,
}

impl TryFrom<Vec<u8>> for GetPerformanceResponse {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < HEADER_LEN {
            return Err(Error::IncompleteHeader(value.len()));
        }
        let descriptors = value[HEADER_LEN..]
            .chunks_exact(DESCRIPTOR_LEN)
            .map(|d| SpeedDescriptor {
                start_lba: u32::from_be_bytes([d[0], d[1], d[2], d[3]]),
                end_lba: u32::from_be_bytes([d[4], d[5], d[6], d[7]]),
                speed_kbps: u32::from_be_bytes([d[8], d[9], d[10], d[11]]),
            })
            .collect();
        Ok(Self { descriptors })
    }
}
