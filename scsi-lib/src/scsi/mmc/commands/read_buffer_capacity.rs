//! READ BUFFER CAPACITY: how much of the drive's write buffer is currently free, used
//! alongside page 2Ah's advertised buffer size to size WRITE bursts (spec §4.3 "writeTrack").

use thiserror::Error;

use crate::scsi::Control;

use super::Command;

const RESPONSE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {0} bytes of READ BUFFER CAPACITY response, expected at least {min}", min = RESPONSE_LENGTH)]
    IncompleteResponse(usize),
}

#[derive(Debug)]
pub struct ReadBufferCapacity {
    pub control: Control,
}

impl ReadBufferCapacity {
    pub fn new(control: Control) -> Self {
        Self { control }
    }
}

impl Command<10> for ReadBufferCapacity {
    const OP_CODE: u8 = 0x5C;

    type Response = ReadBufferCapacityResponse;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[7..9].copy_from_slice(&(RESPONSE_LENGTH as u16).to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        RESPONSE_LENGTH
    }
}

#[derive(Debug)]
pub struct ReadBufferCapacityResponse {
    pub total_buffer_bytes: u32,
    pub available_buffer_bytes: u32,
}

impl TryFrom<Vec<u8>> for ReadBufferCapacityResponse {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < RESPONSE_LENGTH {
            return Err(Error::IncompleteResponse(value.len()));
        }
        Ok(Self {
            total_buffer_bytes: u32::from_be_bytes([value[4], value[5], value[6], value[7]]),
            available_buffer_bytes: u32::from_be_bytes([value[8], value[9], value[10], value[11]]),
        })
    }
}
