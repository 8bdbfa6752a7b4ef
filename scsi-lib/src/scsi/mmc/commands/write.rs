//! WRITE(10) / WRITE(12): stream one burst of already-formatted sector data to the drive
//! (spec §4.2, §4.3 "writeTrack"). Retries on these use [`crate::transport::retry::Backoff::WRITE`]
//! rather than the polling schedule, since a streaming write cannot afford a 100ms pause.

use crate::core::constants::LONG_OPERATION_TIMEOUT_MS;
use crate::scsi::{Direction, retry};

use super::{Command, Control};

/// Marker response: WRITE has no data-in phase, only confirmation the burst was accepted.
#[derive(Debug, Clone, Copy)]
pub struct Ack;

impl TryFrom<Vec<u8>> for Ack {
    type Error = std::convert::Infallible;

    fn try_from(_value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Ack)
    }
}

/// WRITE(10): up to 0xFFFF blocks per call, the common case for CD/DVD bursts sized by
/// [`crate::core::constants::DEFAULT_OBS`] / [`crate::core::constants::LARGE_OBS`].
#[derive(Debug)]
pub struct Write10 {
    pub lba: i32,
    pub transfer_blocks: u16,
    pub block_size: usize,
    pub payload: Vec<u8>,
    pub control: Control,
}

impl Write10 {
    pub fn new(lba: i32, block_size: usize, payload: Vec<u8>, control: Control) -> Self {
        let transfer_blocks = (payload.len() / block_size) as u16;
        Self { lba, transfer_blocks, block_size, payload, control }
    }
}

impl Command<10> for Write10 {
    const OP_CODE: u8 = 0x2A;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[2..6].copy_from_slice(&self.lba.to_be_bytes());
        bytes[7..9].copy_from_slice(&self.transfer_blocks.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.payload.len()
    }

    fn direction(&self) -> Direction {
        Direction::ToDevice
    }

    fn write_payload(&self) -> Option<Vec<u8>> {
        Some(self.payload.clone())
    }

    fn timeout_ms(&self) -> u32 {
        LONG_OPERATION_TIMEOUT_MS
    }

    fn backoff(&self) -> retry::Backoff {
        retry::Backoff::WRITE
    }
}

/// WRITE(12): same semantics as WRITE(10) with a 32-bit transfer-length field, used when a
/// single burst could exceed 0xFFFF blocks (large DVD/BD bursts).
#[derive(Debug)]
pub struct Write12 {
    pub lba: i32,
    pub transfer_blocks: u32,
    pub block_size: usize,
    pub payload: Vec<u8>,
    pub control: Control,
}

impl Write12 {
    pub fn new(lba: i32, block_size: usize, payload: Vec<u8>, control: Control) -> Self {
        let transfer_blocks = (payload.len() / block_size) as u32;
        Self { lba, transfer_blocks, block_size, payload, control }
    }
}

impl Command<12> for Write12 {
    const OP_CODE: u8 = 0xAA;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = Self::OP_CODE;
        bytes[2..6].copy_from_slice(&self.lba.to_be_bytes());
        bytes[6..10].copy_from_slice(&self.transfer_blocks.to_be_bytes());
        bytes[11] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.payload.len()
    }

    fn direction(&self) -> Direction {
        Direction::ToDevice
    }

    fn write_payload(&self) -> Option<Vec<u8>> {
        Some(self.payload.clone())
    }

    fn timeout_ms(&self) -> u32 {
        LONG_OPERATION_TIMEOUT_MS
    }

    fn backoff(&self) -> retry::Backoff {
        retry::Backoff::WRITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write10_cdb_carries_lba_and_block_count() {
        let cmd = Write10::new(100, 2048, vec![0u8; 2048 * 3], Control::default());
        let cdb = cmd.as_cdb();
        assert_eq!(cdb[0], 0x2A);
        assert_eq!(i32::from_be_bytes(cdb[2..6].try_into().unwrap()), 100);
        assert_eq!(u16::from_be_bytes(cdb[7..9].try_into().unwrap()), 3);
    }

    #[test]
    fn write10_uses_write_backoff() {
        let cmd = Write10::new(0, 2048, vec![0u8; 2048], Control::default());
        assert_eq!(cmd.backoff().initial_ms, retry::Backoff::WRITE.initial_ms);
    }
}
