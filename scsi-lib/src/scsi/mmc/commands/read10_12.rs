//! READ(10) / READ(12): plain data-sector reads, distinct from READ CD (which additionally
//! selects sub-channel/header fields). Used by the growth bridge to read back previously
//! written sessions and by the ISO tree engine's "image" leaf streams.

use super::{Command, Control};

/// READ(10): up to 0xFFFF blocks per call.
#[derive(Debug)]
pub struct Read10 {
    pub lba: i32,
    pub transfer_blocks: u16,
    pub block_size: usize,
    pub control: Control,
}

impl Read10 {
    pub fn new(lba: i32, transfer_blocks: u16, block_size: usize, control: Control) -> Self {
        Self { lba, transfer_blocks, block_size, control }
    }
}

impl Command<10> for Read10 {
    const OP_CODE: u8 = 0x28;

    type Response = ReadData;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[2..6].copy_from_slice(&self.lba.to_be_bytes());
        bytes[7..9].copy_from_slice(&self.transfer_blocks.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        usize::from(self.transfer_blocks) * self.block_size
    }
}

/// READ(12): same semantics with a 32-bit transfer-length field, for bursts that could exceed
/// 0xFFFF blocks.
#[derive(Debug)]
pub struct Read12 {
    pub lba: i32,
    pub transfer_blocks: u32,
    pub block_size: usize,
    pub control: Control,
}

impl Read12 {
    pub fn new(lba: i32, transfer_blocks: u32, block_size: usize, control: Control) -> Self {
        Self { lba, transfer_blocks, block_size, control }
    }
}

impl Command<12> for Read12 {
    const OP_CODE: u8 = 0xA8;

    type Response = ReadData;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = Self::OP_CODE;
        bytes[2..6].copy_from_slice(&self.lba.to_be_bytes());
        bytes[6..10].copy_from_slice(&self.transfer_blocks.to_be_bytes());
        bytes[11] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.transfer_blocks as usize * self.block_size
    }
}

/// Raw sector payload; the caller already knows the block size it asked for.
#[derive(Debug)]
pub struct ReadData(pub Vec<u8>);

impl TryFrom<Vec<u8>> for ReadData {
    type Error = std::convert::Infallible;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(ReadData(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read10_cdb_carries_lba_and_block_count() {
        let cmd = Read10::new(42, 4, 2048, Control::default());
        let cdb = cmd.as_cdb();
        assert_eq!(cdb[0], 0x28);
        assert_eq!(i32::from_be_bytes(cdb[2..6].try_into().unwrap()), 42);
        assert_eq!(u16::from_be_bytes(cdb[7..9].try_into().unwrap()), 4);
        assert_eq!(cmd.allocation_len(), 4 * 2048);
    }

    #[test]
    fn read12_cdb_carries_32_bit_block_count() {
        let cmd = Read12::new(0, 70_000, 2048, Control::default());
        let cdb = cmd.as_cdb();
        assert_eq!(cdb[0], 0xA8);
        assert_eq!(u32::from_be_bytes(cdb[6..10].try_into().unwrap()), 70_000);
    }
}
