//! READ CD(12): bulk sector transfer used to rip/verify audio and data tracks.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

use crate::core::addressing::Lba;
use crate::scsi::Control;

use super::Command;

#[derive(Error, Debug)]
pub enum ReadCdError {
    #[error("Invalid sector type: {_0:03b}")]
    InvalidSectorType(u8),
    #[error("Transfer length exceeded 16,777,215: {0}")]
    InvalidTransferLength(u32),
    #[error("Invalid C2 error code: {_0:02b}")]
    InvalidC2ErrorCode(u8),
    #[error("Invalid sub-channel selection: {_0:03b}")]
    InvalidSubChannelSelection(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[num_enum(error_type(name = ReadCdError, constructor = ReadCdError::InvalidSectorType))]
#[repr(u8)]
pub enum SectorType {
    AllTypes = 0b000,
    CdDa = 0b001,
    Mode1 = 0b010,
    Mode2Formless = 0b011,
    Mode2Form1 = 0b100,
    Mode2Form2 = 0b101,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MainChannelFlags: u8 {
        const SYNC = 1 << 7;
        const SUBHEADER = 1 << 6;
        const HEADER = 1 << 5;
        const USER_DATA = 1 << 4;
        const EDC_ECC = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[num_enum(error_type(name = ReadCdError, constructor = ReadCdError::InvalidC2ErrorCode))]
#[repr(u8)]
pub enum C2ErrorCode {
    None = 0b00,
    /// A bit is associated with each of the 2 352 bytes of main channel where: 0 = No C2 error
    /// and 1 = C2 error. This results in 294 bytes of C2 error bits. Return the 294 bytes of C2
    /// error bits in the data stream.
    ErrorBits = 0b01,
    /// The Block Error Byte = Logical OR of all of the 294 bytes of C2 error bits. First return
    /// Block Error Byte, then a pad byte of zero and finally the 294 bytes of C2 error bits.
    BlockErrorByte = 0b10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[num_enum(error_type(name = ReadCdError, constructor = ReadCdError::InvalidSubChannelSelection))]
#[repr(u8)]
pub enum SubChannelSelection {
    None = 0b000,
    QSubChannel = 0b010,
    RWSubChannel = 0b100,
}

pub const SECTOR_BYTES: usize = 2352;
/// 2352 * 27 ~= 63,531 bytes, a common CD firmware transfer limit.
pub const MAX_SECTORS_PER_COMMAND: u32 = 27;

#[derive(Debug, Clone, Copy)]
pub struct ReadCd {
    pub sector_type: SectorType,
    pub dap: bool,
    pub start: Lba,
    pub transfer_length: u32,
    pub main_channel: MainChannelFlags,
    pub c2_error_info: C2ErrorCode,
    pub sub_channel: SubChannelSelection,
    pub control: Control,
}

impl ReadCd {
    pub fn new(start: Lba, sectors: u32) -> Self {
        Self {
            sector_type: SectorType::CdDa,
            dap: false,
            start,
            transfer_length: sectors,
            main_channel: MainChannelFlags::USER_DATA,
            c2_error_info: C2ErrorCode::None,
            sub_channel: SubChannelSelection::None,
            control: Control::default(),
        }
    }
}

impl Command<12> for ReadCd {
    const OP_CODE: u8 = 0xBE;

    type Response = Vec<u8>;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];

        bytes[0] = Self::OP_CODE;
        bytes[1] = u8::from(self.sector_type) << 2 | (u8::from(self.dap) << 1);
        let start: i32 = self.start.raw();
        bytes[2] = (start >> 24) as u8;
        bytes[3] = (start >> 16) as u8;
        bytes[4] = (start >> 8) as u8;
        bytes[5] = start as u8;
        bytes[6] = (self.transfer_length >> 16) as u8;
        bytes[7] = (self.transfer_length >> 8) as u8;
        bytes[8] = self.transfer_length as u8;
        bytes[9] = self.main_channel.bits() | (u8::from(self.c2_error_info) << 1);
        bytes[10] = u8::from(self.sub_channel);
        bytes[11] = self.control.into();

        bytes
    }

    fn allocation_len(&self) -> usize {
        self.transfer_length as usize * SECTOR_BYTES
    }

    fn timeout_ms(&self) -> u32 {
        crate::core::constants::LONG_OPERATION_TIMEOUT_MS
    }
}
