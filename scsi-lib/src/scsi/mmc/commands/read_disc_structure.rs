//! READ DISC STRUCTURE: DVD/BD structural data (physical format info, layer boundaries). Used
//! sparingly by the probe step to refine a media profile GET CONFIGURATION reported generically.

use thiserror::Error;

use super::{Command, Control};

const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {0} bytes of READ DISC STRUCTURE response, expected at least {min}", min = HEADER_LEN)]
    IncompleteHeader(usize),
}

/// FORMAT field values this engine actually requests (MMC-5 Table 333).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    PhysicalFormatInformation,
    DiscManufacturingInformation,
}

impl StructureFormat {
    fn code(self) -> u8 {
        match self {
            Self::PhysicalFormatInformation => 0x00,
            Self::DiscManufacturingInformation => 0x01,
        }
    }
}

#[derive(Debug)]
pub struct ReadDiscStructure {
    pub format: StructureFormat,
    pub address: u32,
    pub layer_number: u8,
    pub allocation_length: u16,
    pub control: Control,
}

impl ReadDiscStructure {
    pub fn new(format: StructureFormat, control: Control) -> Self {
        Self { format, address: 0, layer_number: 0, allocation_length: 2048, control }
    }
}

impl Command<12> for ReadDiscStructure {
    const OP_CODE: u8 = 0xAD;

    type Response = ReadDiscStructureResponse;

    fn as_cdb(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = Self::OP_CODE;
        bytes[2..6].copy_from_slice(&self.address.to_be_bytes());
        bytes[6] = self.layer_number;
        bytes[7] = self.format.code();
        bytes[8..10].copy_from_slice(&self.allocation_length.to_be_bytes());
        bytes[11] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.allocation_length.into()
    }
}

#[derive(Debug)]
pub struct ReadDiscStructureResponse {
    pub payload: Vec<u8>,
}

impl TryFrom<Vec<u8>> for ReadDiscStructureResponse {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < HEADER_LEN {
            return Err(Error::IncompleteHeader(value.len()));
        }
        Ok(Self { payload: value[HEADER_LEN..].to_vec() })
    }
}
