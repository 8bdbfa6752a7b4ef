//! READ DISC INFORMATION: overall disc/session state (blank / appendable / full / empty,
//! session and track counts) the drive lifecycle engine consults on `readTOC` before deciding
//! whether closing operations are needed.

use thiserror::Error;

use crate::scsi::Control;

use super::Command;

const MIN_RESPONSE_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {0} bytes of READ DISC INFORMATION response, expected at least {min}", min = MIN_RESPONSE_LEN)]
    IncompleteResponse(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscStatus {
    Empty,
    Appendable,
    Complete,
    /// Reserved value some drives still report; treated the same as `Complete` by callers.
    Other(u8),
}

#[derive(Debug)]
pub struct ReadDiscInformation {
    pub allocation_length: u16,
    pub control: Control,
}

impl ReadDiscInformation {
    pub fn new(control: Control) -> Self {
        Self { allocation_length: MIN_RESPONSE_LEN as u16, control }
    }
}

impl Command<10> for ReadDiscInformation {
    const OP_CODE: u8 = 0x51;

    type Response = ReadDiscInformationResponse;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[7..9].copy_from_slice(&self.allocation_length.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.allocation_length.into()
    }
}

#[derive(Debug)]
pub struct ReadDiscInformationResponse {
    pub status: DiscStatus,
    pub erasable: bool,
    pub first_track_number: u8,
    pub number_of_sessions: u16,
    pub first_track_in_last_session: u16,
    pub last_track_in_last_session: u16,
    pub last_session_lead_in_start: i32,
    pub last_possible_lead_out_start: i32,
    pub disc_id: u32,
}

impl TryFrom<Vec<u8>> for ReadDiscInformationResponse {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < MIN_RESPONSE_LEN {
            return Err(Error::IncompleteResponse(value.len()));
        }

        let status = match value[2] & 0b11 {
            0b00 => DiscStatus::Empty,
            0b01 => DiscStatus::Appendable,
            0b10 => DiscStatus::Complete,
            other => DiscStatus::Other(other),
        };
        let erasable = value[2] & 0b1000_0000 != 0;

        Ok(Self {
            status,
            erasable,
            first_track_number: value[3],
            number_of_sessions: u16::from_be_bytes([value[9], value[4]]),
            first_track_in_last_session: u16::from_be_bytes([value[10], value[5]]),
            last_track_in_last_session: u16::from_be_bytes([value[11], value[6]]),
            last_session_lead_in_start: i32::from_be_bytes([
                value[17], value[18], value[19], value[20],
            ]),
            last_possible_lead_out_start: i32::from_be_bytes([
                value[21], value[22], value[23], value[24],
            ]),
            disc_id: u32::from_be_bytes([value[24], value[25], value[26], value[27]]),
        })
    }
}
