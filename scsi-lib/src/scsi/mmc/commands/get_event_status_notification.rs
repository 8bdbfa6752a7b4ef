//! GET EVENT STATUS NOTIFICATION: polled (non-interrupt) media/operational-change events.
//! The drive lifecycle engine uses the media-status class to notice a tray-open/close or
//! insert/eject without a full READ DISC INFORMATION round trip.

use bitflags::bitflags;
use thiserror::Error;

use crate::scsi::Direction;

use super::{Command, Control};

const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {0} bytes of GET EVENT STATUS NOTIFICATION response, expected at least {min}", min = HEADER_LEN)]
    IncompleteHeader(usize),
}

bitflags! {
    /// Notification class request bitmask (MMC-5 Table 173); only the classes the growth
    /// bridge and drive lifecycle engine act on are named.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventClass: u8 {
        const OPERATIONAL_CHANGE = 1 << 1;
        const MEDIA = 1 << 4;
    }
}

#[derive(Debug)]
pub struct GetEventStatusNotification {
    pub immediate: bool,
    pub classes: EventClass,
    pub allocation_length: u16,
    pub control: Control,
}

impl GetEventStatusNotification {
    pub fn polled(classes: EventClass, control: Control) -> Self {
        Self { immediate: true, classes, allocation_length: 8, control }
    }
}

impl Command<10> for GetEventStatusNotification {
    const OP_CODE: u8 = 0x4A;

    type Response = GetEventStatusNotificationResponse;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[1] = u8::from(self.immediate);
        bytes[4] = self.classes.bits();
        bytes[7..9].copy_from_slice(&self.allocation_length.to_be_bytes());
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.allocation_length.into()
    }

    fn direction(&self) -> Direction {
        Direction::FromDevice
    }
}

#[derive(Debug)]
pub struct GetEventStatusNotificationResponse {
    pub notification_class: u8,
    pub supported_classes: EventClass,
    /// Event descriptor payload (4 bytes for a media event), left undecoded: the caller
    /// already knows which class it asked for.
    pub event_data: Vec<u8>,
}

impl TryFrom<Vec<u8>> for GetEventStatusNotificationResponse {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < HEADER_LEN {
            return Err(Error::IncompleteHeader(value.len()));
        }
        Ok(Self {
            notification_class: value[2] & 0x07,
            supported_classes: EventClass::from_bits_truncate(value[3]),
            event_data: value[HEADER_LEN..].to_vec(),
        })
    }
}
