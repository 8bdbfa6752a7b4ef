//! SEND OPC INFORMATION: run the drive's Optimum Power Calibration for CD-R/DVD-R media before
//! the first write of a session. Most drives run OPC implicitly on the first WRITE; this command
//! lets the caller force it up front so a miscalibration surfaces before real data is committed.

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

#[derive(Debug)]
pub struct SendOpcInformation {
    pub do_opc: bool,
    pub control: Control,
}

impl SendOpcInformation {
    pub fn new(control: Control) -> Self {
        Self { do_opc: true, control }
    }
}

impl Command<10> for SendOpcInformation {
    const OP_CODE: u8 = 0x54;

    type Response = Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[1] = u8::from(self.do_opc);
        bytes[9] = self.control.into();
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
