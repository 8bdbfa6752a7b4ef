//! File-backed adapter that always compiles on every host, for tests and for CI that has no
//! optical hardware attached. It never performs real device I/O: it accepts TEST UNIT READY and
//! READ-family requests against whatever file the fd points at, and refuses anything that looks
//! like it would need a real drive.

use std::io::{Read, Seek, SeekFrom};
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::fs::FileExt;

use super::adapter::{Adapter, CommandRequest, Direction, IssueOutcome, TransportError};

/// SPC TEST UNIT READY opcode, the one command the dummy adapter always answers GOOD to.
const TEST_UNIT_READY: u8 = 0x00;
/// MMC READ(10) opcode, serviced by reading straight from the backing file.
const READ_10: u8 = 0x28;

#[derive(Debug, Default, Clone, Copy)]
pub struct DummyAdapter;

impl Adapter for DummyAdapter {
    fn id_string(&self) -> &'static str {
        "dummy"
    }

    fn issue(&self, fd: RawFd, request: CommandRequest<'_>) -> Result<IssueOutcome, TransportError> {
        let opcode = request.cdb.first().copied().unwrap_or(0xFF);

        match opcode {
            TEST_UNIT_READY => Ok(IssueOutcome {
                data: Vec::new(),
                sense: Vec::new(),
                check_condition: false,
                host_status: 0,
                driver_status: 0,
                duration_ms: 0,
            }),

            READ_10 if request.direction == Direction::FromDevice => {
                let lba = u32::from_be_bytes([request.cdb[2], request.cdb[3], request.cdb[4], request.cdb[5]]);
                let file = unsafe { std::fs::File::from_raw_fd(fd) };
                let offset = u64::from(lba) * u64::from(crate::core::constants::SECTOR_SIZE);
                let mut buf = vec![0u8; request.transfer_len];
                let result = file.read_exact_at(&mut buf, offset);
                // Avoid closing the caller's fd when this borrowed File is dropped.
                std::mem::forget(file);
                result.map_err(TransportError::Io)?;
                Ok(IssueOutcome {
                    data: buf,
                    sense: Vec::new(),
                    check_condition: false,
                    host_status: 0,
                    driver_status: 0,
                    duration_ms: 0,
                })
            }

            _ => Err(TransportError::Refused(
                "dummy adapter only answers TEST UNIT READY and READ(10)",
            )),
        }
    }
}

/// Helper used by tests to seek a dummy-backed file to where the next write should land, mirroring
/// how the growth bridge tracks NWA for the real drive back-end.
pub fn read_all_at(fd: RawFd, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    let result = file.read_exact(&mut buf);
    std::mem::forget(file);
    result?;
    Ok(buf)
}
