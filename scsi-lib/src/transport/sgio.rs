//! Linux `sg` driver adapter: issues one CDB via the `SG_IO` ioctl against `/dev/sg*`,
//! `/dev/sr*` or `/dev/scd*` device nodes.
//!
//! Most of the struct layout below is lifted directly from `linux/include/scsi/sg.h`.

use std::ffi::{c_uchar, c_void};
use std::os::fd::RawFd;
use std::time::Instant;

use nix::ioctl_read_bad;
use thiserror::Error;

use super::adapter::{Adapter, CommandRequest, Direction, IssueOutcome, TransportError};

const SG_IO: u64 = 0x2285;
pub const SG_INFO_CHECK: u32 = 0x1;
pub const SG_INFO_OK_MASK: u32 = 0x1;

#[repr(i32)]
#[derive(Debug, Clone, Copy)]
enum DxferDirection {
    /// No data transfer, e.g. TEST UNIT READY.
    None = -1,
    /// Host to device, e.g. WRITE(10).
    ToDev = -2,
    /// Device to host, e.g. READ(10).
    FromDev = -3,
}

impl From<Direction> for DxferDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::None => DxferDirection::None,
            Direction::ToDevice => DxferDirection::ToDev,
            Direction::FromDevice => DxferDirection::FromDev,
        }
    }
}

#[repr(C)]
struct SgIoHeader {
    interface_id: i32,               /* [i] 'S' for SCSI generic (required) */
    dxfer_direction: DxferDirection, /* [i] data transfer direction */
    cmd_len: u8,                     /* [i] SCSI command length */
    mx_sb_len: u8,                   /* [i] max length to write to sbp */
    iovec_count: u16,                /* [i] 0 implies no scatter gather */
    dxfer_len: u32,                  /* [i] byte count of data transfer */
    dxferp: *mut c_void,             /* [i] data transfer buffer or scatter gather list */
    cmdp: *mut c_uchar,              /* [i] command to perform */
    sbp: *mut c_uchar,               /* [o] sense_buffer memory */
    timeout: u32,                    /* [i] unit: millisec */
    flags: u32,                      /* [i] 0 -> default */
    pack_id: i32,                    /* [i->o] unused internally (normally) */
    usr_ptr: *mut c_void,            /* [i->o] unused internally */
    status: u8,                      /* [o] scsi status */
    masked_status: u8,               /* [o] shifted, masked scsi status */
    msg_status: u8,                  /* [o] messaging level data (optional) */
    sb_len_wr: u8,                   /* [o] byte count actually written to sbp */
    host_status: u16,                /* [o] errors from host adapter */
    driver_status: u16,              /* [o] errors from software driver */
    resid: i32,                      /* [o] dxfer_len - actual_transferred */
    duration: u32,                   /* [o] time taken by cmd (unit: millisec) */
    info: u32,                       /* [o] auxiliary information */
}

ioctl_read_bad!(ioctl_sg_io, SG_IO, SgIoHeader);

#[derive(Debug, Error)]
pub enum SCSIError {
    #[error("SG_IO ioctl failed: {0}")]
    Ioctl(#[from] nix::Error),
}

/// The Linux `sg` driver transport adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSgAdapter;

impl Adapter for LinuxSgAdapter {
    fn id_string(&self) -> &'static str {
        "linux-sg"
    }

    fn issue(&self, fd: RawFd, request: CommandRequest<'_>) -> Result<IssueOutcome, TransportError> {
        if request.sense_len < 32 {
            return Err(TransportError::BufferTooSmall);
        }

        let mut cdb_bytes = request.cdb.to_vec();
        let mut sense = vec![0u8; request.sense_len];
        let started = Instant::now();

        let mut header = SgIoHeader {
            interface_id: b'S' as i32,
            dxfer_direction: DxferDirection::from(request.direction),
            cmd_len: cdb_bytes.len() as u8,
            mx_sb_len: sense.len() as u8,
            iovec_count: 0,
            dxfer_len: request.transfer_len as u32,
            dxferp: request.data.as_mut_ptr() as *mut c_void,
            cmdp: cdb_bytes.as_mut_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: request.timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: std::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        unsafe { ioctl_sg_io(fd, &mut header) }.map_err(SCSIError::from)?;

        let check_condition = header.info & SG_INFO_OK_MASK == SG_INFO_CHECK;
        let transferred = (request.transfer_len as i32 - header.resid).max(0) as usize;

        sense.truncate(header.sb_len_wr as usize);

        Ok(IssueOutcome {
            data: request.data[..transferred.min(request.data.len())].to_vec(),
            sense,
            check_condition,
            host_status: header.host_status,
            driver_status: header.driver_status,
            duration_ms: if header.duration != 0 {
                header.duration
            } else {
                started.elapsed().as_millis() as u32
            },
        })
    }
}
