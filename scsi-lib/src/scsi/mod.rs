//! SCSI command assembly layer (spec §4.2): SPC primary commands, SBC block commands, and the
//! MMC multimedia command set optical drives actually speak, all delivered through the
//! [`crate::transport`] Transport Adapter contract.

pub mod mmc;
pub mod sbc;
pub mod sense_codes;
pub mod spc;

use std::any;
use std::os::fd::RawFd;

use derive_more::{Debug, From, Into};
use thiserror::Error;

use crate::transport::{Adapter, Category, CommandRequest, TransportError, retry, run_with_retry};

pub use crate::transport::Direction;

#[derive(Debug, Error)]
pub enum ExecuteError<Cmd: Command<N>, const N: usize> {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("command ended in CHECK CONDITION, sense {sense:02x?}")]
    Failed { sense: Vec<u8> },
    #[error("medium not present")]
    MediumNotPresent,
    #[error("failed to parse the response from the command")]
    ParseError(#[source] <Cmd::Response as TryFrom<Vec<u8>>>::Error),
}

/// One SPC/SBC/MMC command: how to build its CDB, how big a response buffer it needs, and how
/// to parse that buffer back into a typed response.
pub trait Command<const CDB_LEN: usize>: Sized {
    /// OPERATION CODE for this command.
    /// ```text
    ///   7   6   5   4   3   2   1   0
    /// +---+---+---+---+---+---+---+---+
    /// | GROUPCODE |    COMMAND CODE   |
    /// +---+---+---+---+---+---+---+---+
    /// ```
    /// See: [SAM-6]
    const OP_CODE: u8;

    type Response: TryFrom<Vec<u8>>;

    fn as_cdb(&self) -> [u8; CDB_LEN];

    fn allocation_len(&self) -> usize;

    /// Direction of the data phase; most commands here read a response (`FromDevice`).
    fn direction(&self) -> Direction {
        Direction::FromDevice
    }

    fn timeout_ms(&self) -> u32 {
        crate::core::constants::DEFAULT_TIMEOUT_MS
    }

    /// Backoff policy applied when the transport reports a retryable CHECK CONDITION.
    fn backoff(&self) -> retry::Backoff {
        retry::Backoff::POLLING
    }

    /// Bytes to send for a `ToDevice` data phase (MODE SELECT, WRITE, SEND CUE SHEET, ...).
    /// Ignored for `None`/`FromDevice` commands.
    fn write_payload(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Issue one command against an already-open drive handle, retrying transient CHECK CONDITIONs
/// and parsing the response on success.
pub fn execute<A: Adapter, Cmd: Command<CDB_LEN>, const CDB_LEN: usize>(
    adapter: &A,
    fd: RawFd,
    cmd: Cmd,
) -> Result<Cmd::Response, ExecuteError<Cmd, CDB_LEN>> {
    let cdb = cmd.as_cdb();
    let direction = cmd.direction();
    let timeout_ms = cmd.timeout_ms();
    let mut data = match direction {
        Direction::ToDevice => cmd.write_payload().unwrap_or_default(),
        Direction::None | Direction::FromDevice => vec![0u8; cmd.allocation_len()],
    };
    let transfer_len = data.len();

    let (outcome, category) = run_with_retry(
        adapter,
        fd,
        any::type_name::<Cmd>(),
        || CommandRequest {
            cdb: &cdb,
            direction,
            data: &mut data,
            transfer_len,
            timeout_ms,
            sense_len: 32,
        },
        cmd.backoff(),
    )?;

    match category {
        Category::GoOn => {
            <Cmd::Response as TryFrom<Vec<u8>>>::try_from(outcome.data).map_err(ExecuteError::ParseError)
        }
        Category::MediumNotPresent => Err(ExecuteError::MediumNotPresent),
        // Retry only reaches here once the command's timeout budget has elapsed, so by this
        // point it is a failure just as much as `Fail` is.
        Category::Retry | Category::Fail => Err(ExecuteError::Failed { sense: outcome.sense }),
    }
}

/// CONTROL byte newtype
/// ```text
///   7   6   5   4   3   2   1   0
/// +---+---+---+---+---+---+---+---+
/// |   VS  |  Reserved | N | O | L |
/// +---+---+---+---+---+---+---+---+
/// ```
/// * **VS** - Vendor Specific
/// * **N**  - NACA (Normal Auto Contingent Allegiance)
/// * **O**  - Obsolete
/// * **L**  - Link
///
/// See: [SAM-6]
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, From, Into)]
pub struct Control(u8);
