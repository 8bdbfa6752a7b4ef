//! SBC (block command) subset used by optical drives. MMC-6 defines START STOP UNIT by
//! reference to SBC-3 rather than redefining it, so the command itself lives beside the other
//! MMC commands and this module just gives it its proper family name.

pub use crate::scsi::mmc::commands::start_stop_unit::{Ack, LoadEjectOperation, PowerCondition, StartStopUnit};
