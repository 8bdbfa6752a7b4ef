//! MMC-6 command set: commands specific to CD/DVD/BD drives, layered on the generic
//! [`crate::scsi`] command trait.

pub mod blank;
pub mod close_track_session;
pub mod format_unit;
pub mod get_configuration;
pub mod get_event_status_notification;
pub mod get_performance;
pub mod inquiry;
pub mod read10_12;
pub mod read_buffer_capacity;
pub mod read_capacity;
pub mod read_cd;
pub mod read_disc_info;
pub mod read_disc_structure;
pub mod read_track_info;
pub mod reserve_track;
pub mod send_cue_sheet;
pub mod send_opc_information;
pub mod set_cd_speed;
pub mod set_streaming;
pub mod start_stop_unit;
pub mod synchronize_cache;
pub mod toc;
pub mod write;

pub use crate::scsi::{Command, Control, ExecuteError, execute};
