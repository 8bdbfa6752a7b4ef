//! SCSI/MMC transport and command library.
//!
//! Layers, bottom up: [`core`] addressing and constants shared by everything
//! above; [`transport`] which delivers one CDB to one drive and classifies
//! the outcome; [`scsi`] which assembles SPC/SBC/MMC command descriptor
//! blocks on top of the transport; [`device`] which enumerates and opens
//! optical drives.

pub mod core;
pub mod device;
pub mod scsi;
pub mod transport;
