//! SPC (primary command) subset used by the drive lifecycle engine: polling for readiness,
//! decoding deferred sense, staging mode pages, and locking/unlocking the tray.

pub mod mode_pages;
pub mod prevent_allow;
pub mod request_sense;
pub mod test_unit_ready;

pub use mode_pages::{ModeSelect10, ModeSense10, Page2a, WriteOptions, WriteType};
pub use prevent_allow::PreventAllowMediumRemoval;
pub use request_sense::RequestSense;
pub use test_unit_ready::TestUnitReady;
