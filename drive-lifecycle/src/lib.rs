//! Drive Lifecycle Engine (spec §4.3): drives one grabbed optical drive through
//! scan → grab → probe → readTOC → write → syncCache → release → dispose, and owns the failure
//! semantics for each stage.

pub mod state;
pub mod wait;

pub use state::{DriveLifecycle, LifecycleError, Stage};
