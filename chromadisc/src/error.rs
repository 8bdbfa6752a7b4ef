//! Top-level CLI error: flattens every library error into one enum so `main` can print one
//! message and pick one exit status (spec §7 "the process exit status derives from the highest
//! severity observed").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tree(#[from] iso_tree::TreeError),
    #[error(transparent)]
    GrowthBridge(#[from] growth_bridge::GrowthBridgeError),
    #[error(transparent)]
    Lifecycle(#[from] drive_lifecycle::LifecycleError),
    #[error("`{0}` is not in DISK:IMAGE form")]
    MalformedGraft(String),
    #[error("no optical drive found")]
    NoDriveFound,
}

pub type Result<T> = std::result::Result<T, CliError>;
