//! Error taxonomy for the ISO Tree Engine (spec §7: logical/programmer errors surface as a
//! `FAILURE` event and a negative result; this crate expresses that as `Result<_, TreeError>`
//! rather than a raw integer).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("path `{0}` escapes the image root")]
    PathEscapesRoot(String),
    #[error("path component `{0}` is not valid UTF-8 / contains a `/`")]
    InvalidComponent(String),
    #[error("name `{0}` exceeds {1} bytes after translation")]
    NameTooLong(String, usize),
    #[error("no node at `{0}`")]
    NotFound(String),
    #[error("`{0}` already exists")]
    AlreadyExists(String),
    #[error("`{0}` is not a directory")]
    NotADirectory(String),
    #[error("`{0}` is a directory")]
    IsADirectory(String),
    #[error("refusing to overwrite `{0}` (policy `never`)")]
    OverwriteRefused(String),
    #[error("symlink loop detected while resolving `{0}`")]
    SymlinkLoop(String),
    #[error("disk source error: {0}")]
    Disk(#[from] std::io::Error),
    #[error("attribute name `{0}` is reserved for engine use")]
    ReservedAttributeName(String),
    #[error("extended attribute total size {0} exceeds the ISO ER budget of {1}")]
    AttributeBudgetExceeded(usize, usize),
    #[error("at most one El Torito default entry is permitted per catalog")]
    MultipleDefaultBootEntries,
    #[error("boot image `{0}` is not reachable in the tree")]
    BootImageUnreachable(String),
    #[error("external filter refused: {0}")]
    FilterRefused(&'static str),
    #[error("filter process error: {0}")]
    FilterIo(std::io::Error),
    #[error("duplicate filename `{0}` within one directory")]
    DuplicateFilename(String),
    #[error("session write failed: {0}")]
    Write(String),
    #[error("path `{0}` exceeds the active ISO 9660 depth/length limits")]
    PathTooDeep(String),
    #[error("malformed image: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
