//! ISO Tree Engine (spec §4.4): an in-memory image tree (nodes, attributes, streams) built by
//! grafting disk content or loading an existing image, mutated through path-addressed
//! operations, and rendered to an ISO 9660 (+ Rock Ridge / Joliet / El Torito) session through
//! the Growth Bridge.

pub mod aaip;
pub mod acl;
pub mod boot;
pub mod error;
pub mod extract;
pub mod filter;
pub mod graft;
pub mod hardlink;
pub mod lookup;
pub mod node;
pub mod path;
pub mod read;
pub mod stream;
pub mod volume;
pub mod write;

pub use error::{Result, TreeError};
pub use extract::{restore_to_disk, RestoreOptions};
pub use lookup::resolve;
pub use node::{Node, NodeRef};
pub use read::{read_session_at, read_volume};
pub use volume::Volume;
