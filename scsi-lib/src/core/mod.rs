pub mod addressing;
pub mod constants;
pub mod util;
