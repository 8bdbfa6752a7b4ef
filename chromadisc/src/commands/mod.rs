//! One module per subcommand; each takes its parsed `clap` args and the CLI error type is the
//! only thing they have in common with `main`.

pub mod burn;
pub mod extract;
pub mod info;
pub mod mkiso;
