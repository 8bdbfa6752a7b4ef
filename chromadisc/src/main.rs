//! `chromadisc`: thin CLI glue wiring the Transport Adapter, Command Library, Drive Lifecycle
//! Engine, ISO Tree Engine and Growth Bridge into four subcommands (spec §1 "Out of scope":
//! argument parsing and dispatch carry no algorithmic depth of their own here).

mod cli;
mod commands;
mod error;
mod signal;

use clap::Parser;

use cli::{Cli, Command};
use error::Result;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("CHROMADISC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Mkiso(args) => commands::mkiso::run(args),
        Command::Extract(args) => commands::extract::run(args),
        Command::Info(args) => commands::info::run(args, cli.device),
        Command::Burn(args) => commands::burn::run(args, cli.device),
    }
}

fn main() {
    init_tracing();
    signal::install();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("chromadisc: error: {err}");
        std::process::exit(1);
    }
}
