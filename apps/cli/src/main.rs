//! herdbook CLI: query a livestock registry extract from the terminal.
//!
//! Loads the registry archives and reference tables on every invocation
//! and answers one query, or a stream of JSON-lines queries in batch mode.

mod commands;
mod present;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
