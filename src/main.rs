//! Encore - gapless, crossfading playback for streamed live recordings.
//!
//! The binary is a thin CLI over the library: run `encore simulate` to watch
//! the engine play a generated album on a virtual clock.

use clap::{CommandFactory, Parser};
use encore::cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let filter = match "encore=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    if cli::run_command(&args)? {
        return Ok(());
    }

    // No command specified
    cli::Cli::command().print_help()?;
    println!();
    Ok(())
}
