//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `simulate`: run the player against simulated handles on a virtual clock
//! - `queue`: inspect the persisted queue
//! - `config`: print (and optionally save) the effective configuration

mod config;
mod queue;
mod simulate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::player::NetworkClass;
use crate::queue::RepeatMode;

pub use config::cmd_config;
pub use queue::{cmd_queue_show, cmd_queue_validate};
pub use simulate::{SimulateOptions, cmd_simulate};

/// Encore playback engine CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config directory)
    #[arg(long, global = true, env = "ENCORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Play a generated album through the crossfade engine on a virtual clock
    Simulate {
        /// Number of tracks in the generated album
        #[arg(short, long, default_value = "4")]
        tracks: usize,
        /// Length of each track in seconds
        #[arg(long, default_value = "30")]
        track_secs: u64,
        /// Crossfade length in seconds (overrides config)
        #[arg(long)]
        crossfade: Option<f32>,
        /// Disable crossfading (gapless cuts)
        #[arg(long)]
        no_crossfade: bool,
        /// Network class: slow-2g, 2g, 3g, 4g, unknown
        #[arg(long, default_value = "4g")]
        network: NetworkClass,
        /// Seconds of audio downloaded per second of playback
        #[arg(long, default_value = "20")]
        download_rate: f64,
        /// Repeat mode
        #[arg(long, value_enum, default_value = "off")]
        repeat: RepeatArg,
        /// Reject every play() as if blocked by autoplay policy
        #[arg(long)]
        autoplay_blocked: bool,
        /// Stop the simulation after this many seconds of virtual time
        #[arg(long)]
        max_secs: Option<u64>,
    },
    /// Inspect the persisted queue
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
    /// Print the effective configuration
    Config {
        /// Write it back to the config file, creating it if missing
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Print the saved queue and its album groups
    Show {
        /// State directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Check the saved queue against the queue invariants
    Validate {
        /// State directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Repeat mode on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Off,
    All,
    One,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::All => RepeatMode::All,
            RepeatArg::One => RepeatMode::One,
        }
    }
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was
/// specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => crate::config::load_from(path),
        None => crate::config::load(),
    };

    match &cli.command {
        Some(Commands::Simulate {
            tracks,
            track_secs,
            crossfade,
            no_crossfade,
            network,
            download_rate,
            repeat,
            autoplay_blocked,
            max_secs,
        }) => {
            let options = SimulateOptions {
                tracks: *tracks,
                track_secs: *track_secs,
                crossfade_secs: *crossfade,
                crossfade_disabled: *no_crossfade,
                network: *network,
                download_rate: *download_rate,
                repeat: (*repeat).into(),
                autoplay_blocked: *autoplay_blocked,
                max_secs: *max_secs,
            };
            cmd_simulate(&config, &options)?;
            Ok(true)
        }
        Some(Commands::Queue { action }) => {
            match action {
                QueueCommand::Show { dir } => cmd_queue_show(&config, dir.as_deref())?,
                QueueCommand::Validate { dir } => cmd_queue_validate(&config, dir.as_deref())?,
            }
            Ok(true)
        }
        Some(Commands::Config { save }) => {
            cmd_config(&config, cli.config.as_deref(), *save)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
