//! Command-line interface for encore.
//!
//! Commands for exercising the playback engine on a virtual clock and for
//! inspecting the saved queue and configuration.

mod commands;

pub use commands::{Cli, Commands, QueueCommand, RepeatArg, SimulateOptions, run_command};
