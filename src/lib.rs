//! Encore - gapless, crossfading playback for streamed live recordings.
//!
//! The crate is split into a pure queue model ([`queue`]), the playback
//! engine that drives two media handles from it ([`player`]), and the
//! ambient pieces around them (config, errors, telemetry, CLI).

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod player;
pub mod queue;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
