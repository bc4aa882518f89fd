//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors (e.g., [`PersistError`], [`ConfigError`]) for
//!   detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! Playback failures never reach this type. A rejected `play()` stays a
//! `HandleError` inside the player and surfaces as the snapshot's
//! `playback_error`. Stale queue references are not errors at all: the
//! reducer ignores them. An under-buffered next track is not an error
//! either: the engine hard cuts.
//!
//! # Example
//!
//! ```ignore
//! use encore::error::{Result, ResultExt};
//!
//! fn read_queue(store: &FileStore) -> Result<UnifiedQueue> {
//!     try_load_queue(store, QUEUE_STATE_KEY).with_context("reading saved queue")
//! }
//! ```

use crate::config::ConfigError;
use crate::queue::PersistError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Saved queue missing, unreadable or invalid
    #[error("Persisted queue: {0}")]
    Persist(#[from] PersistError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this is (or wraps) a corrupt saved queue.
    pub fn is_corrupt_state(&self) -> bool {
        match self {
            Self::Persist(PersistError::Corrupt(_))
            | Self::Persist(PersistError::Json(_))
            | Self::Persist(PersistError::UnsupportedVersion(_)) => true,
            Self::WithContext { source, .. } => source.is_corrupt_state(),
            _ => false,
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, ConfigError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::from(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PersistError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Persist(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InvariantViolation;

    #[test]
    fn test_error_display() {
        let err = Error::from(PersistError::UnsupportedVersion(7));
        assert!(err.to_string().starts_with("Persisted queue:"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_error_context() {
        let err = Error::config("bad volume").context("loading settings");
        let msg = err.to_string();
        assert!(msg.contains("loading settings"));
        assert!(msg.contains("bad volume"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), ConfigError> = Err(ConfigError::NoConfigDir);
        let err = result.with_context("writing config").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("writing config"));
        assert!(msg.contains("config directory"));
        assert!(!err.is_corrupt_state());
    }

    #[test]
    fn test_corrupt_state_detection() {
        let corrupt: std::result::Result<(), PersistError> =
            Err(PersistError::Corrupt(InvariantViolation::CursorOutOfRange {
                cursor: 9,
                len: 2,
            }));
        let err = corrupt.with_context("reading saved queue").unwrap_err();
        assert!(err.is_corrupt_state());
        assert!(!Error::config("queue persistence is disabled").is_corrupt_state());
    }
}
