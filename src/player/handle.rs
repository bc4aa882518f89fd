//! The playback handle abstraction.
//!
//! A handle is one platform audio element: it holds a source, buffers it
//! and plays it at a volume. The engine only relies on the capabilities in
//! [`PlaybackHandle`], never on a particular native media API.

use std::fmt;
use std::time::Duration;

/// Stable identity of a handle, used by the graph registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u32);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// How eagerly a handle should fetch its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadHint {
    /// Don't fetch anything until playback starts
    None,
    /// Fetch headers/duration only
    Metadata,
    /// Buffer as much as possible
    #[default]
    Auto,
}

/// A contiguous buffered span of the source, in media time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedRange {
    pub start: Duration,
    pub end: Duration,
}

/// Why a handle refused to start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("playback blocked by autoplay policy")]
    AutoplayBlocked,

    #[error("no source loaded")]
    NoSource,

    #[error("failed to decode source: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),
}

/// One platform audio element.
pub trait PlaybackHandle {
    fn id(&self) -> HandleId;

    /// Point the handle at `url` without starting a fetch.
    fn set_source(&mut self, url: &str, hint: PreloadHint);

    /// Begin fetching the current source according to its hint.
    fn load(&mut self);

    /// The current source, if any.
    fn source(&self) -> Option<&str>;

    fn play(&mut self) -> Result<(), HandleError>;
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);

    /// Output volume (0.0 - 1.0).
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;

    fn current_time(&self) -> Duration;

    /// Media duration, once known.
    fn duration(&self) -> Option<Duration>;

    fn buffered(&self) -> Vec<BufferedRange>;

    fn is_paused(&self) -> bool;

    /// Playback reached the end of the source.
    fn has_ended(&self) -> bool;

    /// Waiting on network data.
    fn is_loading(&self) -> bool;

    /// End of the last buffered range.
    fn buffered_end(&self) -> Duration {
        self.buffered()
            .iter()
            .map(|r| r.end)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Seconds buffered past the playhead (zero if the playhead sits
    /// outside every range).
    fn buffered_ahead(&self) -> Duration {
        let now = self.current_time();
        self.buffered()
            .iter()
            .find(|r| r.start <= now && now <= r.end)
            .map(|r| r.end - now)
            .unwrap_or(Duration::ZERO)
    }

    /// Time left in the source, once the duration is known.
    fn remaining(&self) -> Option<Duration> {
        self.duration()
            .map(|d| d.saturating_sub(self.current_time()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::sim::{SimClock, SimulatedHandle};

    #[test]
    fn test_buffered_helpers() {
        let clock = SimClock::new();
        let mut handle = SimulatedHandle::new(HandleId(0), clock.clone());
        handle.set_source("https://cdn.example/a.mp3", PreloadHint::Auto);
        handle.set_test_state(
            Duration::from_secs(10),
            vec![
                BufferedRange {
                    start: Duration::ZERO,
                    end: Duration::from_secs(30),
                },
                BufferedRange {
                    start: Duration::from_secs(60),
                    end: Duration::from_secs(90),
                },
            ],
        );

        assert_eq!(handle.buffered_end(), Duration::from_secs(90));
        assert_eq!(handle.buffered_ahead(), Duration::from_secs(20));

        handle.seek(Duration::from_secs(45));
        assert_eq!(handle.buffered_ahead(), Duration::ZERO);
    }
}
