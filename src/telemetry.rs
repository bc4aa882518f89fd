//! Playback telemetry.
//!
//! The orchestrator reports named events to a [`TelemetrySink`]. Sinks must
//! never block or fail playback: [`ChannelSink`] drops events when its
//! consumer falls behind.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::Serialize;

use crate::player::NetworkClass;

/// Something worth reporting to an analytics backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    SongPlay {
        song_id: String,
        title: String,
    },
    /// A track ran to its end (not skipped)
    SongComplete {
        song_id: String,
    },
    /// Network class changed mid-session
    QualityChange {
        from: NetworkClass,
        to: NetworkClass,
    },
    Crossfade {
        from_song: Option<String>,
        to_song: String,
        duration_ms: u64,
    },
    HardCut {
        to_song: String,
    },
    PlaybackError {
        message: String,
    },
}

impl TelemetryEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::SongPlay { .. } => "song_play",
            TelemetryEvent::SongComplete { .. } => "song_complete",
            TelemetryEvent::QualityChange { .. } => "quality_change",
            TelemetryEvent::Crossfade { .. } => "crossfade",
            TelemetryEvent::HardCut { .. } => "hard_cut",
            TelemetryEvent::PlaybackError { .. } => "playback_error",
        }
    }
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send {
    fn track(&mut self, event: &TelemetryEvent);
}

/// Writes events to the tracing log.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn track(&mut self, event: &TelemetryEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(target: "encore::telemetry", event = event.name(), "{}", json),
            Err(_) => tracing::info!(target: "encore::telemetry", event = event.name(), "{:?}", event),
        }
    }
}

/// Forwards events over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<TelemetryEvent>,
    dropped: u64,
}

impl ChannelSink {
    /// Sink plus the receiving end, holding at most `capacity` events.
    pub fn bounded(capacity: usize) -> (Self, Receiver<TelemetryEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, dropped: 0 }, rx)
    }

    /// Events dropped because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TelemetrySink for ChannelSink {
    fn track(&mut self, event: &TelemetryEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                tracing::trace!(event = event.name(), "telemetry event dropped");
            }
        }
    }
}
