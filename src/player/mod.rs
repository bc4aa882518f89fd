//! Playback: dual-handle crossfade engine driven by the queue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  EngineDriver (tokio task)                      │
//! │   command channel · 100 ms poll · 16 ms ramp · 250 ms stats     │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ owns
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PlaybackOrchestrator                         │
//! │  QueueStore ─► current / upcoming item ─► engine calls          │
//! │  media session · telemetry · streaming stats                    │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     CrossfadeEngine                             │
//! │        handle A ◄── volume ramp / hard cut ──► handle B         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handles are platform audio elements behind [`PlaybackHandle`];
//! [`SimulatedHandle`] runs on a virtual [`SimClock`] for tests and the
//! `simulate` command.

mod crossfade;
mod driver;
mod graph;
mod handle;
mod media_controls;
mod network;
mod orchestrator;
mod sim;
mod state;
mod stats;

pub use crossfade::{
    CrossfadeEngine, CrossfadeSettings, CrossfadeState, EngineEvent, EngineTimers, Slot,
};
pub use driver::{DriverError, EngineDriver, FRAME_INTERVAL};
pub use graph::{AudioGraph, GraphError, GraphRegistry, NodeId};
pub use handle::{BufferedRange, HandleError, HandleId, PlaybackHandle, PreloadHint};
pub use media_controls::{
    MediaControlCommand, MediaPlaybackState, MediaSession, NoopSession, NowPlaying,
    RecordingSession, SEEK_STEP, SeekDirection,
};
pub use network::{NetworkClass, NetworkProbe, PreloadStrategy, StaticNetwork};
pub use orchestrator::{OrchestratorSettings, PlaybackOrchestrator};
pub use sim::{Catalog, SimClock, SimulatedHandle};
pub use state::{PlaybackStatus, PlayerCommand, PlayerSnapshot, TrackInfo, format_duration};
pub use stats::{StatsThresholds, StreamingStats, StreamingStatsMonitor};
