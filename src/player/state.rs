//! Player state and command types.

use std::time::Duration;

use super::crossfade::CrossfadeState;
use super::media_controls::MediaControlCommand;
use super::stats::StreamingStats;
use crate::queue::{QueueAction, QueueId, RepeatMode};

/// Current playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
}

/// What the current queue item is, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub queue_id: QueueId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub url: Option<String>,
}

/// Read-only view of the player published by the driver.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    /// Current playback status
    pub status: PlaybackStatus,
    pub track: Option<TrackInfo>,
    /// Current position in the track
    pub position: Duration,
    /// Total duration of the track (zero until known)
    pub duration: Duration,
    /// Volume level (0.0 - 1.0)
    pub volume: f32,
    pub repeat: RepeatMode,
    pub queue_len: usize,
    /// Cursor index (-1 = nothing selected)
    pub cursor: i32,
    pub crossfade: CrossfadeState,
    pub stats: Option<StreamingStats>,
    /// Last rejected `play()`, cleared by the next successful one
    pub playback_error: Option<String>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            track: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            volume: 1.0,
            repeat: RepeatMode::Off,
            queue_len: 0,
            cursor: -1,
            crossfade: CrossfadeState::default(),
            stats: None,
            playback_error: None,
        }
    }
}

impl PlayerSnapshot {
    /// Get position as a fraction (0.0 - 1.0).
    pub fn position_fraction(&self) -> f32 {
        if self.duration.is_zero() {
            0.0
        } else {
            self.position.as_secs_f32() / self.duration.as_secs_f32()
        }
    }

    /// Format position as MM:SS.
    pub fn position_str(&self) -> String {
        format_duration(self.position)
    }

    /// Format duration as MM:SS.
    pub fn duration_str(&self) -> String {
        format_duration(self.duration)
    }
}

/// Format a duration as MM:SS or HH:MM:SS.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Commands sent to the engine driver.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Start/resume playback
    Play,
    /// Pause playback
    Pause,
    Toggle,
    /// Stop and rewind
    Stop,
    Next,
    Previous,
    /// Seek to absolute position
    Seek(Duration),
    /// Volume (0.0 - 1.0)
    SetVolume(f32),
    /// Apply a queue action
    Dispatch(QueueAction),
    /// Command from the OS media session
    MediaControl(MediaControlCommand),
    /// Stop the driver and dispose the engine
    Shutdown,
}
