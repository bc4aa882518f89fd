//! OS media session integration.
//!
//! The platform side (lock screen, media keys, headset buttons) lives
//! behind [`MediaSession`]. The orchestrator pushes [`NowPlaying`] whenever
//! the current item or playback state changes, and the host forwards
//! [`MediaControlCommand`]s back as `PlayerCommand::MediaControl`.

use std::time::Duration;

use parking_lot::Mutex;
use std::sync::Arc;

/// Direction of a relative seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Commands that can be received from OS media controls.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaControlCommand {
    /// Play or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Toggle play/pause
    Toggle,
    /// Stop playback
    Stop,
    /// Skip to next track
    Next,
    /// Skip to previous track
    Previous,
    /// Seek to absolute position
    Seek(Duration),
    /// Seek forward/backward by a small step
    SeekRelative(SeekDirection),
}

/// How far a relative seek jumps.
pub const SEEK_STEP: Duration = Duration::from_secs(10);

/// Playback state for media controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaPlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Metadata shown by the OS media session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub playback_state: MediaPlaybackState,
    pub position: Duration,
    pub duration: Option<Duration>,
}

impl NowPlaying {
    /// Create metadata with just a title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn state(mut self, state: MediaPlaybackState) -> Self {
        self.playback_state = state;
        self
    }

    pub fn position(mut self, position: Duration) -> Self {
        self.position = position;
        self
    }
}

/// Receiver of now-playing updates.
pub trait MediaSession: Send {
    fn update(&mut self, now_playing: &NowPlaying);

    /// Nothing is loaded any more.
    fn clear(&mut self) {}
}

/// Session that drops every update.
#[derive(Debug, Default)]
pub struct NoopSession;

impl MediaSession for NoopSession {
    fn update(&mut self, _now_playing: &NowPlaying) {}
}

/// Session that keeps the last update in shared memory.
///
/// Lets a host (or a test) read what the OS overlay would show.
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    last: Arc<Mutex<Option<NowPlaying>>>,
    updates: Arc<Mutex<usize>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<NowPlaying> {
        self.last.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock()
    }
}

impl MediaSession for RecordingSession {
    fn update(&mut self, now_playing: &NowPlaying) {
        *self.last.lock() = Some(now_playing.clone());
        *self.updates.lock() += 1;
    }

    fn clear(&mut self) {
        *self.last.lock() = None;
    }
}
