//! Simulated playback handles on a virtual clock.
//!
//! Used by the `simulate` command and by tests: media time advances only
//! when the shared [`SimClock`] is advanced, and buffering progresses at a
//! configurable download rate, so transitions are fully reproducible.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::handle::{BufferedRange, HandleError, HandleId, PlaybackHandle, PreloadHint};

/// Duration assumed for sources missing from the catalog.
const DEFAULT_SOURCE_DURATION: Duration = Duration::from_secs(180);

/// A manually advanced clock shared by handles and their driver.
#[derive(Debug, Clone)]
pub struct SimClock {
    base: Instant,
    elapsed_ms: Arc<AtomicU64>,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current virtual instant.
    pub fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    /// Virtual time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }
}

/// Source durations by URL.
pub type Catalog = Arc<HashMap<String, Duration>>;

/// An in-process stand-in for a platform audio element.
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    id: HandleId,
    clock: SimClock,
    catalog: Catalog,
    /// Seconds of audio fetched per second of wall time
    download_rate: f64,
    reject_play: bool,

    source: Option<String>,
    hint: PreloadHint,
    metadata_known: bool,
    fetch_started: Option<Duration>,
    playing: bool,
    position: Duration,
    play_started: Option<Duration>,
    volume: f32,
    buffered_override: Option<Vec<BufferedRange>>,

    load_calls: usize,
    play_calls: usize,
}

impl SimulatedHandle {
    pub fn new(id: HandleId, clock: SimClock) -> Self {
        Self {
            id,
            clock,
            catalog: Arc::new(HashMap::new()),
            download_rate: 20.0,
            reject_play: false,
            source: None,
            hint: PreloadHint::Auto,
            metadata_known: false,
            fetch_started: None,
            playing: false,
            position: Duration::ZERO,
            play_started: None,
            volume: 1.0,
            buffered_override: None,
            load_calls: 0,
            play_calls: 0,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Seconds of audio buffered per second of clock time (0 = stalled network).
    pub fn with_download_rate(mut self, rate: f64) -> Self {
        self.download_rate = rate.max(0.0);
        self
    }

    /// Make every `play()` fail as if blocked by autoplay policy.
    pub fn rejecting_play(mut self) -> Self {
        self.reject_play = true;
        self
    }

    /// Number of `load()` calls since creation.
    pub fn load_calls(&self) -> usize {
        self.load_calls
    }

    /// Number of `play()` calls since creation.
    pub fn play_calls(&self) -> usize {
        self.play_calls
    }

    /// Preload hint of the current source.
    pub fn hint(&self) -> PreloadHint {
        self.hint
    }

    /// Whether a network fetch of the payload has begun.
    pub fn is_fetching(&self) -> bool {
        self.fetch_started.is_some()
    }

    /// Pin position and buffered ranges, for tests.
    pub fn set_test_state(&mut self, position: Duration, buffered: Vec<BufferedRange>) {
        self.position = position;
        if self.playing {
            self.play_started = Some(self.clock.elapsed());
        }
        self.buffered_override = Some(buffered);
    }

    fn source_duration(&self) -> Duration {
        self.source
            .as_ref()
            .and_then(|s| self.catalog.get(s).copied())
            .unwrap_or(DEFAULT_SOURCE_DURATION)
    }

    fn start_fetch(&mut self) {
        if self.fetch_started.is_none() {
            self.fetch_started = Some(self.clock.elapsed());
        }
        self.metadata_known = true;
    }
}

impl PlaybackHandle for SimulatedHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn set_source(&mut self, url: &str, hint: PreloadHint) {
        self.source = Some(url.to_string());
        self.hint = hint;
        self.metadata_known = false;
        self.fetch_started = None;
        self.playing = false;
        self.position = Duration::ZERO;
        self.play_started = None;
        self.buffered_override = None;
    }

    fn load(&mut self) {
        self.load_calls += 1;
        match self.hint {
            PreloadHint::Auto => self.start_fetch(),
            PreloadHint::Metadata => self.metadata_known = true,
            PreloadHint::None => {}
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn play(&mut self) -> Result<(), HandleError> {
        self.play_calls += 1;
        if self.reject_play {
            return Err(HandleError::AutoplayBlocked);
        }
        if self.source.is_none() {
            return Err(HandleError::NoSource);
        }
        self.start_fetch();
        if !self.playing {
            self.position = self.current_time();
            self.playing = true;
            self.play_started = Some(self.clock.elapsed());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.playing = false;
        self.play_started = None;
    }

    fn seek(&mut self, position: Duration) {
        self.position = position.min(self.source_duration());
        if self.playing {
            self.play_started = Some(self.clock.elapsed());
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn current_time(&self) -> Duration {
        let played = match (self.playing, self.play_started) {
            (true, Some(started)) => self.clock.elapsed().saturating_sub(started),
            _ => Duration::ZERO,
        };
        (self.position + played).min(self.source_duration())
    }

    fn duration(&self) -> Option<Duration> {
        self.metadata_known.then(|| self.source_duration())
    }

    fn buffered(&self) -> Vec<BufferedRange> {
        if let Some(ranges) = &self.buffered_override {
            return ranges.clone();
        }
        let Some(started) = self.fetch_started else {
            return Vec::new();
        };
        let fetched = self.clock.elapsed().saturating_sub(started).as_secs_f64() * self.download_rate;
        let end = Duration::from_secs_f64(fetched).min(self.source_duration());
        if end.is_zero() {
            Vec::new()
        } else {
            vec![BufferedRange {
                start: Duration::ZERO,
                end,
            }]
        }
    }

    fn is_paused(&self) -> bool {
        !self.playing
    }

    fn has_ended(&self) -> bool {
        self.source.is_some()
            && self.metadata_known
            && self.current_time() >= self.source_duration()
    }

    fn is_loading(&self) -> bool {
        self.fetch_started.is_some() && self.buffered_end() < self.source_duration()
    }
}
