//! Binds the queue to the crossfade engine.
//!
//! After every queue change the orchestrator derives two things: what should
//! be playing now (the cursor item, loaded into the active handle) and what
//! to preload next (the upcoming item, per the repeat mode). Engine events
//! flow back the other way: a finished transition moves the cursor onto the
//! item that is now audible.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::crossfade::{CrossfadeEngine, EngineEvent, EngineTimers};
use super::handle::{HandleError, PlaybackHandle};
use super::media_controls::{
    MediaControlCommand, MediaPlaybackState, MediaSession, NoopSession, NowPlaying, SEEK_STEP,
    SeekDirection,
};
use super::network::{NetworkProbe, StaticNetwork};
use super::state::{PlaybackStatus, PlayerSnapshot, TrackInfo};
use super::stats::{StatsThresholds, StreamingStats, StreamingStatsMonitor};
use crate::model::StreamQuality;
use crate::queue::{
    QueueAction, QueueId, QueueItem, QueueStore, RepeatMode, SubscriberId, UnifiedQueue,
};
use crate::telemetry::{TelemetryEvent, TelemetrySink, TracingSink};

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Stream quality requested from songs
    pub quality: StreamQuality,
    /// Past this point `previous` restarts the track instead of going back
    pub previous_restart: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            quality: StreamQuality::High,
            previous_restart: Duration::from_secs(3),
        }
    }
}

/// A queue item as bound to a handle.
#[derive(Debug, Clone, PartialEq)]
struct Bound {
    queue_id: QueueId,
    song_id: String,
    title: String,
    url: Option<String>,
}

impl Bound {
    fn new(item: &QueueItem, quality: StreamQuality) -> Self {
        Self {
            queue_id: item.queue_id.clone(),
            song_id: item.song.id.clone(),
            title: item.track_title.clone(),
            url: item.song.stream_url(quality).map(str::to_string),
        }
    }
}

/// Transport, queue and engine glue.
pub struct PlaybackOrchestrator<H: PlaybackHandle> {
    store: QueueStore,
    engine: CrossfadeEngine<H>,
    stats: StreamingStatsMonitor,
    network: Box<dyn NetworkProbe>,
    session: Box<dyn MediaSession>,
    telemetry: Box<dyn TelemetrySink>,
    settings: OrchestratorSettings,

    status: PlaybackStatus,
    /// Item loaded into the active handle
    loaded: Option<Bound>,
    /// Item prepared on the inactive handle
    preloaded: Option<Bound>,
    /// Item a `song_play` was last reported for
    announced: Option<QueueId>,
    playback_error: Option<String>,
    /// Last (item, state) pushed to the media session
    reported: Option<(QueueId, MediaPlaybackState)>,
}

impl<H: PlaybackHandle> PlaybackOrchestrator<H> {
    pub fn new(store: QueueStore, engine: CrossfadeEngine<H>) -> Self {
        Self {
            store,
            engine,
            stats: StreamingStatsMonitor::default(),
            network: Box::new(StaticNetwork::default()),
            session: Box::new(NoopSession),
            telemetry: Box::new(TracingSink),
            settings: OrchestratorSettings::default(),
            status: PlaybackStatus::Stopped,
            loaded: None,
            preloaded: None,
            announced: None,
            playback_error: None,
            reported: None,
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_network(mut self, network: Box<dyn NetworkProbe>) -> Self {
        self.network = network;
        self
    }

    pub fn with_session(mut self, session: Box<dyn MediaSession>) -> Self {
        self.session = session;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_stats(mut self, thresholds: StatsThresholds) -> Self {
        self.stats = StreamingStatsMonitor::new(thresholds);
        self
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn queue(&self) -> &UnifiedQueue {
        self.store.state()
    }

    pub fn engine(&self) -> &CrossfadeEngine<H> {
        &self.engine
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Message of the last rejected `play()`, until one succeeds.
    pub fn playback_error(&self) -> Option<&str> {
        self.playback_error.as_deref()
    }

    pub fn timers(&self) -> EngineTimers {
        self.engine.timers()
    }

    pub fn stats_monitor(&self) -> &StreamingStatsMonitor {
        &self.stats
    }

    /// Register a queue listener.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&UnifiedQueue) + Send + 'static,
    ) -> SubscriberId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Point-in-time view for UIs.
    pub fn snapshot(&self) -> PlayerSnapshot {
        let queue = self.store.state();
        let active = self.engine.active_handle();
        let current = self
            .loaded
            .as_ref()
            .and_then(|b| queue.get(&b.queue_id).map(|item| (b, item)));

        let status = match self.status {
            PlaybackStatus::Playing if active.is_loading() && active.buffered_ahead().is_zero() => {
                PlaybackStatus::Loading
            }
            other => other,
        };

        PlayerSnapshot {
            status,
            track: current.map(|(bound, item)| TrackInfo {
                queue_id: bound.queue_id.clone(),
                title: item.track_title.clone(),
                artist: item.song.artist.name.clone(),
                album: item.song.album.title.clone(),
                url: bound.url.clone(),
            }),
            position: if current.is_some() {
                active.current_time()
            } else {
                Duration::ZERO
            },
            duration: current
                .map(|(_, item)| active.duration().unwrap_or_else(|| item.song.duration()))
                .unwrap_or(Duration::ZERO),
            volume: self.engine.volume(),
            repeat: queue.repeat(),
            queue_len: queue.len(),
            cursor: queue.cursor_index(),
            crossfade: self.engine.state(),
            stats: self.stats.snapshot().cloned(),
            playback_error: self.playback_error.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Apply a queue action and rebind the engine if anything changed.
    pub fn dispatch(&mut self, action: QueueAction) -> bool {
        let changed = self.store.dispatch(action);
        if changed {
            self.sync();
        }
        changed
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start or resume. With nothing selected, starts at the first item.
    pub fn play(&mut self) {
        if self.loaded.is_none() {
            if self.store.state().current().is_none() && !self.store.dispatch(QueueAction::Advance) {
                debug!("play ignored, queue is empty");
                return;
            }
            self.sync();
        }
        self.start_playback();
        self.preload_upcoming();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
        self.preload_upcoming();
        if matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Loading) {
            self.set_status(PlaybackStatus::Paused);
        }
    }

    pub fn toggle(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Pause and rewind the current item.
    pub fn stop(&mut self) {
        self.engine.pause();
        self.engine.seek(Duration::ZERO);
        self.preload_upcoming();
        self.set_status(PlaybackStatus::Stopped);
    }

    /// Skip forward. Under repeat-one this restarts the current item.
    pub fn next(&mut self) {
        if self.store.state().repeat() == RepeatMode::One {
            self.restart();
            return;
        }
        if self.engine.state().is_crossfading {
            self.engine.stop_crossfade();
        }
        if self.store.dispatch(QueueAction::Advance) {
            self.sync();
        } else {
            self.preload_upcoming();
        }
    }

    /// Skip back, or restart if we're past the restart threshold.
    pub fn previous(&mut self) {
        let position = self.engine.active_handle().current_time();
        if position > self.settings.previous_restart
            || self.store.state().repeat() == RepeatMode::One
        {
            self.restart();
            return;
        }
        if self.engine.state().is_crossfading {
            self.engine.stop_crossfade();
        }
        if self.store.dispatch(QueueAction::Retreat) {
            self.sync();
        } else {
            self.restart();
        }
    }

    pub fn seek(&mut self, position: Duration) {
        self.engine.seek(position);
        self.preload_upcoming();
        self.report_session(true);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Handle a command from the OS media session.
    pub fn handle_media_command(&mut self, command: MediaControlCommand) {
        debug!(?command, "media control");
        match command {
            MediaControlCommand::Play => self.play(),
            MediaControlCommand::Pause => self.pause(),
            MediaControlCommand::Toggle => self.toggle(),
            MediaControlCommand::Stop => self.stop(),
            MediaControlCommand::Next => self.next(),
            MediaControlCommand::Previous => self.previous(),
            MediaControlCommand::Seek(position) => self.seek(position),
            MediaControlCommand::SeekRelative(direction) => {
                let active = self.engine.active_handle();
                let position = active.current_time();
                let target = match direction {
                    SeekDirection::Forward => {
                        let end = active.duration().unwrap_or(Duration::MAX);
                        (position + SEEK_STEP).min(end)
                    }
                    SeekDirection::Backward => position.saturating_sub(SEEK_STEP),
                };
                self.seek(target);
            }
        }
    }

    /// Stop playback and tear down the engine.
    pub fn dispose(&mut self) {
        self.engine.dispose();
        self.session.clear();
        self.reported = None;
        self.status = PlaybackStatus::Stopped;
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Poll-interval tick.
    pub fn on_poll(&mut self, now: Instant) -> Vec<EngineEvent> {
        self.refresh_network();
        let events = self.engine.poll(now);
        self.handle_events(&events);
        events
    }

    /// Frame tick while a ramp is running.
    pub fn on_frame(&mut self, now: Instant) -> Vec<EngineEvent> {
        let events = self.engine.advance_ramp(now);
        self.handle_events(&events);
        events
    }

    /// Stats tick. Returns a snapshot only when it changed meaningfully.
    pub fn sample_stats(&mut self, now: Instant) -> Option<StreamingStats> {
        self.stats
            .sample(now, self.engine.active_handle(), self.network.as_ref())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Bring the engine in line with the queue.
    fn sync(&mut self) {
        let quality = self.settings.quality;
        let current = self.store.state().current().map(|i| Bound::new(i, quality));
        match current {
            None => {
                if self.loaded.take().is_some() {
                    info!("queue has no current item, stopping");
                    self.engine.pause();
                    self.status = PlaybackStatus::Stopped;
                    self.session.clear();
                    self.reported = None;
                }
            }
            Some(next) => {
                if self.loaded.as_ref() != Some(&next) {
                    let resume = self.status == PlaybackStatus::Playing;
                    self.load(next);
                    if resume {
                        self.start_playback();
                    }
                }
            }
        }
        self.preload_upcoming();
    }

    fn load(&mut self, next: Bound) {
        match &next.url {
            Some(url) => self.engine.load_active(url),
            None => {
                warn!(song = %next.song_id, "song has no stream url");
                self.engine.pause();
            }
        }
        if self.engine.preloaded_url().is_none() {
            self.preloaded = None;
        }
        info!(queue_id = %next.queue_id, title = %next.title, "loaded track");
        self.loaded = Some(next);
        self.announced = None;
        self.stats.reset();
        self.report_session(true);
    }

    /// Prepare the upcoming item on the inactive handle. Safe to call
    /// repeatedly: cancelling a fade drops the engine's preload, so every
    /// transport action that can cancel one calls this afterwards.
    fn preload_upcoming(&mut self) {
        if self.engine.state().is_crossfading {
            if self.store.state().repeat() != RepeatMode::One {
                return;
            }
            info!("repeat one set mid-crossfade, keeping current track");
            self.engine.stop_crossfade();
        }
        let queue = self.store.state();
        let upcoming = match queue.repeat() {
            RepeatMode::One => None,
            _ if self.loaded.is_none() => None,
            _ => queue.upcoming().map(|i| Bound::new(i, self.settings.quality)),
        };

        match upcoming {
            Some(next) if next.url.is_some() => {
                self.refresh_network();
                if let Some(url) = &next.url {
                    self.engine.preload(url);
                }
                self.preloaded = Some(next);
            }
            _ => {
                self.engine.clear_preload();
                self.preloaded = None;
            }
        }
    }

    fn start_playback(&mut self) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        if loaded.url.is_none() {
            self.fail(HandleError::NoSource);
            return;
        }
        match self.engine.play() {
            Ok(()) => {
                self.playback_error = None;
                self.set_status(PlaybackStatus::Playing);
                self.announce();
            }
            Err(e) => self.fail(e),
        }
    }

    /// Rewind the current item, continuing playback if it was playing.
    fn restart(&mut self) {
        self.engine.seek(Duration::ZERO);
        self.preload_upcoming();
        self.announced = None;
        if self.status == PlaybackStatus::Playing {
            self.start_playback();
        }
        self.report_session(true);
    }

    fn fail(&mut self, error: HandleError) {
        self.playback_error = Some(error.to_string());
        self.telemetry.track(&TelemetryEvent::PlaybackError {
            message: error.to_string(),
        });
        self.set_status(PlaybackStatus::Paused);
    }

    fn announce(&mut self) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        if self.announced.as_ref() == Some(&loaded.queue_id) {
            return;
        }
        self.telemetry.track(&TelemetryEvent::SongPlay {
            song_id: loaded.song_id.clone(),
            title: loaded.title.clone(),
        });
        self.announced = Some(loaded.queue_id.clone());
    }

    fn refresh_network(&mut self) {
        let class = self.network.classify();
        let previous = self.engine.network();
        if class != previous {
            self.telemetry.track(&TelemetryEvent::QualityChange {
                from: previous,
                to: class,
            });
            self.engine.set_network(class);
        }
    }

    fn handle_events(&mut self, events: &[EngineEvent]) {
        let mut rejected = None;
        for event in events {
            match event {
                EngineEvent::CrossfadeStarted { .. } => {
                    let to_song = self
                        .preloaded
                        .as_ref()
                        .map(|b| b.song_id.clone())
                        .unwrap_or_default();
                    self.telemetry.track(&TelemetryEvent::Crossfade {
                        from_song: self.loaded.as_ref().map(|b| b.song_id.clone()),
                        to_song,
                        duration_ms: self.engine.settings().duration.as_millis() as u64,
                    });
                }
                EngineEvent::PlaybackRejected { error, .. } => rejected = Some(error.clone()),
                EngineEvent::TransitionComplete { hard_cut, .. } => {
                    self.complete_transition(*hard_cut, rejected.take());
                }
                EngineEvent::ActiveEnded => self.on_active_ended(),
            }
        }
        if let Some(error) = rejected {
            self.fail(error);
        }
    }

    /// The preloaded item is now audible; move the cursor onto it.
    fn complete_transition(&mut self, hard_cut: bool, rejected: Option<HandleError>) {
        if let Some(previous) = &self.loaded {
            self.telemetry.track(&TelemetryEvent::SongComplete {
                song_id: previous.song_id.clone(),
            });
        }
        let Some(next) = self.preloaded.take() else {
            warn!("transition completed without a preloaded item");
            return;
        };
        if hard_cut {
            self.telemetry.track(&TelemetryEvent::HardCut {
                to_song: next.song_id.clone(),
            });
        }

        let action = if self.store.state().index_of(&next.queue_id).is_some() {
            QueueAction::PlayFromQueue {
                queue_id: next.queue_id.clone(),
            }
        } else {
            QueueAction::Advance
        };
        self.loaded = Some(next);
        self.announced = None;
        self.stats.reset();
        self.store.dispatch(action);
        self.sync();

        match rejected {
            Some(error) => self.fail(error),
            None => {
                self.playback_error = None;
                self.status = PlaybackStatus::Playing;
                self.announce();
            }
        }
        self.report_session(true);
    }

    fn on_active_ended(&mut self) {
        if let Some(loaded) = &self.loaded {
            self.telemetry.track(&TelemetryEvent::SongComplete {
                song_id: loaded.song_id.clone(),
            });
        }
        if self.store.state().repeat() == RepeatMode::One {
            info!("repeat one, restarting track");
            self.restart();
            return;
        }
        if self.store.dispatch(QueueAction::Advance) {
            self.sync();
        } else {
            info!("reached end of queue");
            self.engine.pause();
            self.engine.seek(Duration::ZERO);
            self.set_status(PlaybackStatus::Stopped);
        }
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "playback status");
            self.status = status;
            self.report_session(false);
        }
    }

    /// Push now-playing to the media session if the item or state changed
    /// (or unconditionally with `force`).
    fn report_session(&mut self, force: bool) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        let state = match self.status {
            PlaybackStatus::Playing => MediaPlaybackState::Playing,
            PlaybackStatus::Paused | PlaybackStatus::Loading => MediaPlaybackState::Paused,
            PlaybackStatus::Stopped => MediaPlaybackState::Stopped,
        };
        let key = (loaded.queue_id.clone(), state);
        if !force && self.reported.as_ref() == Some(&key) {
            return;
        }
        let Some(item) = self.store.state().get(&loaded.queue_id) else {
            return;
        };

        let active = self.engine.active_handle();
        let mut now_playing = NowPlaying::with_title(item.track_title.clone())
            .artist(item.song.artist.name.clone())
            .album(item.song.album.title.clone())
            .duration(active.duration().unwrap_or_else(|| item.song.duration()))
            .position(active.current_time())
            .state(state);
        if let Some(artwork) = &item.song.artwork_url {
            now_playing = now_playing.artwork(artwork.clone());
        }
        self.session.update(&now_playing);
        self.reported = Some(key);
    }
}
