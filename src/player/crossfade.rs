//! Dual-handle crossfade engine.
//!
//! # State machine
//!
//! ```text
//!            preload(url)                 poll: remaining ≤ fade
//!   idle ─────────────────► preloaded ─────────────────────────┐
//!    ▲                          │                              ▼
//!    │      stop_crossfade()    │ inactive buffered < min   start_crossfade()
//!    ├──────────────────────────┼──────────────┐               │
//!    │                          ▼              │               ▼
//!    │                      hard cut ◄─────────┴──────────  ramping
//!    │                          │                              │ progress = 1
//!    └──────── swap roles ◄─────┴──────────────────────────────┘
//! ```
//!
//! Two handles take turns being audible. The inactive one is preloaded with
//! the next track; at the crossfade point the engine ramps volumes between
//! them, or cuts over immediately if the next track isn't buffered enough.
//!
//! The engine has no timers of its own: the driver calls [`CrossfadeEngine::poll`]
//! on a fixed interval and [`CrossfadeEngine::advance_ramp`] per frame while
//! [`EngineTimers::ramp`] is set. Progress is computed from the `Instant`
//! passed in, so slow or skipped frames never desynchronize the fade.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::graph::{AudioGraph, GraphError, GraphRegistry, NodeId};
use super::handle::{HandleError, PlaybackHandle, PreloadHint};
use super::network::{NetworkClass, PreloadStrategy};

/// Which of the two handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Slot {
    #[default]
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Observable crossfade state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CrossfadeState {
    pub active: Slot,
    pub is_crossfading: bool,
    /// Ramp progress (0.0 - 1.0)
    pub progress: f32,
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadeSettings {
    /// Ramp between tracks (false = gapless hard cuts at track end)
    pub enabled: bool,
    pub duration: Duration,
    /// Buffer the next track needs before a ramp is attempted
    pub min_buffered: Duration,
    /// Interval the driver polls time remaining at
    pub poll_interval: Duration,
}

impl Default for CrossfadeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: Duration::from_secs(5),
            min_buffered: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Things the orchestrator needs to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    CrossfadeStarted { from: Slot, to: Slot },
    /// Roles swapped; the preloaded track is now the active one
    TransitionComplete { hard_cut: bool, active: Slot },
    /// The active track finished with nothing preloaded
    ActiveEnded,
    /// A handle refused to play; state transitions still completed
    PlaybackRejected { slot: Slot, error: HandleError },
}

/// Which timers the driver must keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimers {
    pub poll: bool,
    pub ramp: bool,
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    started: Instant,
    last_progress: f32,
}

/// Owns both handles. Nothing else may play, pause or seek them.
pub struct CrossfadeEngine<H: PlaybackHandle> {
    handles: [H; 2],
    state: CrossfadeState,
    settings: CrossfadeSettings,
    /// Baseline volume the user set
    volume: f32,
    network: NetworkClass,
    /// URL the inactive handle was prepared with
    preload: Option<String>,
    ramp: Option<Ramp>,
    registry: GraphRegistry,
    ended_reported: bool,
    disposed: bool,
}

impl<H: PlaybackHandle> CrossfadeEngine<H> {
    pub fn new(a: H, b: H, settings: CrossfadeSettings) -> Self {
        let mut engine = Self {
            handles: [a, b],
            state: CrossfadeState::default(),
            settings,
            volume: 1.0,
            network: NetworkClass::Unknown,
            preload: None,
            ramp: None,
            registry: GraphRegistry::new(),
            ended_reported: false,
            disposed: false,
        };
        engine.handles[Slot::B.index()].set_volume(0.0);
        engine
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn state(&self) -> CrossfadeState {
        self.state
    }

    pub fn active_slot(&self) -> Slot {
        self.state.active
    }

    pub fn handle(&self, slot: Slot) -> &H {
        &self.handles[slot.index()]
    }

    /// The handle that is (or will be) audible.
    pub fn active_handle(&self) -> &H {
        self.handle(self.state.active)
    }

    pub fn inactive_handle(&self) -> &H {
        self.handle(self.state.active.other())
    }

    pub fn settings(&self) -> &CrossfadeSettings {
        &self.settings
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn network(&self) -> NetworkClass {
        self.network
    }

    /// URL currently marked as preloaded.
    pub fn preloaded_url(&self) -> Option<&str> {
        self.preload.as_deref()
    }

    pub fn timers(&self) -> EngineTimers {
        EngineTimers {
            poll: !self.disposed,
            ramp: !self.disposed && self.ramp.is_some(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn active_mut(&mut self) -> &mut H {
        &mut self.handles[self.state.active.index()]
    }

    fn inactive_mut(&mut self) -> &mut H {
        &mut self.handles[self.state.active.other().index()]
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_settings(&mut self, settings: CrossfadeSettings) {
        self.settings = settings;
    }

    /// Network class used for the next preload decision.
    pub fn set_network(&mut self, network: NetworkClass) {
        if network != self.network {
            debug!(from = %self.network, to = %network, "network class changed");
            self.network = network;
        }
    }

    /// Set the baseline volume (0.0 - 1.0). A ramp in flight keeps its
    /// progress and scales to the new baseline.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        match self.ramp {
            Some(ramp) => self.apply_ramp_volumes(ramp.last_progress),
            None => {
                let v = self.volume;
                self.active_mut().set_volume(v);
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport on the active handle
    // ------------------------------------------------------------------

    /// Make `url` the active source. Does not start playback.
    ///
    /// If `url` is what the inactive handle has preloaded, that handle is
    /// promoted instead of loading from scratch.
    pub fn load_active(&mut self, url: &str) {
        if self.disposed {
            return;
        }
        if self.ramp.is_some() {
            self.stop_crossfade();
        }
        self.ended_reported = false;

        if self.preloaded_url() == Some(url) {
            debug!(url, "promoting preloaded handle");
            self.silence_active();
            self.swap_active_element();
            self.preload = None;
        } else {
            let active = self.active_mut();
            active.pause();
            active.set_source(url, PreloadHint::Auto);
            active.load();
        }
        let v = self.volume;
        self.active_mut().set_volume(v);
    }

    /// Start or resume the active handle.
    pub fn play(&mut self) -> Result<(), HandleError> {
        if self.disposed {
            return Ok(());
        }
        self.ended_reported = false;
        self.active_mut()
            .play()
            .inspect_err(|e| warn!("Playback rejected: {}", e))
    }

    /// Pause. A fade in flight is cancelled first.
    pub fn pause(&mut self) {
        if self.ramp.is_some() {
            self.stop_crossfade();
        }
        self.active_mut().pause();
    }

    /// Seek the active handle. A fade in flight is cancelled first.
    pub fn seek(&mut self, position: Duration) {
        if self.ramp.is_some() {
            self.stop_crossfade();
        }
        self.ended_reported = false;
        self.active_mut().seek(position);
    }

    // ------------------------------------------------------------------
    // Preload / crossfade
    // ------------------------------------------------------------------

    /// Prepare `url` on the inactive handle. Calling again with the same
    /// URL is a no-op.
    pub fn preload(&mut self, url: &str) {
        if self.disposed {
            return;
        }
        if self.preloaded_url() == Some(url) {
            return;
        }
        if self.ramp.is_some() {
            debug!(url, "preload ignored while crossfading");
            return;
        }

        let strategy = self.network.preload_strategy();
        let hint = match strategy {
            PreloadStrategy::SourceOnly => PreloadHint::None,
            PreloadStrategy::MetadataOnly => PreloadHint::Metadata,
            PreloadStrategy::Full => PreloadHint::Auto,
        };
        debug!(url, network = %self.network, ?hint, "preloading next track");

        let inactive = self.inactive_mut();
        inactive.pause();
        inactive.set_volume(0.0);
        inactive.set_source(url, hint);
        if strategy != PreloadStrategy::SourceOnly {
            inactive.load();
        }
        self.preload = Some(url.to_string());
    }

    /// Drop the preload marker (e.g. the upcoming track changed to nothing).
    pub fn clear_preload(&mut self) {
        if self.ramp.is_none() {
            self.preload = None;
        }
    }

    /// Time check, run on the poll interval.
    pub fn poll(&mut self, now: Instant) -> Vec<EngineEvent> {
        if self.disposed || self.ramp.is_some() {
            return Vec::new();
        }

        let active = self.active_handle();
        let ended = active.has_ended();
        if active.is_paused() && !ended {
            return Vec::new();
        }

        if self.settings.enabled
            && self.preload.is_some()
            && !ended
            && active
                .remaining()
                .is_some_and(|left| left <= self.settings.duration)
        {
            return self.start_crossfade(now);
        }

        if ended {
            if self.preload.is_some() {
                return self.hard_cut();
            }
            if !self.ended_reported {
                self.ended_reported = true;
                return vec![EngineEvent::ActiveEnded];
            }
        }
        Vec::new()
    }

    /// Begin the transition to the preloaded track.
    ///
    /// Falls back to a hard cut when the inactive handle has less than the
    /// minimum buffered.
    pub fn start_crossfade(&mut self, now: Instant) -> Vec<EngineEvent> {
        if self.disposed || self.ramp.is_some() || self.preload.is_none() {
            return Vec::new();
        }

        let buffered = self.inactive_handle().buffered_end();
        if buffered < self.settings.min_buffered {
            info!(
                buffered_ms = buffered.as_millis() as u64,
                "next track under-buffered, hard cut"
            );
            return self.hard_cut();
        }

        let from = self.state.active;
        let to = from.other();
        let inactive = self.inactive_mut();
        inactive.set_volume(0.0);
        if let Err(error) = inactive.play() {
            warn!("Crossfade target refused to play: {}", error);
            self.silence_active();
            let mut events = vec![EngineEvent::PlaybackRejected { slot: to, error }];
            events.extend(self.finish_transition(true));
            return events;
        }

        info!(?from, ?to, "crossfade started");
        self.ramp = Some(Ramp {
            started: now,
            last_progress: 0.0,
        });
        self.state.is_crossfading = true;
        self.state.progress = 0.0;
        vec![EngineEvent::CrossfadeStarted { from, to }]
    }

    /// Per-frame ramp step.
    pub fn advance_ramp(&mut self, now: Instant) -> Vec<EngineEvent> {
        let Some(mut ramp) = self.ramp else {
            return Vec::new();
        };

        let elapsed = now.saturating_duration_since(ramp.started);
        let progress = if self.settings.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.settings.duration.as_secs_f32()).min(1.0)
        }
        .max(ramp.last_progress);

        ramp.last_progress = progress;
        self.ramp = Some(ramp);
        self.state.progress = progress;
        self.apply_ramp_volumes(progress);

        if progress >= 1.0 {
            self.finish_transition(false)
        } else {
            Vec::new()
        }
    }

    /// Cancel a fade in flight: active back to baseline, inactive silent
    /// and paused, preload cleared.
    pub fn stop_crossfade(&mut self) {
        if self.ramp.take().is_some() {
            info!(progress = self.state.progress, "crossfade cancelled");
        }
        let v = self.volume;
        self.active_mut().set_volume(v);
        let inactive = self.inactive_mut();
        inactive.set_volume(0.0);
        inactive.pause();
        self.preload = None;
        self.state.is_crossfading = false;
        self.state.progress = 0.0;
    }

    /// Toggle which handle is active. No audio side effects.
    pub fn swap_active_element(&mut self) {
        self.state.active = self.state.active.other();
    }

    /// Wire both handles into `graph`, reusing existing nodes.
    pub fn attach_graph(&mut self, graph: &mut dyn AudioGraph) -> Result<[NodeId; 2], GraphError> {
        let a = self.registry.attach(graph, self.handles[0].id())?;
        let b = self.registry.attach(graph, self.handles[1].id())?;
        Ok([a, b])
    }

    /// Stop everything and cancel both timers. The engine is inert afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.ramp = None;
        self.preload = None;
        self.state.is_crossfading = false;
        self.state.progress = 0.0;
        for handle in &mut self.handles {
            handle.pause();
            if let Some(node) = self.registry.release(handle.id()) {
                debug!(handle = %handle.id(), ?node, "released graph node");
            }
        }
        self.disposed = true;
        debug!("crossfade engine disposed");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_ramp_volumes(&mut self, progress: f32) {
        let v = self.volume;
        self.active_mut().set_volume(v * (1.0 - progress));
        self.inactive_mut().set_volume(v * progress);
    }

    /// Pause, rewind and mute the active handle.
    fn silence_active(&mut self) {
        let active = self.active_mut();
        active.pause();
        active.seek(Duration::ZERO);
        active.set_volume(0.0);
    }

    /// Immediate switch to the preloaded handle at full volume.
    fn hard_cut(&mut self) -> Vec<EngineEvent> {
        let to = self.state.active.other();
        let v = self.volume;
        self.silence_active();

        let inactive = self.inactive_mut();
        inactive.set_volume(v);
        let mut events = Vec::new();
        if let Err(error) = inactive.play() {
            warn!("Hard cut target refused to play: {}", error);
            events.push(EngineEvent::PlaybackRejected { slot: to, error });
        }
        events.extend(self.finish_transition(true));
        events
    }

    /// Swap roles and reset to the non-crossfading state.
    fn finish_transition(&mut self, hard_cut: bool) -> Vec<EngineEvent> {
        if !hard_cut {
            self.silence_active();
        }
        self.swap_active_element();
        let v = self.volume;
        self.active_mut().set_volume(v);

        self.ramp = None;
        self.preload = None;
        self.ended_reported = false;
        self.state.is_crossfading = false;
        self.state.progress = 0.0;

        info!(active = ?self.state.active, hard_cut, "track transition complete");
        vec![EngineEvent::TransitionComplete {
            hard_cut,
            active: self.state.active,
        }]
    }
}

impl<H: PlaybackHandle> Drop for CrossfadeEngine<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
