//! Runs a [`PlaybackOrchestrator`] on a tokio task.
//!
//! The task owns the orchestrator outright and multiplexes the command
//! channel with three intervals: the engine poll, the ramp frame (only while
//! a crossfade is in flight) and the stats sampler. After every wake-up it
//! publishes a [`PlayerSnapshot`] for readers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::handle::PlaybackHandle;
use super::orchestrator::PlaybackOrchestrator;
use super::state::{PlayerCommand, PlayerSnapshot};

/// Ramp frame interval (~60 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("engine driver has shut down")]
    Closed,

    #[error("engine driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running driver task.
pub struct EngineDriver {
    commands: mpsc::Sender<PlayerCommand>,
    state: Arc<RwLock<PlayerSnapshot>>,
    task: JoinHandle<()>,
}

impl EngineDriver {
    /// Spawn the driver on the current runtime. `now` supplies the instant
    /// passed to the engine on each tick.
    pub fn spawn<H, F>(orchestrator: PlaybackOrchestrator<H>, now: F) -> Self
    where
        H: PlaybackHandle + Send + 'static,
        F: Fn() -> Instant + Send + 'static,
    {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let state = Arc::new(RwLock::new(orchestrator.snapshot()));
        let task = tokio::spawn(run(orchestrator, rx, Arc::clone(&state), now));
        Self {
            commands,
            state,
            task,
        }
    }

    /// Queue a command for the driver.
    pub async fn send(&self, command: PlayerCommand) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Closed)
    }

    /// A sender for other tasks (UI, media session bridge).
    pub fn commands(&self) -> mpsc::Sender<PlayerCommand> {
        self.commands.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.read().clone()
    }

    /// Shared snapshot slot, for readers that poll it themselves.
    pub fn shared_state(&self) -> Arc<RwLock<PlayerSnapshot>> {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the task and wait for it to dispose the engine.
    pub async fn shutdown(self) -> Result<(), DriverError> {
        // Already closed is fine; the task is finishing either way
        let _ = self.commands.send(PlayerCommand::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}

async fn run<H, F>(
    mut player: PlaybackOrchestrator<H>,
    mut rx: mpsc::Receiver<PlayerCommand>,
    state: Arc<RwLock<PlayerSnapshot>>,
    now: F,
) where
    H: PlaybackHandle,
    F: Fn() -> Instant,
{
    let mut poll = interval(player.engine().settings().poll_interval);
    let mut frame = interval(FRAME_INTERVAL);
    let mut stats = interval(player.stats_monitor().thresholds().sample_interval);
    for timer in [&mut poll, &mut frame, &mut stats] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }
    info!("engine driver started");

    loop {
        let ramping = player.timers().ramp;
        tokio::select! {
            command = rx.recv() => match command {
                Some(PlayerCommand::Shutdown) | None => break,
                Some(command) => apply(&mut player, command),
            },
            _ = poll.tick() => {
                for event in player.on_poll(now()) {
                    debug!(?event, "engine event");
                }
            }
            _ = frame.tick(), if ramping => {
                for event in player.on_frame(now()) {
                    debug!(?event, "engine event");
                }
            }
            _ = stats.tick() => {
                if let Some(sample) = player.sample_stats(now()) {
                    debug!(
                        buffered = sample.buffered_percent,
                        ahead = sample.buffered_ahead_secs,
                        network = %sample.network,
                        "streaming stats"
                    );
                }
            }
        }
        *state.write() = player.snapshot();
    }

    player.dispose();
    *state.write() = player.snapshot();
    info!("engine driver stopped");
}

fn apply<H: PlaybackHandle>(player: &mut PlaybackOrchestrator<H>, command: PlayerCommand) {
    match command {
        PlayerCommand::Play => player.play(),
        PlayerCommand::Pause => player.pause(),
        PlayerCommand::Toggle => player.toggle(),
        PlayerCommand::Stop => player.stop(),
        PlayerCommand::Next => player.next(),
        PlayerCommand::Previous => player.previous(),
        PlayerCommand::Seek(position) => player.seek(position),
        PlayerCommand::SetVolume(volume) => player.set_volume(volume),
        PlayerCommand::Dispatch(action) => {
            player.dispatch(action);
        }
        PlayerCommand::MediaControl(command) => player.handle_media_command(command),
        PlayerCommand::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::crossfade::{CrossfadeEngine, CrossfadeSettings};
    use crate::player::handle::HandleId;
    use crate::player::sim::{SimClock, SimulatedHandle};
    use crate::player::state::PlaybackStatus;
    use crate::queue::{QueueAction, QueueStore, album_to_queue_items};
    use crate::test_utils::mock_album;

    fn spawn(clock: &SimClock) -> EngineDriver {
        let engine = CrossfadeEngine::new(
            SimulatedHandle::new(HandleId(0), clock.clone()),
            SimulatedHandle::new(HandleId(1), clock.clone()),
            CrossfadeSettings::default(),
        );
        let player = PlaybackOrchestrator::new(QueueStore::default(), engine);
        let clock = clock.clone();
        EngineDriver::spawn(player, move || clock.now())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_update_snapshot() {
        let clock = SimClock::new();
        let driver = spawn(&clock);

        driver
            .send(PlayerCommand::Dispatch(QueueAction::AddItems {
                items: album_to_queue_items(&mock_album("gd77", 3)),
                position: None,
            }))
            .await
            .unwrap();
        driver.send(PlayerCommand::Play).await.unwrap();
        settle().await;

        let snap = driver.snapshot();
        assert_eq!(snap.queue_len, 3);
        assert_eq!(snap.cursor, 0);
        // Nothing buffered yet
        assert_eq!(snap.status, PlaybackStatus::Loading);

        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(driver.snapshot().status, PlaybackStatus::Playing);

        driver.send(PlayerCommand::SetVolume(0.3)).await.unwrap();
        driver.send(PlayerCommand::Pause).await.unwrap();
        settle().await;
        let snap = driver.snapshot();
        assert_eq!(snap.status, PlaybackStatus::Paused);
        assert_eq!(snap.volume, 0.3);

        driver.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_drive_crossfade() {
        let clock = SimClock::new();
        let driver = spawn(&clock);
        driver
            .send(PlayerCommand::Dispatch(QueueAction::AddItems {
                items: album_to_queue_items(&mock_album("gd77", 3)),
                position: None,
            }))
            .await
            .unwrap();
        driver.send(PlayerCommand::Play).await.unwrap();
        settle().await;

        clock.advance(Duration::from_secs(176));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(driver.snapshot().crossfade.is_crossfading);

        clock.advance(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = driver.snapshot();
        assert!(!snap.crossfade.is_crossfading);
        assert_eq!(snap.cursor, 1);
        assert_eq!(snap.status, PlaybackStatus::Playing);

        driver.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_channel() {
        let clock = SimClock::new();
        let driver = spawn(&clock);
        let commands = driver.commands();
        let shared = driver.shared_state();

        driver.shutdown().await.unwrap();
        assert!(commands.send(PlayerCommand::Play).await.is_err());
        assert_eq!(shared.read().status, PlaybackStatus::Stopped);
    }
}
