//! Simulated playback run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::model::{Album, AlbumRef, ArtistRef, Song, StreamQuality, StreamSource};
use crate::player::{
    Catalog, CrossfadeEngine, EngineEvent, FRAME_INTERVAL, HandleId, NetworkClass,
    PlaybackOrchestrator, PlaybackStatus, SimClock, SimulatedHandle, StaticNetwork,
    format_duration,
};
use crate::queue::{QueueAction, QueueStore, RepeatMode, album_to_queue_items};
use crate::telemetry::ChannelSink;

/// Options for `encore simulate`.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub tracks: usize,
    pub track_secs: u64,
    pub crossfade_secs: Option<f32>,
    pub crossfade_disabled: bool,
    pub network: NetworkClass,
    pub download_rate: f64,
    pub repeat: RepeatMode,
    pub autoplay_blocked: bool,
    pub max_secs: Option<u64>,
}

/// Generated album used by the simulation.
fn demo_album(tracks: usize, track_secs: u64) -> Album {
    let artist = ArtistRef {
        id: "sim-artist".to_string(),
        name: "Simulated Band".to_string(),
        slug: "simulated-band".to_string(),
    };
    let album = AlbumRef {
        id: "sim-album".to_string(),
        title: "Live at the Virtual Clock".to_string(),
    };
    Album {
        id: album.id.clone(),
        title: album.title.clone(),
        artist: artist.clone(),
        venue: Some("Loopback Arena".to_string()),
        date: None,
        artwork_url: None,
        tracks: (1..=tracks)
            .map(|n| Song {
                id: format!("sim-{n}"),
                title: format!("Jam {n}"),
                artist: artist.clone(),
                album: album.clone(),
                duration_secs: track_secs as f64,
                streams: vec![StreamSource {
                    quality: StreamQuality::High,
                    url: format!("sim://tracks/{n}.mp3"),
                }],
                recording: None,
                artwork_url: None,
            })
            .collect(),
    }
}

/// Run the player over a generated album and print every transition.
pub fn cmd_simulate(config: &Config, options: &SimulateOptions) -> anyhow::Result<()> {
    if options.tracks == 0 || options.track_secs == 0 {
        anyhow::bail!("need at least one track of non-zero length");
    }

    let album = demo_album(options.tracks, options.track_secs);
    let quality = config.playback.stream_quality;
    let catalog: Catalog = Arc::new(
        album
            .tracks
            .iter()
            .filter_map(|s| s.stream_url(quality).map(|url| (url.to_string(), s.duration())))
            .collect::<HashMap<_, _>>(),
    );

    let mut settings = config.playback.crossfade_settings();
    if let Some(secs) = options.crossfade_secs {
        settings.duration = Duration::try_from_secs_f32(secs)
            .map_err(|_| anyhow::anyhow!("invalid crossfade length: {secs}"))?;
    }
    if options.crossfade_disabled {
        settings.enabled = false;
    }
    let poll_interval = settings.poll_interval;

    let clock = SimClock::new();
    let handle = |id| {
        let h = SimulatedHandle::new(HandleId(id), clock.clone())
            .with_catalog(Arc::clone(&catalog))
            .with_download_rate(options.download_rate);
        if options.autoplay_blocked {
            h.rejecting_play()
        } else {
            h
        }
    };
    let engine = CrossfadeEngine::new(handle(0), handle(1), settings.clone());

    let (sink, telemetry) = ChannelSink::bounded(256);
    let mut player = PlaybackOrchestrator::new(QueueStore::default(), engine)
        .with_settings(config.playback.orchestrator_settings())
        .with_stats(config.streaming.thresholds())
        .with_network(Box::new(StaticNetwork::new(options.network, None)))
        .with_telemetry(Box::new(sink));

    println!(
        "Simulating {} x {} tracks, crossfade {}, network {}, repeat {:?}",
        options.tracks,
        format_duration(Duration::from_secs(options.track_secs)),
        if settings.enabled {
            format!("{:.1}s", settings.duration.as_secs_f32())
        } else {
            "off".to_string()
        },
        options.network,
        options.repeat,
    );

    player.set_volume(config.playback.volume);
    player.dispatch(QueueAction::ReplaceQueue {
        items: album_to_queue_items(&album),
        start_index: Some(0),
    });
    player.dispatch(QueueAction::SetRepeat(options.repeat));
    player.play();
    print_now_playing(&clock, &player);

    if let Some(error) = player.playback_error() {
        println!("Playback failed to start: {}", error);
    } else {
        let limit = Duration::from_secs(
            options
                .max_secs
                .unwrap_or(options.track_secs * options.tracks as u64 + 5),
        );
        run_loop(&clock, &mut player, poll_interval, limit);
    }

    player.dispose();
    println!();
    println!("Telemetry:");
    for event in telemetry.try_iter() {
        println!("  {:<15} {}", event.name(), serde_json::to_string(&event)?);
    }
    Ok(())
}

fn run_loop(
    clock: &SimClock,
    player: &mut PlaybackOrchestrator<SimulatedHandle>,
    poll_interval: Duration,
    limit: Duration,
) {
    let mut since_poll = Duration::ZERO;
    while clock.elapsed() < limit {
        clock.advance(FRAME_INTERVAL);
        since_poll += FRAME_INTERVAL;

        let mut events = Vec::new();
        if player.timers().ramp {
            events.extend(player.on_frame(clock.now()));
        }
        if since_poll >= poll_interval {
            since_poll = Duration::ZERO;
            events.extend(player.on_poll(clock.now()));
            if let Some(stats) = player.sample_stats(clock.now()) {
                tracing::debug!(?stats, "streaming stats");
            }
        }

        for event in &events {
            print_event(clock, player, event);
        }
        if player.status() == PlaybackStatus::Stopped {
            println!("[{}] queue finished", stamp(clock));
            return;
        }
    }
    println!("[{}] time limit reached", stamp(clock));
}

fn stamp(clock: &SimClock) -> String {
    let elapsed = clock.elapsed();
    format!(
        "{}.{:03}",
        format_duration(elapsed),
        elapsed.subsec_millis()
    )
}

fn print_event(
    clock: &SimClock,
    player: &PlaybackOrchestrator<SimulatedHandle>,
    event: &EngineEvent,
) {
    match event {
        EngineEvent::CrossfadeStarted { from, to } => {
            println!("[{}] crossfade {:?} -> {:?}", stamp(clock), from, to);
        }
        EngineEvent::TransitionComplete { hard_cut, active } => {
            let kind = if *hard_cut { "hard cut" } else { "crossfade done" };
            println!("[{}] {} (active handle {:?})", stamp(clock), kind, active);
            print_now_playing(clock, player);
        }
        EngineEvent::ActiveEnded => {
            println!("[{}] track ended", stamp(clock));
            print_now_playing(clock, player);
        }
        EngineEvent::PlaybackRejected { slot, error } => {
            println!("[{}] handle {:?} rejected play: {}", stamp(clock), slot, error);
        }
    }
}

fn print_now_playing(clock: &SimClock, player: &PlaybackOrchestrator<SimulatedHandle>) {
    let snap = player.snapshot();
    match &snap.track {
        Some(track) => println!(
            "[{}] #{} {} - {} [{:?}] at {}",
            stamp(clock),
            snap.cursor + 1,
            track.artist,
            track.title,
            snap.status,
            snap.position_str()
        ),
        None => println!("[{}] nothing playing", stamp(clock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SimulateOptions {
        SimulateOptions {
            tracks: 2,
            track_secs: 12,
            crossfade_secs: Some(2.0),
            crossfade_disabled: false,
            network: NetworkClass::FourG,
            download_rate: 20.0,
            repeat: RepeatMode::Off,
            autoplay_blocked: false,
            max_secs: None,
        }
    }

    #[test]
    fn test_demo_album() {
        let album = demo_album(3, 42);
        assert_eq!(album.tracks.len(), 3);
        assert_eq!(album.tracks[2].title, "Jam 3");
        assert_eq!(album.tracks[0].duration(), Duration::from_secs(42));
        assert_eq!(
            album.tracks[1].stream_url(StreamQuality::Lossless),
            Some("sim://tracks/2.mp3")
        );
    }

    #[test]
    fn test_simulation_runs() {
        cmd_simulate(&Config::default(), &options()).unwrap();
    }

    #[test]
    fn test_blocked_autoplay_is_not_an_error() {
        let opts = SimulateOptions {
            autoplay_blocked: true,
            ..options()
        };
        cmd_simulate(&Config::default(), &opts).unwrap();
    }

    #[test]
    fn test_rejects_empty_album() {
        let opts = SimulateOptions {
            tracks: 0,
            ..options()
        };
        assert!(cmd_simulate(&Config::default(), &opts).is_err());
    }
}
