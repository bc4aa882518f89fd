//! Streaming statistics: how much of the active track is buffered and what
//! the network looks like, sampled at a bounded rate.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::handle::PlaybackHandle;
use super::network::{NetworkClass, NetworkProbe};

/// One reading of buffer and network state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingStats {
    /// Buffered share of the duration (0 - 100)
    pub buffered_percent: f32,
    /// Seconds buffered past the playhead
    pub buffered_ahead_secs: f32,
    pub network: NetworkClass,
    pub downlink_mbps: Option<f64>,
    pub is_loading: bool,
}

impl StreamingStats {
    /// Read the current state. Pure.
    pub fn measure<H, N>(handle: &H, probe: &N) -> Self
    where
        H: PlaybackHandle + ?Sized,
        N: NetworkProbe + ?Sized,
    {
        let buffered_percent = match handle.duration() {
            Some(d) if !d.is_zero() => {
                (handle.buffered_end().as_secs_f32() / d.as_secs_f32() * 100.0).min(100.0)
            }
            _ => 0.0,
        };
        Self {
            buffered_percent,
            buffered_ahead_secs: handle.buffered_ahead().as_secs_f32(),
            network: probe.classify(),
            downlink_mbps: probe.downlink_mbps(),
            is_loading: handle.is_loading(),
        }
    }
}

/// Sampling rate and the minimum changes worth reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsThresholds {
    pub sample_interval: Duration,
    pub buffered_percent: f32,
    pub buffered_ahead_secs: f32,
    pub downlink_mbps: f64,
}

impl Default for StatsThresholds {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(250),
            buffered_percent: 1.0,
            buffered_ahead_secs: 0.5,
            downlink_mbps: 0.25,
        }
    }
}

impl StatsThresholds {
    /// Whether `next` differs enough from `prev` to report.
    fn significant(&self, prev: &StreamingStats, next: &StreamingStats) -> bool {
        let downlink_moved = match (prev.downlink_mbps, next.downlink_mbps) {
            (Some(a), Some(b)) => (a - b).abs() >= self.downlink_mbps,
            (None, None) => false,
            _ => true,
        };
        prev.network != next.network
            || prev.is_loading != next.is_loading
            || (prev.buffered_percent - next.buffered_percent).abs() >= self.buffered_percent
            || (prev.buffered_ahead_secs - next.buffered_ahead_secs).abs() >= self.buffered_ahead_secs
            || downlink_moved
    }
}

/// Rate-limited, change-filtered sampler.
#[derive(Debug, Default)]
pub struct StreamingStatsMonitor {
    thresholds: StatsThresholds,
    last_sample: Option<Instant>,
    reported: Option<StreamingStats>,
}

impl StreamingStatsMonitor {
    pub fn new(thresholds: StatsThresholds) -> Self {
        Self {
            thresholds,
            last_sample: None,
            reported: None,
        }
    }

    pub fn thresholds(&self) -> &StatsThresholds {
        &self.thresholds
    }

    /// Sample if the interval has elapsed. Returns a snapshot only when it
    /// differs meaningfully from the last one reported.
    pub fn sample<H, N>(&mut self, now: Instant, handle: &H, probe: &N) -> Option<StreamingStats>
    where
        H: PlaybackHandle + ?Sized,
        N: NetworkProbe + ?Sized,
    {
        let interval = self.thresholds.sample_interval;
        if self
            .last_sample
            .is_some_and(|last| now.saturating_duration_since(last) < interval)
        {
            return None;
        }
        self.last_sample = Some(now);

        let next = StreamingStats::measure(handle, probe);
        let report = match &self.reported {
            Some(prev) => self.thresholds.significant(prev, &next),
            None => true,
        };
        if report {
            self.reported = Some(next.clone());
            Some(next)
        } else {
            None
        }
    }

    /// Last reported snapshot.
    pub fn snapshot(&self) -> Option<&StreamingStats> {
        self.reported.as_ref()
    }

    /// Forget history so the next sample always reports (e.g. new track).
    pub fn reset(&mut self) {
        self.last_sample = None;
        self.reported = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::handle::{HandleId, PreloadHint};
    use crate::player::network::StaticNetwork;
    use crate::player::sim::{SimClock, SimulatedHandle};

    fn playing(clock: &SimClock, rate: f64) -> SimulatedHandle {
        let mut h = SimulatedHandle::new(HandleId(0), clock.clone()).with_download_rate(rate);
        h.set_source("https://cdn.example/x.mp3", PreloadHint::Auto);
        h.load();
        h
    }

    #[test]
    fn test_measure() {
        let clock = SimClock::new();
        let h = playing(&clock, 10.0);
        clock.advance(Duration::from_secs(9));

        let probe = StaticNetwork::new(NetworkClass::FourG, Some(8.0));
        let stats = StreamingStats::measure(&h, &probe);
        // 90s of the default 180s source
        assert!((stats.buffered_percent - 50.0).abs() < 0.01);
        assert!((stats.buffered_ahead_secs - 90.0).abs() < 0.01);
        assert_eq!(stats.network, NetworkClass::FourG);
        assert_eq!(stats.downlink_mbps, Some(8.0));
        assert!(stats.is_loading);
    }

    #[test]
    fn test_unknown_duration_reads_zero_percent() {
        let clock = SimClock::new();
        let mut h = SimulatedHandle::new(HandleId(0), clock.clone());
        h.set_source("https://cdn.example/x.mp3", PreloadHint::None);
        let stats = StreamingStats::measure(&h, &StaticNetwork::default());
        assert_eq!(stats.buffered_percent, 0.0);
    }

    #[test]
    fn test_rate_limited() {
        let clock = SimClock::new();
        let h = playing(&clock, 10.0);
        let probe = StaticNetwork::default();
        let mut monitor = StreamingStatsMonitor::default();

        assert!(monitor.sample(clock.now(), &h, &probe).is_some());
        clock.advance(Duration::from_millis(100));
        // Buffer moved a full second but the interval hasn't elapsed
        assert!(monitor.sample(clock.now(), &h, &probe).is_none());
        clock.advance(Duration::from_millis(150));
        assert!(monitor.sample(clock.now(), &h, &probe).is_some());
    }

    #[test]
    fn test_small_changes_suppressed() {
        let clock = SimClock::new();
        // 1s of audio per 10s: 0.25s per sample interval
        let h = playing(&clock, 0.1);
        let probe = StaticNetwork::new(NetworkClass::ThreeG, Some(0.5));
        let mut monitor = StreamingStatsMonitor::default();

        clock.advance(Duration::from_secs(1));
        assert!(monitor.sample(clock.now(), &h, &probe).is_some());
        clock.advance(Duration::from_millis(250));
        assert!(monitor.sample(clock.now(), &h, &probe).is_none());
        assert!(monitor.snapshot().is_some());
    }

    #[test]
    fn test_network_change_reported() {
        let clock = SimClock::new();
        let h = playing(&clock, 0.0);
        let mut monitor = StreamingStatsMonitor::default();

        monitor.sample(clock.now(), &h, &StaticNetwork::new(NetworkClass::FourG, Some(10.0)));
        clock.advance(Duration::from_millis(300));
        let stats = monitor
            .sample(clock.now(), &h, &StaticNetwork::new(NetworkClass::TwoG, Some(10.0)))
            .unwrap();
        assert_eq!(stats.network, NetworkClass::TwoG);

        clock.advance(Duration::from_millis(300));
        let stats = monitor
            .sample(clock.now(), &h, &StaticNetwork::new(NetworkClass::TwoG, Some(10.3)))
            .unwrap();
        assert_eq!(stats.downlink_mbps, Some(10.3));
    }

    #[test]
    fn test_reset() {
        let clock = SimClock::new();
        let h = playing(&clock, 0.0);
        let probe = StaticNetwork::default();
        let mut monitor = StreamingStatsMonitor::default();
        monitor.sample(clock.now(), &h, &probe);
        monitor.reset();
        assert!(monitor.snapshot().is_none());
        assert!(monitor.sample(clock.now(), &h, &probe).is_some());
    }
}
