//! Core data models for the concert archive.
//!
//! Defines the records the playback core consumes: [`Song`], [`Album`] and
//! their identity references. These are fetched by the external data layer
//! and deserialized with serde; the core never mutates them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Artist identity attached to songs and albums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    /// URL-safe slug
    pub slug: String,
}

/// Album identity attached to a song.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub title: String,
}

/// Stream quality tier offered by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamQuality {
    Low,
    #[default]
    High,
    Lossless,
}

/// A single stream URL for one quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSource {
    pub quality: StreamQuality,
    pub url: String,
}

/// How a live recording was captured.
///
/// Declaration order doubles as the default preference order used by
/// [`crate::queue::VersionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Soundboard,
    Matrix,
    Audience,
    #[default]
    Unknown,
}

impl SourceType {
    /// Classify a free-form lineage string.
    ///
    /// Matrix is checked first because matrix lineages usually mention the
    /// soundboard and audience feeds they were mixed from.
    pub fn from_lineage(lineage: &str) -> Self {
        let lower = lineage.to_lowercase();
        let has_token = |tokens: &[&str]| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|word| tokens.contains(&word))
        };

        if lower.contains("matrix") || has_token(&["mtx"]) {
            SourceType::Matrix
        } else if lower.contains("soundboard") || has_token(&["sbd"]) {
            SourceType::Soundboard
        } else if lower.contains("audience") || has_token(&["aud"]) {
            SourceType::Audience
        } else {
            SourceType::Unknown
        }
    }

    /// Short badge label.
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Soundboard => "SBD",
            SourceType::Matrix => "MTX",
            SourceType::Audience => "AUD",
            SourceType::Unknown => "?",
        }
    }
}

/// Recording metadata that distinguishes versions of the same song.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingInfo {
    /// Explicit source type; `None` means derive it from `lineage`
    pub source_type: Option<SourceType>,
    /// Average listener rating (0.0 - 10.0)
    pub rating: Option<f32>,
    /// Download count reported by the archive
    pub downloads: u64,
    /// Taper lineage, e.g. "SBD > DAT > CD > FLAC"
    pub lineage: Option<String>,
    /// Date the show was recorded
    pub recorded_on: Option<NaiveDate>,
}

impl RecordingInfo {
    /// Effective source type (explicit, else parsed from lineage).
    pub fn effective_source(&self) -> SourceType {
        self.source_type.unwrap_or_else(|| {
            self.lineage
                .as_deref()
                .map(SourceType::from_lineage)
                .unwrap_or_default()
        })
    }
}

/// The atomic playable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: ArtistRef,
    pub album: AlbumRef,
    /// Duration in seconds
    pub duration_secs: f64,
    #[serde(default)]
    pub streams: Vec<StreamSource>,
    #[serde(default)]
    pub recording: Option<RecordingInfo>,
    #[serde(default)]
    pub artwork_url: Option<String>,
}

impl Song {
    /// Duration as a [`Duration`] (negative or NaN values read as zero).
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_secs).unwrap_or(Duration::ZERO)
    }

    /// Stream URL for the preferred quality, falling back to the first stream.
    pub fn stream_url(&self, preferred: StreamQuality) -> Option<&str> {
        self.streams
            .iter()
            .find(|s| s.quality == preferred)
            .or_else(|| self.streams.first())
            .map(|s| s.url.as_str())
    }

    /// Effective recording source type.
    pub fn source_type(&self) -> SourceType {
        self.recording
            .as_ref()
            .map(RecordingInfo::effective_source)
            .unwrap_or_default()
    }
}

/// An album (one recorded show) with its ordered track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: ArtistRef,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    pub tracks: Vec<Song>,
}
