//! Test utilities and fixtures for encore tests.
//!
//! This module provides mock factories for songs, albums and queue items so
//! tests don't repeat record boilerplate.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{mock_album, queue_of};
//!
//! let album = mock_album("gd77", 5);
//! let queue = queue_of(album_to_queue_items(&album));
//! ```

use crate::model::{
    Album, AlbumRef, ArtistRef, RecordingInfo, SourceType, Song, StreamQuality, StreamSource,
};
use crate::queue::{QueueItem, UnifiedQueue};

/// Creates a mock artist reference.
pub fn mock_artist() -> ArtistRef {
    ArtistRef {
        id: "artist-1".to_string(),
        name: "Test Artist".to_string(),
        slug: "test-artist".to_string(),
    }
}

/// Creates a mock Song with sensible defaults.
///
/// The stream URL is derived from the id so every song is distinguishable
/// by URL. Customize with struct update syntax:
///
/// ```ignore
/// let long = Song { duration_secs: 900.0, ..mock_song("s1", "Dark Star") };
/// ```
pub fn mock_song(id: &str, title: &str) -> Song {
    Song {
        id: id.to_string(),
        title: title.to_string(),
        artist: mock_artist(),
        album: AlbumRef {
            id: "album-1".to_string(),
            title: "Test Album".to_string(),
        },
        duration_secs: 180.0,
        streams: vec![StreamSource {
            quality: StreamQuality::High,
            url: format!("https://cdn.example/{id}.mp3"),
        }],
        recording: None,
        artwork_url: None,
    }
}

/// Creates a mock Song carrying recording metadata, for version selection tests.
pub fn mock_version(id: &str, source: SourceType, rating: Option<f32>, downloads: u64) -> Song {
    Song {
        recording: Some(RecordingInfo {
            source_type: Some(source),
            rating,
            downloads,
            ..Default::default()
        }),
        ..mock_song(id, "Scarlet Begonias")
    }
}

/// Creates a mock Album with `tracks` songs, ids `{id}-t{n}`.
pub fn mock_album(id: &str, tracks: usize) -> Album {
    let album_ref = AlbumRef {
        id: id.to_string(),
        title: format!("Album {id}"),
    };
    Album {
        id: id.to_string(),
        title: album_ref.title.clone(),
        artist: mock_artist(),
        venue: Some("Barton Hall".to_string()),
        date: None,
        artwork_url: Some(format!("https://cdn.example/{id}.jpg")),
        tracks: (0..tracks)
            .map(|n| Song {
                album: album_ref.clone(),
                ..mock_song(&format!("{id}-t{n}"), &format!("Track {n}"))
            })
            .collect(),
    }
}

/// Builds a queue holding `items` with nothing selected.
pub fn queue_of(items: Vec<QueueItem>) -> UnifiedQueue {
    crate::queue::reduce(
        UnifiedQueue::new(),
        crate::queue::QueueAction::AddItems {
            items,
            position: None,
        },
    )
}

/// Queue ids of `queue` in order, for compact assertions.
pub fn ids(queue: &UnifiedQueue) -> Vec<String> {
    queue
        .items()
        .iter()
        .map(|i| i.queue_id.as_str().to_string())
        .collect()
}
