//! Queue items and the constructors that wrap songs/albums into them.

use serde::{Deserialize, Serialize};

use super::ids::{BatchId, QueueId, generate_batch_id, generate_queue_id};
use crate::model::{Album, Song};

/// Where an item came from when it was added as part of an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumSource {
    pub album_id: String,
    /// Position of the track on the album (0-based)
    pub original_track_index: usize,
    pub batch_id: BatchId,
}

/// A single entry in the play queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub queue_id: QueueId,
    pub song: Song,
    /// Display title (may differ from the song title, e.g. setlist naming)
    pub track_title: String,
    #[serde(default)]
    pub album_source: Option<AlbumSource>,
}

impl QueueItem {
    /// Batch id, if the item was added as part of an album.
    pub fn batch_id(&self) -> Option<&BatchId> {
        self.album_source.as_ref().map(|s| &s.batch_id)
    }
}

/// Wrap a single song into a queue item with no album source.
pub fn track_to_queue_item(song: &Song) -> QueueItem {
    QueueItem {
        queue_id: generate_queue_id(),
        song: song.clone(),
        track_title: song.title.clone(),
        album_source: None,
    }
}

/// Expand an album into queue items sharing one fresh batch id.
pub fn album_to_queue_items(album: &Album) -> Vec<QueueItem> {
    let batch_id = generate_batch_id();
    album
        .tracks
        .iter()
        .enumerate()
        .map(|(index, song)| QueueItem {
            queue_id: generate_queue_id(),
            song: song.clone(),
            track_title: song.title.clone(),
            album_source: Some(AlbumSource {
                album_id: album.id.clone(),
                original_track_index: index,
                batch_id: batch_id.clone(),
            }),
        })
        .collect()
}
