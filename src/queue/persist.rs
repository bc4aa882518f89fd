//! Queue persistence through an external key-value store.
//!
//! The queue is saved as a JSON [`QueueSnapshot`] under a stable key
//! ([`QUEUE_STATE_KEY`]). Loading validates the snapshot against the queue
//! invariants; anything corrupt or stale is discarded in favour of an empty
//! queue so a bad file can never take playback down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::item::QueueItem;
use super::unified::{InvariantViolation, RepeatMode, UnifiedQueue};

/// Key the queue is stored under.
pub const QUEUE_STATE_KEY: &str = "queue-state";

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("IO error on {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Malformed queue snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Corrupt queue state: {0}")]
    Corrupt(#[from] InvariantViolation),
}

/// Minimal key-value storage the queue persists into.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// In-memory store, for tests and sessions without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the OS data directory (e.g. ~/.local/share/encore).
    pub fn default_location() -> Result<Self, PersistError> {
        dirs::data_dir()
            .map(|d| Self::new(d.join("encore")))
            .ok_or(PersistError::NoDataDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Io(path, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PersistError::Io(self.dir.clone(), e))?;

        // Write atomically (write to temp, then rename)
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, value).map_err(|e| PersistError::Io(temp_path.clone(), e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| PersistError::Io(path, e))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::Io(path, e)),
        }
    }
}

/// Serialized form of a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub version: u32,
    pub items: Vec<QueueItem>,
    pub cursor_index: i32,
    #[serde(default)]
    pub repeat: RepeatMode,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl From<&UnifiedQueue> for QueueSnapshot {
    fn from(queue: &UnifiedQueue) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            items: queue.items().to_vec(),
            cursor_index: queue.cursor_index(),
            repeat: queue.repeat(),
            saved_at: Some(Utc::now()),
        }
    }
}

impl QueueSnapshot {
    /// Turn the snapshot back into a queue, checking every invariant.
    pub fn into_queue(self) -> Result<UnifiedQueue, PersistError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion(self.version));
        }
        Ok(UnifiedQueue::from_parts(
            self.items,
            self.cursor_index,
            self.repeat,
        )?)
    }
}

/// Save `queue` under `key`.
pub fn save_queue(
    store: &mut dyn KeyValueStore,
    key: &str,
    queue: &UnifiedQueue,
) -> Result<(), PersistError> {
    let json = serde_json::to_string(&QueueSnapshot::from(queue))?;
    store.set(key, &json)
}

/// Load and validate the queue under `key`; `Ok(None)` if nothing is stored.
pub fn try_load_queue(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<UnifiedQueue>, PersistError> {
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    let snapshot: QueueSnapshot = serde_json::from_str(&json)?;
    snapshot.into_queue().map(Some)
}

/// Load the queue under `key`, falling back to an empty queue.
///
/// Never fails: unreadable, malformed or invariant-violating state is
/// logged and replaced with an empty queue.
pub fn load_queue(store: &dyn KeyValueStore, key: &str) -> UnifiedQueue {
    match try_load_queue(store, key) {
        Ok(Some(queue)) => {
            tracing::info!(items = queue.len(), cursor = queue.cursor_index(), "Restored queue");
            queue
        }
        Ok(None) => UnifiedQueue::new(),
        Err(e) => {
            tracing::warn!("Discarding persisted queue: {}", e);
            UnifiedQueue::new()
        }
    }
}
