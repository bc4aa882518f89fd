//! Unified play queue.
//!
//! The queue is a plain value ([`UnifiedQueue`]) that only changes through
//! the pure [`reduce`] function. [`QueueStore`] wraps it with dispatch,
//! change notification and persistence.
//!
//! ```text
//! UI action ──► QueueStore::dispatch ──► reduce(queue, action) ──► new queue
//!                                                   │
//!                                  listeners + KeyValueStore ◄──┘
//! ```

mod groups;
mod ids;
mod item;
pub mod persist;
mod reducer;
mod store;
mod unified;
mod version;

pub use groups::{AlbumGroup, AlbumGroups, GroupKey, compute_album_groups};
pub use ids::{BatchId, QueueId, generate_batch_id, generate_queue_id};
pub use item::{AlbumSource, QueueItem, album_to_queue_items, track_to_queue_item};
pub use persist::{FileStore, KeyValueStore, MemoryStore, PersistError, QUEUE_STATE_KEY};
pub use reducer::{QueueAction, reduce};
pub use store::{QueueStore, SubscriberId};
pub use unified::{InvariantViolation, RepeatMode, UnifiedQueue};
pub use version::{VersionPolicy, get_best_version};
