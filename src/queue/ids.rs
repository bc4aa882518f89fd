//! Queue and batch identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide disambiguator so ids minted in the same millisecond differ.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of one queue entry (never the song id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(String);

/// Identifier shared by items added together from one album/source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

macro_rules! id_impls {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_impls!(QueueId);
id_impls!(BatchId);

/// `{prefix}-{millis}-{counter}-{random}`, all hex.
fn mint(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix: u32 = rand::random();
    format!("{prefix}-{millis:x}-{seq:x}-{suffix:08x}")
}

/// Generate a fresh queue id.
///
/// The counter makes ids unique within the process even when the clock
/// doesn't move between calls; the random suffix keeps ids from separate
/// sessions (e.g. a rehydrated queue) from colliding.
pub fn generate_queue_id() -> QueueId {
    QueueId(mint("q"))
}

/// Generate a fresh batch id for a group of items added together.
pub fn generate_batch_id() -> BatchId {
    BatchId(mint("b"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rapid_ids_are_unique() {
        let ids: HashSet<QueueId> = (0..10_000).map(|_| generate_queue_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_prefixes() {
        assert!(generate_queue_id().as_str().starts_with("q-"));
        assert!(generate_batch_id().as_str().starts_with("b-"));
    }

    #[test]
    fn test_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| generate_queue_id()).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn test_serde_transparent() {
        let id = QueueId::from("q-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"q-1\"");
    }
}
