//! Explicit queue store: dispatch, observers and persistence.

use super::persist::{KeyValueStore, QUEUE_STATE_KEY, save_queue};
use super::reducer::{QueueAction, reduce};
use super::unified::UnifiedQueue;

/// Handle returned by [`QueueStore::subscribe`].
pub type SubscriberId = u64;

type Listener = Box<dyn FnMut(&UnifiedQueue) + Send>;

/// Owns the current queue and applies actions strictly in dispatch order.
pub struct QueueStore {
    state: UnifiedQueue,
    listeners: Vec<(SubscriberId, Listener)>,
    next_subscriber: SubscriberId,
    persistence: Option<Box<dyn KeyValueStore>>,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(UnifiedQueue::new())
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

impl QueueStore {
    pub fn new(initial: UnifiedQueue) -> Self {
        Self {
            state: initial,
            listeners: Vec::new(),
            next_subscriber: 0,
            persistence: None,
        }
    }

    /// Rehydrate from `store` and save every subsequent change back to it.
    pub fn with_persistence(store: Box<dyn KeyValueStore>) -> Self {
        let initial = super::persist::load_queue(store.as_ref(), QUEUE_STATE_KEY);
        Self {
            persistence: Some(store),
            ..Self::new(initial)
        }
    }

    /// Current queue.
    pub fn state(&self) -> &UnifiedQueue {
        &self.state
    }

    /// Apply `action`. Returns true if the queue changed.
    ///
    /// Subscribers are notified and the queue is persisted only on change.
    pub fn dispatch(&mut self, action: QueueAction) -> bool {
        let previous = std::mem::take(&mut self.state);
        let next = reduce(previous.clone(), action);
        let changed = next != previous;
        self.state = next;

        if changed {
            self.persist();
            for (_, listener) in &mut self.listeners {
                listener(&self.state);
            }
        }
        changed
    }

    /// Register a listener called after every change.
    pub fn subscribe(&mut self, listener: impl FnMut(&UnifiedQueue) + Send + 'static) -> SubscriberId {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn persist(&mut self) {
        if let Some(store) = self.persistence.as_deref_mut()
            && let Err(e) = save_queue(store, QUEUE_STATE_KEY, &self.state)
        {
            tracing::warn!("Failed to persist queue: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::persist::{MemoryStore, PersistError, load_queue};
    use crate::queue::{QueueId, RepeatMode, album_to_queue_items};
    use crate::test_utils::mock_album;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_dispatch_in_order() {
        let mut store = QueueStore::default();
        let items = album_to_queue_items(&mock_album("a", 3));
        store.dispatch(QueueAction::AddItems {
            items: items.clone(),
            position: None,
        });
        store.dispatch(QueueAction::PlayFromQueue {
            queue_id: items[2].queue_id.clone(),
        });
        store.dispatch(QueueAction::RemoveItem {
            queue_id: items[0].queue_id.clone(),
        });
        assert_eq!(store.state().cursor_index(), 1);
        assert_eq!(store.state().current().unwrap().queue_id, items[2].queue_id);
    }

    #[test]
    fn test_listeners_only_on_change() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = QueueStore::default();
        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |q| sink.lock().push(q.len()));

        assert!(store.dispatch(QueueAction::AddItems {
            items: album_to_queue_items(&mock_album("a", 2)),
            position: None,
        }));
        // Stale reference: no change, no notification
        assert!(!store.dispatch(QueueAction::RemoveItem {
            queue_id: QueueId::from("gone"),
        }));
        assert_eq!(*seen.lock(), vec![2]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(QueueAction::Clear);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_persists_each_change() {
        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<MemoryStore>>);
        impl KeyValueStore for Shared {
            fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
                self.0.lock().get(key)
            }
            fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
                self.0.lock().set(key, value)
            }
            fn remove(&mut self, key: &str) -> Result<(), PersistError> {
                self.0.lock().remove(key)
            }
        }

        let backing = Shared::default();
        let mut store = QueueStore::with_persistence(Box::new(backing.clone()));
        store.dispatch(QueueAction::AddItems {
            items: album_to_queue_items(&mock_album("a", 2)),
            position: None,
        });
        store.dispatch(QueueAction::SetRepeat(RepeatMode::One));

        let restored = load_queue(&*backing.0.lock(), QUEUE_STATE_KEY);
        assert_eq!(&restored, store.state());

        // A second store rehydrates from the same backing
        let again = QueueStore::with_persistence(Box::new(backing));
        assert_eq!(again.state().repeat(), RepeatMode::One);
        assert_eq!(again.state().len(), 2);
    }
}
