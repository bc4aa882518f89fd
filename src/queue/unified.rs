//! The queue aggregate root.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::groups::{AlbumGroups, compute_album_groups};
use super::ids::QueueId;
use super::item::QueueItem;

/// Repeat mode for the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Repeat entire queue
    All,
    /// Repeat current track
    One,
}

impl RepeatMode {
    /// Next mode in the off → all → one cycle.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Ways a queue can break its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("cursor {cursor} is out of range for {len} items")]
    CursorOutOfRange { cursor: i32, len: usize },

    #[error("duplicate queue id {0}")]
    DuplicateQueueId(QueueId),
}

/// The play queue with cursor tracking.
///
/// Only the reducer mutates a queue; everything here is read access plus
/// the validated constructor used for rehydration.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedQueue {
    pub(crate) items: Vec<QueueItem>,
    /// Index of the active item (-1 = nothing selected)
    pub(crate) cursor: i32,
    pub(crate) repeat: RepeatMode,
}

impl Default for UnifiedQueue {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: -1,
            repeat: RepeatMode::Off,
        }
    }
}

impl UnifiedQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from raw parts, checking every invariant.
    pub fn from_parts(
        items: Vec<QueueItem>,
        cursor: i32,
        repeat: RepeatMode,
    ) -> Result<Self, InvariantViolation> {
        let queue = Self {
            items,
            cursor,
            repeat,
        };
        queue.validate()?;
        Ok(queue)
    }

    /// Check the cursor range and queue id uniqueness.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let len = self.items.len();
        if self.cursor < -1 || (self.cursor >= 0 && self.cursor as usize >= len) {
            return Err(InvariantViolation::CursorOutOfRange {
                cursor: self.cursor,
                len,
            });
        }

        let mut seen = HashSet::with_capacity(len);
        for item in &self.items {
            if !seen.insert(&item.queue_id) {
                return Err(InvariantViolation::DuplicateQueueId(item.queue_id.clone()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// All items in playback order.
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Raw cursor (-1 when nothing is selected).
    pub fn cursor_index(&self) -> i32 {
        self.cursor
    }

    /// Cursor as an index, if one is selected.
    pub fn current_index(&self) -> Option<usize> {
        if self.cursor >= 0 && (self.cursor as usize) < self.items.len() {
            Some(self.cursor as usize)
        } else {
            None
        }
    }

    /// The active item.
    pub fn current(&self) -> Option<&QueueItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Position of the item with `queue_id`.
    pub fn index_of(&self, queue_id: &QueueId) -> Option<usize> {
        self.items.iter().position(|i| &i.queue_id == queue_id)
    }

    pub fn get(&self, queue_id: &QueueId) -> Option<&QueueItem> {
        self.items.iter().find(|i| &i.queue_id == queue_id)
    }

    /// Count of items after the cursor.
    pub fn remaining_count(&self) -> usize {
        match self.current_index() {
            Some(i) => self.items.len() - i - 1,
            None => self.items.len(),
        }
    }

    /// Index that advancing would land on, honouring the repeat mode.
    ///
    /// Under `RepeatMode::One` this is the current item.
    pub fn upcoming_index(&self) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let Some(current) = self.current_index() else {
            return Some(0);
        };
        match self.repeat {
            RepeatMode::One => Some(current),
            RepeatMode::All => Some((current + 1) % self.items.len()),
            RepeatMode::Off => (current + 1 < self.items.len()).then_some(current + 1),
        }
    }

    /// The item advancing would land on.
    pub fn upcoming(&self) -> Option<&QueueItem> {
        self.upcoming_index().and_then(|i| self.items.get(i))
    }

    /// Album groups over the current items.
    pub fn album_groups(&self) -> AlbumGroups<'_> {
        compute_album_groups(&self.items)
    }
}
