//! Album grouping, recomputed from the item list on every call.

use smallvec::SmallVec;

use super::ids::{BatchId, QueueId};
use super::item::QueueItem;

/// What ties a group's items together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Items added together from one album
    Batch(BatchId),
    /// An item added on its own
    Single(QueueId),
}

impl GroupKey {
    fn of(item: &QueueItem) -> Self {
        match item.batch_id() {
            Some(batch) => GroupKey::Batch(batch.clone()),
            None => GroupKey::Single(item.queue_id.clone()),
        }
    }
}

/// A derived view over the queue items that share a batch.
#[derive(Debug, Clone)]
pub struct AlbumGroup<'a> {
    pub key: GroupKey,
    /// Queue indices of the group's items, ascending
    pub indices: SmallVec<[usize; 16]>,
    items: SmallVec<[&'a QueueItem; 16]>,
}

impl<'a> AlbumGroup<'a> {
    /// Items in queue order.
    pub fn items(&self) -> &[&'a QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Album id of the group, when it came from an album.
    pub fn album_id(&self) -> Option<&'a str> {
        self.items
            .first()
            .and_then(|i| i.album_source.as_ref())
            .map(|s| s.album_id.as_str())
    }

    /// True if the items sit next to each other in the queue.
    pub fn is_contiguous(&self) -> bool {
        self.indices.windows(2).all(|w| w[1] == w[0] + 1)
    }

    /// Items sorted back into album track order.
    pub fn original_order(&self) -> Vec<&'a QueueItem> {
        let mut items: Vec<&QueueItem> = self.items.to_vec();
        items.sort_by_key(|i| {
            i.album_source
                .as_ref()
                .map(|s| s.original_track_index)
                .unwrap_or(0)
        });
        items
    }
}

/// Lazy iterator over album groups.
///
/// Cloning restarts the sequence from wherever the clone was taken; nothing
/// is cached between calls, so a new call always reflects the current items.
#[derive(Debug, Clone)]
pub struct AlbumGroups<'a> {
    items: &'a [QueueItem],
    next: usize,
}

impl<'a> Iterator for AlbumGroups<'a> {
    type Item = AlbumGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.items.len() {
            let start = self.next;
            self.next += 1;

            let key = GroupKey::of(&self.items[start]);
            // Groups are emitted at the first item that carries their key
            if self.items[..start].iter().any(|i| GroupKey::of(i) == key) {
                continue;
            }

            let mut group = AlbumGroup {
                key,
                indices: SmallVec::new(),
                items: SmallVec::new(),
            };
            for (index, item) in self.items.iter().enumerate().skip(start) {
                if GroupKey::of(item) == group.key {
                    group.indices.push(index);
                    group.items.push(item);
                }
            }
            return Some(group);
        }
        None
    }
}

/// Group `items` by batch, in order of first appearance.
pub fn compute_album_groups(items: &[QueueItem]) -> AlbumGroups<'_> {
    AlbumGroups { items, next: 0 }
}
