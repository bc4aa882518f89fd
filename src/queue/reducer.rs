//! Queue state machine.
//!
//! [`reduce`] is total: every action yields a queue that satisfies the
//! invariants checked by [`UnifiedQueue::validate`]. Actions that name an
//! id that no longer exists (a stale UI dispatch racing a removal) return
//! the queue unchanged.

use std::collections::HashSet;

use tracing::debug;

use super::ids::{BatchId, QueueId};
use super::item::QueueItem;
use super::unified::{RepeatMode, UnifiedQueue};
use crate::model::Song;

/// Actions accepted by [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueueAction {
    /// Insert one item at `position` (end if `None`)
    AddItem {
        item: QueueItem,
        position: Option<usize>,
    },
    /// Insert a run of items at `position` (end if `None`)
    AddItems {
        items: Vec<QueueItem>,
        position: Option<usize>,
    },
    /// Insert items immediately after the cursor
    PlayNext { items: Vec<QueueItem> },
    RemoveItem { queue_id: QueueId },
    /// Drop everything after the cursor
    ClearUpcoming,
    /// Drop everything
    Clear,
    MoveItem { queue_id: QueueId, to_index: usize },
    /// Move every item of a batch as one contiguous block starting at `to_index`
    MoveBlock { batch_id: BatchId, to_index: usize },
    /// Put a batch's items back into album track order
    RestoreAlbumOrder { batch_id: BatchId },
    /// Swap in an alternate recording, keeping id and position
    SelectVersion { queue_id: QueueId, song: Song },
    SetRepeat(RepeatMode),
    CycleRepeat,
    PlayFromQueue { queue_id: QueueId },
    /// Move the cursor forward per the repeat mode
    Advance,
    /// Move the cursor back per the repeat mode
    Retreat,
    /// Replace the whole queue, selecting `start_index`
    ReplaceQueue {
        items: Vec<QueueItem>,
        start_index: Option<usize>,
    },
}

/// Apply `action` to `queue`.
pub fn reduce(mut queue: UnifiedQueue, action: QueueAction) -> UnifiedQueue {
    match action {
        QueueAction::AddItem { item, position } => insert_run(&mut queue, vec![item], position),
        QueueAction::AddItems { items, position } => insert_run(&mut queue, items, position),
        QueueAction::PlayNext { items } => {
            let at = queue.current_index().map(|c| c + 1).unwrap_or(0);
            insert_at(&mut queue, items, at);
        }
        QueueAction::RemoveItem { queue_id } => remove_item(&mut queue, &queue_id),
        QueueAction::ClearUpcoming => match queue.current_index() {
            Some(cursor) => queue.items.truncate(cursor + 1),
            None => queue.items.clear(),
        },
        QueueAction::Clear => {
            queue.items.clear();
            queue.cursor = -1;
        }
        QueueAction::MoveItem { queue_id, to_index } => move_item(&mut queue, &queue_id, to_index),
        QueueAction::MoveBlock { batch_id, to_index } => move_block(&mut queue, &batch_id, to_index),
        QueueAction::RestoreAlbumOrder { batch_id } => restore_album_order(&mut queue, &batch_id),
        QueueAction::SelectVersion { queue_id, song } => {
            match queue.items.iter_mut().find(|i| i.queue_id == queue_id) {
                Some(item) => item.song = song,
                None => debug!(%queue_id, "select version for unknown queue item ignored"),
            }
        }
        QueueAction::SetRepeat(mode) => queue.repeat = mode,
        QueueAction::CycleRepeat => queue.repeat = queue.repeat.cycled(),
        QueueAction::PlayFromQueue { queue_id } => match queue.index_of(&queue_id) {
            Some(index) => queue.cursor = index as i32,
            None => debug!(%queue_id, "play from queue for unknown item ignored"),
        },
        QueueAction::Advance => advance(&mut queue),
        QueueAction::Retreat => retreat(&mut queue),
        QueueAction::ReplaceQueue { items, start_index } => {
            queue.items.clear();
            queue.cursor = -1;
            insert_at(&mut queue, items, 0);
            queue.cursor = match start_index {
                Some(i) if i < queue.items.len() => i as i32,
                _ => -1,
            };
        }
    }
    queue
}

/// Insert honouring "play next" semantics: a position equal to the cursor
/// lands right after it.
fn insert_run(queue: &mut UnifiedQueue, items: Vec<QueueItem>, position: Option<usize>) {
    let len = queue.items.len();
    let at = match (position, queue.current_index()) {
        (Some(p), Some(cursor)) if p == cursor => cursor + 1,
        (Some(p), _) => p.min(len),
        (None, _) => len,
    };
    insert_at(queue, items, at);
}

fn insert_at(queue: &mut UnifiedQueue, items: Vec<QueueItem>, at: usize) {
    let mut seen: HashSet<QueueId> = queue.items.iter().map(|i| i.queue_id.clone()).collect();
    let items: Vec<QueueItem> = items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.queue_id.clone());
            if !fresh {
                debug!(queue_id = %item.queue_id, "duplicate queue id ignored");
            }
            fresh
        })
        .collect();
    if items.is_empty() {
        return;
    }

    let at = at.min(queue.items.len());
    let count = items.len();
    queue.items.splice(at..at, items);

    if let Some(cursor) = queue.current_index()
        && at <= cursor
    {
        queue.cursor += count as i32;
    }
}

fn remove_item(queue: &mut UnifiedQueue, queue_id: &QueueId) {
    let Some(index) = queue.index_of(queue_id) else {
        debug!(%queue_id, "remove for unknown queue item ignored");
        return;
    };
    queue.items.remove(index);

    if queue.cursor >= 0 {
        let cursor = queue.cursor as usize;
        if index < cursor {
            queue.cursor -= 1;
        } else if index == cursor && index >= queue.items.len() {
            // Removed the last item while it was active; the following
            // item otherwise slides into the cursor's slot
            queue.cursor = -1;
        }
    }
}

fn move_item(queue: &mut UnifiedQueue, queue_id: &QueueId, to: usize) {
    let Some(from) = queue.index_of(queue_id) else {
        debug!(%queue_id, "move for unknown queue item ignored");
        return;
    };
    if to >= queue.items.len() || from == to {
        return;
    }

    let item = queue.items.remove(from);
    queue.items.insert(to, item);

    // Keep the cursor on the same logical item
    if let Some(pos) = queue.current_index() {
        if from == pos {
            queue.cursor = to as i32;
        } else if from < pos && to >= pos {
            queue.cursor -= 1;
        } else if from > pos && to <= pos {
            queue.cursor += 1;
        }
    }
}

fn move_block(queue: &mut UnifiedQueue, batch_id: &BatchId, to: usize) {
    let block_len = queue
        .items
        .iter()
        .filter(|i| i.batch_id() == Some(batch_id))
        .count();
    if block_len == 0 {
        debug!(%batch_id, "move for unknown batch ignored");
        return;
    }
    if to > queue.items.len() - block_len {
        return;
    }

    let cursor_id = queue.current().map(|i| i.queue_id.clone());
    let (block, mut rest): (Vec<QueueItem>, Vec<QueueItem>) = std::mem::take(&mut queue.items)
        .into_iter()
        .partition(|i| i.batch_id() == Some(batch_id));
    rest.splice(to..to, block);
    queue.items = rest;
    follow_cursor(queue, cursor_id);
}

fn restore_album_order(queue: &mut UnifiedQueue, batch_id: &BatchId) {
    let slots: Vec<usize> = queue
        .items
        .iter()
        .enumerate()
        .filter(|(_, i)| i.batch_id() == Some(batch_id))
        .map(|(idx, _)| idx)
        .collect();
    if slots.is_empty() {
        debug!(%batch_id, "restore order for unknown batch ignored");
        return;
    }

    let cursor_id = queue.current().map(|i| i.queue_id.clone());
    let mut block: Vec<QueueItem> = slots.iter().map(|&i| queue.items[i].clone()).collect();
    block.sort_by_key(|i| {
        i.album_source
            .as_ref()
            .map(|s| s.original_track_index)
            .unwrap_or(0)
    });
    for (slot, item) in slots.into_iter().zip(block) {
        queue.items[slot] = item;
    }
    follow_cursor(queue, cursor_id);
}

/// Point the cursor back at the item it referenced before a reorder.
fn follow_cursor(queue: &mut UnifiedQueue, cursor_id: Option<QueueId>) {
    queue.cursor = cursor_id
        .and_then(|id| queue.index_of(&id))
        .map(|i| i as i32)
        .unwrap_or(-1);
}

fn advance(queue: &mut UnifiedQueue) {
    if queue.items.is_empty() {
        return;
    }
    let len = queue.items.len() as i32;
    match queue.repeat {
        RepeatMode::One => {
            // Stay on current track
            if queue.cursor < 0 {
                queue.cursor = 0;
            }
        }
        RepeatMode::All => {
            queue.cursor = (queue.cursor + 1) % len;
        }
        RepeatMode::Off => {
            queue.cursor = (queue.cursor + 1).min(len - 1);
        }
    }
}

fn retreat(queue: &mut UnifiedQueue) {
    if queue.items.is_empty() {
        return;
    }
    let len = queue.items.len() as i32;
    match queue.repeat {
        RepeatMode::One => {
            if queue.cursor < 0 {
                queue.cursor = 0;
            }
        }
        RepeatMode::All => {
            queue.cursor -= 1;
            if queue.cursor < 0 {
                queue.cursor = len - 1;
            }
        }
        RepeatMode::Off => {
            queue.cursor = (queue.cursor - 1).max(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use crate::queue::{album_to_queue_items, compute_album_groups, track_to_queue_item};
    use crate::test_utils::{ids, mock_album, mock_song, mock_version, queue_of};

    fn play(queue: UnifiedQueue, index: usize) -> UnifiedQueue {
        let queue_id = queue.items()[index].queue_id.clone();
        reduce(queue, QueueAction::PlayFromQueue { queue_id })
    }

    #[test]
    fn test_add_appends() {
        let items = album_to_queue_items(&mock_album("a", 3));
        let queue = queue_of(items.clone());
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.cursor_index(), -1);
        assert_eq!(queue.items()[2].queue_id, items[2].queue_id);
    }

    #[test]
    fn test_add_before_cursor_shifts_cursor() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 2);
        let current = queue.current().unwrap().queue_id.clone();

        let extra = track_to_queue_item(&mock_song("x", "X"));
        let queue = reduce(
            queue,
            QueueAction::AddItem {
                item: extra,
                position: Some(0),
            },
        );
        assert_eq!(queue.cursor_index(), 3);
        assert_eq!(queue.current().unwrap().queue_id, current);
    }

    #[test]
    fn test_add_at_cursor_goes_after_it() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 1);
        let extra = track_to_queue_item(&mock_song("x", "X"));
        let extra_id = extra.queue_id.clone();

        let queue = reduce(
            queue,
            QueueAction::AddItem {
                item: extra,
                position: Some(1),
            },
        );
        assert_eq!(queue.cursor_index(), 1);
        assert_eq!(queue.items()[2].queue_id, extra_id);
    }

    #[test]
    fn test_add_past_end_clamps() {
        let queue = queue_of(album_to_queue_items(&mock_album("a", 2)));
        let extra = track_to_queue_item(&mock_song("x", "X"));
        let extra_id = extra.queue_id.clone();
        let queue = reduce(
            queue,
            QueueAction::AddItem {
                item: extra,
                position: Some(99),
            },
        );
        assert_eq!(queue.items()[2].queue_id, extra_id);
    }

    #[test]
    fn test_duplicate_add_ignored() {
        let item = track_to_queue_item(&mock_song("x", "X"));
        let queue = queue_of(vec![item.clone()]);
        let queue = reduce(
            queue,
            QueueAction::AddItem {
                item,
                position: None,
            },
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_play_next() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 0);
        let extra = track_to_queue_item(&mock_song("x", "X"));
        let extra_id = extra.queue_id.clone();
        let queue = reduce(queue, QueueAction::PlayNext { items: vec![extra] });
        assert_eq!(queue.items()[1].queue_id, extra_id);
        assert_eq!(queue.cursor_index(), 0);
    }

    #[test]
    fn test_play_next_with_nothing_selected_goes_first() {
        let queue = queue_of(album_to_queue_items(&mock_album("a", 2)));
        let extra = track_to_queue_item(&mock_song("x", "X"));
        let extra_id = extra.queue_id.clone();
        let queue = reduce(queue, QueueAction::PlayNext { items: vec![extra] });
        assert_eq!(queue.items()[0].queue_id, extra_id);
        assert_eq!(queue.cursor_index(), -1);
    }

    #[test]
    fn test_remove_cursor_item_moves_to_following() {
        // Five tracks of one album, cursor on the 3rd, remove it
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 5))), 2);
        let fourth = queue.items()[3].queue_id.clone();
        let third = queue.items()[2].queue_id.clone();

        let queue = reduce(queue, QueueAction::RemoveItem { queue_id: third });
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.current().unwrap().queue_id, fourth);

        let groups: Vec<_> = compute_album_groups(queue.items()).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 4);
    }

    #[test]
    fn test_remove_last_cursor_item_clears_cursor() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 2);
        let last = queue.items()[2].queue_id.clone();
        let queue = reduce(queue, QueueAction::RemoveItem { queue_id: last });
        assert_eq!(queue.cursor_index(), -1);
    }

    #[test]
    fn test_remove_before_cursor() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 2);
        let current = queue.current().unwrap().queue_id.clone();
        let first = queue.items()[0].queue_id.clone();
        let queue = reduce(queue, QueueAction::RemoveItem { queue_id: first });
        assert_eq!(queue.cursor_index(), 1);
        assert_eq!(queue.current().unwrap().queue_id, current);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 1);
        let after = reduce(
            queue.clone(),
            QueueAction::RemoveItem {
                queue_id: QueueId::from("gone"),
            },
        );
        assert_eq!(after, queue);
    }

    #[test]
    fn test_clear_upcoming() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 5))), 1);
        let kept = ids(&queue)[..2].to_vec();
        let queue = reduce(queue, QueueAction::ClearUpcoming);
        assert_eq!(ids(&queue), kept);
        assert_eq!(queue.cursor_index(), 1);
    }

    #[test]
    fn test_clear_upcoming_without_cursor_clears_all() {
        let queue = queue_of(album_to_queue_items(&mock_album("a", 3)));
        let queue = reduce(queue, QueueAction::ClearUpcoming);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_move_item_cursor_follows() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 4))), 1);
        let current = queue.current().unwrap().queue_id.clone();

        // Move the playing item to the end
        let queue = reduce(
            queue,
            QueueAction::MoveItem {
                queue_id: current.clone(),
                to_index: 3,
            },
        );
        assert_eq!(queue.cursor_index(), 3);
        assert_eq!(queue.current().unwrap().queue_id, current);

        // Move something from after the cursor to before it
        let first = queue.items()[0].queue_id.clone();
        let queue = reduce(
            queue,
            QueueAction::MoveItem {
                queue_id: first,
                to_index: 3,
            },
        );
        assert_eq!(queue.cursor_index(), 2);
        assert_eq!(queue.current().unwrap().queue_id, current);
    }

    #[test]
    fn test_move_item_out_of_range_is_noop() {
        let queue = queue_of(album_to_queue_items(&mock_album("a", 3)));
        let id = queue.items()[0].queue_id.clone();
        let after = reduce(
            queue.clone(),
            QueueAction::MoveItem {
                queue_id: id,
                to_index: 3,
            },
        );
        assert_eq!(after, queue);
    }

    #[test]
    fn test_interleaved_album_still_one_group() {
        let album = album_to_queue_items(&mock_album("x", 2));
        let single = track_to_queue_item(&mock_song("solo", "Solo"));
        let single_id = single.queue_id.clone();
        let mut items = album.clone();
        items.push(single);
        let queue = queue_of(items);

        let queue = reduce(
            queue,
            QueueAction::MoveItem {
                queue_id: single_id,
                to_index: 1,
            },
        );
        let groups: Vec<_> = compute_album_groups(queue.items()).collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].album_id(), Some("x"));
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_move_block() {
        let mut items = album_to_queue_items(&mock_album("a", 2));
        let b = album_to_queue_items(&mock_album("b", 3));
        let batch = b[0].batch_id().unwrap().clone();
        items.extend(b.clone());
        let queue = play(queue_of(items), 0);
        let current = queue.current().unwrap().queue_id.clone();

        let queue = reduce(
            queue,
            QueueAction::MoveBlock {
                batch_id: batch,
                to_index: 0,
            },
        );
        let expected: Vec<String> = b
            .iter()
            .map(|i| i.queue_id.as_str().to_string())
            .collect();
        assert_eq!(ids(&queue)[..3].to_vec(), expected);
        assert_eq!(queue.cursor_index(), 3);
        assert_eq!(queue.current().unwrap().queue_id, current);
    }

    #[test]
    fn test_move_block_gathers_scattered_items() {
        let album = album_to_queue_items(&mock_album("a", 3));
        let batch = album[0].batch_id().unwrap().clone();
        let single = track_to_queue_item(&mock_song("s", "S"));
        let items = vec![
            album[0].clone(),
            single.clone(),
            album[1].clone(),
            album[2].clone(),
        ];
        let queue = queue_of(items);

        let queue = reduce(
            queue,
            QueueAction::MoveBlock {
                batch_id: batch,
                to_index: 1,
            },
        );
        assert_eq!(queue.items()[0].queue_id, single.queue_id);
        assert_eq!(queue.items()[1].queue_id, album[0].queue_id);
        assert_eq!(queue.items()[3].queue_id, album[2].queue_id);
    }

    #[test]
    fn test_move_block_out_of_range_is_noop() {
        let items = album_to_queue_items(&mock_album("a", 3));
        let batch = items[0].batch_id().unwrap().clone();
        let queue = queue_of(items);
        let after = reduce(
            queue.clone(),
            QueueAction::MoveBlock {
                batch_id: batch,
                to_index: 1,
            },
        );
        assert_eq!(after, queue);
    }

    #[test]
    fn test_restore_album_order() {
        let album = album_to_queue_items(&mock_album("a", 3));
        let batch = album[0].batch_id().unwrap().clone();
        let single = track_to_queue_item(&mock_song("s", "S"));
        let queue = play(
            queue_of(vec![
                album[2].clone(),
                single.clone(),
                album[0].clone(),
                album[1].clone(),
            ]),
            0,
        );

        let queue = reduce(queue, QueueAction::RestoreAlbumOrder { batch_id: batch });
        assert_eq!(queue.items()[0].queue_id, album[0].queue_id);
        assert_eq!(queue.items()[1].queue_id, single.queue_id);
        assert_eq!(queue.items()[2].queue_id, album[1].queue_id);
        assert_eq!(queue.items()[3].queue_id, album[2].queue_id);
        // Cursor was on album[2]
        assert_eq!(queue.cursor_index(), 3);
    }

    #[test]
    fn test_select_version_keeps_identity() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 1);
        let target = queue.items()[1].queue_id.clone();
        let alternate = mock_version("alt", SourceType::Matrix, Some(9.0), 1);

        let queue = reduce(
            queue,
            QueueAction::SelectVersion {
                queue_id: target.clone(),
                song: alternate,
            },
        );
        assert_eq!(queue.items()[1].queue_id, target);
        assert_eq!(queue.items()[1].song.id, "alt");
        assert_eq!(queue.cursor_index(), 1);
    }

    #[test]
    fn test_advance_repeat_modes() {
        let queue = queue_of(album_to_queue_items(&mock_album("a", 2)));

        // Off: starts at 0, exhausts at last
        let q = reduce(queue.clone(), QueueAction::Advance);
        assert_eq!(q.cursor_index(), 0);
        let q = reduce(q, QueueAction::Advance);
        let q = reduce(q, QueueAction::Advance);
        assert_eq!(q.cursor_index(), 1);

        // All: wraps
        let q = reduce(q, QueueAction::SetRepeat(RepeatMode::All));
        let q = reduce(q, QueueAction::Advance);
        assert_eq!(q.cursor_index(), 0);

        // One: stays
        let q = reduce(q, QueueAction::SetRepeat(RepeatMode::One));
        let q = reduce(q, QueueAction::Advance);
        assert_eq!(q.cursor_index(), 0);
    }

    #[test]
    fn test_retreat_repeat_modes() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 0);
        let q = reduce(queue.clone(), QueueAction::Retreat);
        assert_eq!(q.cursor_index(), 0);

        let q = reduce(q, QueueAction::SetRepeat(RepeatMode::All));
        let q = reduce(q, QueueAction::Retreat);
        assert_eq!(q.cursor_index(), 2);
    }

    #[test]
    fn test_replace_queue() {
        let queue = play(queue_of(album_to_queue_items(&mock_album("a", 3))), 2);
        let fresh = album_to_queue_items(&mock_album("b", 4));
        let q = reduce(
            queue.clone(),
            QueueAction::ReplaceQueue {
                items: fresh.clone(),
                start_index: Some(1),
            },
        );
        assert_eq!(q.len(), 4);
        assert_eq!(q.current().unwrap().queue_id, fresh[1].queue_id);

        let q = reduce(
            queue,
            QueueAction::ReplaceQueue {
                items: fresh,
                start_index: Some(10),
            },
        );
        assert_eq!(q.cursor_index(), -1);
    }

    #[test]
    fn test_clear_keeps_repeat() {
        let queue = reduce(
            queue_of(album_to_queue_items(&mock_album("a", 2))),
            QueueAction::SetRepeat(RepeatMode::All),
        );
        let queue = reduce(queue, QueueAction::Clear);
        assert!(queue.is_empty());
        assert_eq!(queue.cursor_index(), -1);
        assert_eq!(queue.repeat(), RepeatMode::All);
    }
}
