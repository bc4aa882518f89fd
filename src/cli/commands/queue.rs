//! Saved queue inspection.

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::player::format_duration;
use crate::queue::persist::try_load_queue;
use crate::queue::{FileStore, GroupKey, QUEUE_STATE_KEY, UnifiedQueue};

/// Resolve the state directory: `--dir` wins over the config.
fn open_store(config: &Config, dir: Option<&Path>) -> Result<FileStore> {
    if let Some(dir) = dir {
        return Ok(FileStore::new(dir));
    }
    config
        .persistence
        .store()
        .with_context("locating state directory")?
        .ok_or_else(|| Error::config("queue persistence is disabled (pass --dir to read anyway)"))
}

fn read_queue(store: &FileStore) -> Result<Option<UnifiedQueue>> {
    try_load_queue(store, QUEUE_STATE_KEY)
        .with_context(format!("reading saved queue from {}", store.dir().display()))
}

/// Print the saved queue and its album groups.
pub fn cmd_queue_show(config: &Config, dir: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(config, dir)?;
    let Some(queue) = read_queue(&store)? else {
        println!("No saved queue in {}", store.dir().display());
        return Ok(());
    };

    if queue.is_empty() {
        println!("Saved queue is empty");
        return Ok(());
    }

    println!(
        "{} items, repeat {:?}, {} remaining",
        queue.len(),
        queue.repeat(),
        queue.remaining_count()
    );
    println!();

    let current = queue.current_index();
    for (index, item) in queue.items().iter().enumerate() {
        let marker = if Some(index) == current { "▶" } else { " " };
        println!(
            "{} {:>3}. {} - {} ({})",
            marker,
            index + 1,
            item.song.artist.name,
            item.track_title,
            format_duration(item.song.duration())
        );
    }

    println!();
    println!("Album groups:");
    for group in queue.album_groups() {
        let label = match &group.key {
            GroupKey::Batch(_) => group
                .items()
                .first()
                .map(|i| i.song.album.title.clone())
                .unwrap_or_default(),
            GroupKey::Single(_) => "(single)".to_string(),
        };
        let span = match (group.indices.first(), group.indices.last()) {
            (Some(first), Some(last)) => format!("{}-{}", first + 1, last + 1),
            _ => String::new(),
        };
        println!(
            "  {:<40} {:>2} tracks at {}{}",
            label,
            group.len(),
            span,
            if group.is_contiguous() { "" } else { " (split)" }
        );
    }
    Ok(())
}

/// Check the saved queue loads and satisfies the queue invariants.
pub fn cmd_queue_validate(config: &Config, dir: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(config, dir)?;
    match read_queue(&store) {
        Ok(Some(queue)) => {
            println!(
                "✓ Saved queue is valid: {} items, cursor {}",
                queue.len(),
                queue.cursor_index()
            );
            Ok(())
        }
        Ok(None) => {
            println!("No saved queue in {}", store.dir().display());
            Ok(())
        }
        Err(e) if e.is_corrupt_state() => {
            println!("✗ Saved queue is corrupt and would be discarded on startup");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
