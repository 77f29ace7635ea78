//! Flush Engine and Disk Trimmer
//!
//! Drains the in-memory index to the payload store through the intent
//! journal, then enforces the disk-tier byte budget.
//!
//! Per entry, the flush walk does:
//!
//! | state      | journal                  | payload store            | index after      |
//! |------------|--------------------------|--------------------------|------------------|
//! | `Updated`  | intent, then commit      | write bytes              | `Synced`         |
//! | `Deleted`  | intent, then commit      | delete file              | entry removed    |
//! | `Accessed` | none                     | stamp mtime with recency | `Synced`         |
//! | `Synced`   | none                     | none                     | unchanged        |
//!
//! The walk runs LRU-to-MRU. Order is not required for correctness (the
//! journal makes each entry atomic on its own), but this order writes colder
//! payloads first, so fresh mtimes mirror recency for the trimmer.
//!
//! A failing entry keeps its state and is retried at the next flush; its
//! uncommitted intent is rolled back by recovery if the process dies first.

use crate::entry::{CacheEntry, EntryState};
use crate::index::LruIndex;
use crate::journal::Journal;
use crate::store::PayloadStore;
use tracing::{debug, warn};

/// Writes one dirty entry out: intent record, payload write, commit.
fn persist_entry(
    entry: &mut CacheEntry,
    store: &PayloadStore,
    journal: &mut Journal,
) -> Result<(), crate::error::CacheError> {
    let id = journal.begin_write(&entry.key)?;
    let path = store.write(&entry.key, &entry.bytes)?;
    journal.commit(id)?;
    entry.disk_path = Some(path);
    entry.state = EntryState::Synced;
    Ok(())
}

/// Removes one tombstoned key from disk: intent record, unlink, commit.
fn erase_entry(
    key: &str,
    store: &PayloadStore,
    journal: &mut Journal,
) -> Result<(), crate::error::CacheError> {
    let id = journal.begin_delete(key)?;
    store.delete(key)?;
    journal.commit(id)?;
    Ok(())
}

/// Drains every non-`Synced` entry to the payload store. Returns `false`
/// if any entry failed; failed entries keep their state for the next flush.
pub(crate) fn flush_entries(
    index: &mut LruIndex,
    store: &PayloadStore,
    journal: &mut Journal,
) -> bool {
    let mut ok = true;
    let mut flushed_tombstones = Vec::new();

    for entry in index.iter_mut() {
        match entry.state {
            EntryState::Synced => {}
            EntryState::Updated => {
                if let Err(e) = persist_entry(entry, store, journal) {
                    warn!(key = %entry.key, error = %e, "failed to persist dirty entry");
                    ok = false;
                }
            }
            EntryState::Accessed => match store.set_mtime(&entry.key, entry.last_accessed()) {
                Ok(()) => entry.state = EntryState::Synced,
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "failed to refresh payload mtime");
                    ok = false;
                }
            },
            EntryState::Deleted => match erase_entry(&entry.key, store, journal) {
                Ok(()) => flushed_tombstones.push(entry.key.clone()),
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "failed to delete tombstoned payload");
                    ok = false;
                }
            },
        }
    }

    for key in flushed_tombstones {
        index.remove(&key);
    }
    ok
}

/// Trims the disk tier to `max_disk` bytes by deleting the oldest payload
/// files first. Files whose key is currently in the index are the live
/// working set and are never trimmed. Returns the number of files deleted.
pub(crate) fn purge_oldest_entries(index: &LruIndex, store: &PayloadStore, max_disk: u64) -> u64 {
    let mut total = match store.total_size() {
        Ok(total) => total,
        Err(e) => {
            warn!(error = %e, "could not size the payload folder, skipping trim");
            return 0;
        }
    };
    if total <= max_disk {
        return 0;
    }

    let mut files = match store.list() {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "could not list the payload folder, skipping trim");
            return 0;
        }
    };
    files.sort_by_key(|f| f.modified);

    let mut trimmed = 0;
    for file in files {
        if total <= max_disk {
            break;
        }
        if index.contains(&file.key) {
            continue;
        }
        match store.delete(&file.key) {
            Ok(()) => {
                debug!(key = %file.key, size = file.size, "trimmed cold payload");
                total = total.saturating_sub(file.size);
                trimmed += 1;
            }
            Err(e) => warn!(key = %file.key, error = %e, "failed to trim payload"),
        }
    }

    if total > max_disk {
        debug!(
            total,
            max_disk, "disk tier still over budget, every remaining payload is live"
        );
    }
    trimmed
}
