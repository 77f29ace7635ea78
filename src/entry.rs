//! Cache Entry Type
//!
//! This module provides the `CacheEntry` structure used by the in-memory
//! index: one record per live key, holding the payload bytes together with
//! the persistence state the flush engine acts on.
//!
//! # Entry Lifecycle
//!
//! ```text
//!  store() ──▶ Updated ──flush──▶ Synced ──fetch──▶ Accessed ──flush──▶ Synced
//!                                    │                                    │
//!                                 delete()                            delete()
//!                                    ▼                                    ▼
//!                                 Deleted ──flush──▶ (removed from index)
//! ```
//!
//! - `Updated`: dirty; the bytes have not been written to disk yet.
//! - `Accessed`: persisted, but the read recency has not been propagated to
//!   the payload file's mtime yet.
//! - `Synced`: persisted and mtime current.
//! - `Deleted`: tombstone; the payload file is removed at the next flush.

use std::path::PathBuf;
use std::time::SystemTime;

/// Persistence state of an in-memory entry relative to the disk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Dirty: written or overwritten in memory, not yet persisted.
    Updated,
    /// Persisted, but its recency needs to be propagated to the disk mtime.
    Accessed,
    /// Persisted and mtime current.
    Synced,
    /// Tombstone: pending removal from disk at the next flush.
    Deleted,
}

/// One in-memory cache record: key, payload, and persistence bookkeeping.
///
/// Entries are wholly owned by the LRU index. `size` always equals
/// `bytes.len()`; it is kept as a separate field so byte accounting does not
/// re-measure payloads on every pass.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cache key; also the payload file name on disk.
    pub key: String,

    /// The payload bytes.
    pub bytes: Vec<u8>,

    /// Persistence state relative to the disk tier.
    pub state: EntryState,

    /// Instant of the most recent read or write through the facade.
    last_accessed: SystemTime,

    /// Where the payload is persisted, once it has been loaded from or
    /// written to the payload store.
    pub disk_path: Option<PathBuf>,

    /// Payload size in bytes; equals `bytes.len()`.
    pub size: u64,
}

impl CacheEntry {
    /// Creates a freshly stored entry. Born dirty (`Updated`), with no disk
    /// binding yet.
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            key: key.into(),
            bytes,
            state: EntryState::Updated,
            last_accessed: SystemTime::now(),
            disk_path: None,
            size,
        }
    }

    /// Creates an entry rehydrated from the payload store. Born `Synced`:
    /// the bytes on disk are exactly these bytes.
    pub fn from_disk(key: impl Into<String>, bytes: Vec<u8>, disk_path: PathBuf) -> Self {
        let size = bytes.len() as u64;
        Self {
            key: key.into(),
            bytes,
            state: EntryState::Synced,
            last_accessed: SystemTime::now(),
            disk_path: Some(disk_path),
            size,
        }
    }

    /// Stamps the entry with the current instant.
    #[inline]
    pub fn touch(&mut self) {
        self.last_accessed = SystemTime::now();
    }

    /// Instant of the most recent read or write.
    #[inline]
    pub fn last_accessed(&self) -> SystemTime {
        self.last_accessed
    }

    /// Whether this entry is a tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.state == EntryState::Deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_dirty() {
        let entry = CacheEntry::new("k", vec![1, 2, 3]);
        assert_eq!(entry.key, "k");
        assert_eq!(entry.size, 3);
        assert_eq!(entry.state, EntryState::Updated);
        assert!(entry.disk_path.is_none());
        assert!(!entry.is_deleted());
    }

    #[test]
    fn test_from_disk_is_synced() {
        let entry = CacheEntry::from_disk("k", vec![0u8; 16], PathBuf::from("/tmp/rcache/k"));
        assert_eq!(entry.state, EntryState::Synced);
        assert_eq!(entry.size, 16);
        assert_eq!(
            entry.disk_path.as_deref(),
            Some(std::path::Path::new("/tmp/rcache/k"))
        );
    }

    #[test]
    fn test_touch_advances_last_accessed() {
        let mut entry = CacheEntry::new("k", vec![]);
        let before = entry.last_accessed();
        std::thread::sleep(std::time::Duration::from_millis(2));
        entry.touch();
        assert!(entry.last_accessed() > before);
    }

    #[test]
    fn test_tombstone_flag() {
        let mut entry = CacheEntry::new("k", vec![9]);
        entry.state = EntryState::Deleted;
        assert!(entry.is_deleted());
    }
}
