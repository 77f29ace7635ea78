//! Tiered Cache Facade
//!
//! The public cache type: an in-memory LRU index in front of a per-key file
//! store, with every payload mutation journaled for crash recovery.
//!
//! # Locking
//!
//! One `RwLock` guards the index, the payload store, and the journal
//! together, and every operation takes the **write** side: even a fetch
//! mutates recency (the entry moves to the most-recently-used position and
//! its access instant is stamped). This trades read concurrency for a
//! simple consistency story; the inner state can never be observed between
//! an index move and its byte accounting.
//!
//! Disk-heavy operations (`flush`, `file_size`, `clear_all`) are scheduled
//! on a background worker and hold the lock for their full duration. Expect
//! them to stall cache access while they run; that is intentional.
//!
//! # Visibility
//!
//! A `store` that has returned is visible to any subsequent `fetch` from
//! any thread. `flush` is a barrier: once its handle resolves, every
//! mutation applied before the flush was scheduled is persisted (or, for
//! deletes, removed from disk).

use crate::config::TieredCacheConfig;
use crate::entry::{CacheEntry, EntryState};
use crate::error::CacheError;
use crate::flush;
use crate::index::LruIndex;
use crate::journal::Journal;
use crate::layout::CacheLayout;
use crate::metrics::{CacheMetrics, TieredCacheMetrics};
use crate::store::PayloadStore;
use crate::worker::{TaskHandle, Worker};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, warn};

/// Checks that `key` is safe as a payload file name and journal field: no
/// path separators, no whitespace (journal records are space-delimited), no
/// control characters, not a directory dot-name.
pub(crate) fn validate_key(key: &str) -> Result<(), CacheError> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_ascii_control() || c.is_whitespace();
    if key.is_empty() || key == "." || key == ".." || key.chars().any(unsafe_char) {
        return Err(CacheError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Everything behind the global lock.
struct CacheInner {
    index: LruIndex,
    store: PayloadStore,
    journal: Journal,
    layout: CacheLayout,
    max_memory: u64,
    max_disk: u64,
    metrics: TieredCacheMetrics,
}

/// Two-tier byte cache: memory LRU over a journaled file store.
///
/// Create one with [`init`](TieredCache::init); share it across threads
/// behind an `Arc`. All methods take `&self`.
///
/// # Example
///
/// ```no_run
/// use rcache_rs::{TieredCache, TieredCacheConfig};
///
/// let cache = TieredCache::init(TieredCacheConfig {
///     cache_location: "/var/tmp/thumbs".into(),
///     max_size_on_disk: 10 * 1024 * 1024,
///     max_size_in_memory: 2 * 1024 * 1024,
/// }).unwrap();
///
/// cache.store("a", vec![1, 2, 3]);
/// assert_eq!(cache.fetch("a"), Some(vec![1, 2, 3]));
/// assert!(cache.flush().wait());
/// ```
pub struct TieredCache {
    inner: Arc<RwLock<CacheInner>>,
    worker: Worker,
}

impl TieredCache {
    /// Opens (or creates) the cache rooted at `config.cache_location`.
    ///
    /// Ensures the payload and journal folders exist; if a journal file is
    /// already present, runs crash recovery before anything else: intents
    /// without a commit have their payload files removed, then the journal
    /// starts fresh.
    pub fn init(config: TieredCacheConfig) -> Result<TieredCache, CacheError> {
        let (max_memory, max_disk) = config.resolved_budgets();
        let layout = CacheLayout::new(config.cache_location);
        layout.ensure_dirs()?;

        let store = PayloadStore::new(layout.payload_dir());
        let journal_existed = layout.journal_file().exists();
        let mut journal = Journal::open(layout.journal_file())?;

        let mut metrics = TieredCacheMetrics::new(max_memory);
        if journal_existed {
            let rolled_back = journal.recover(&store)?;
            metrics.record_recovered(rolled_back as u64);
        }

        debug!(max_memory, max_disk, "cache opened");
        Ok(TieredCache {
            inner: Arc::new(RwLock::new(CacheInner {
                index: LruIndex::new(),
                store,
                journal,
                layout,
                max_memory,
                max_disk,
                metrics,
            })),
            worker: Worker::new(),
        })
    }

    /// Returns the payload for `key`, or `None` for unknown or tombstoned
    /// keys.
    ///
    /// A hit in either tier moves the entry to the most-recently-used
    /// position; a disk hit also pulls the payload into the memory tier.
    /// After the lookup the memory tier is evicted down to its byte budget,
    /// least-recently-used first.
    pub fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "fetch with unsafe key reads as absent");
            return None;
        }
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let in_memory = match inner.index.get(key) {
            Some(entry) if entry.is_deleted() => {
                inner.metrics.core.record_miss();
                return None;
            }
            Some(entry) => {
                if entry.state == EntryState::Synced {
                    entry.state = EntryState::Accessed;
                }
                Some(entry.bytes.clone())
            }
            None => None,
        };

        let bytes = match in_memory {
            Some(bytes) => bytes,
            None => match inner.store.read(key) {
                Ok(Some(bytes)) => {
                    let path = inner.store.path(key);
                    let mut entry = CacheEntry::from_disk(key, bytes.clone(), path);
                    // Loaded synced, and this lookup is already a read: its
                    // recency must reach the disk mtime at the next flush.
                    entry.state = EntryState::Accessed;
                    inner.index.put(entry);
                    bytes
                }
                Ok(None) => {
                    inner.metrics.core.record_miss();
                    return None;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "payload read failed");
                    inner.metrics.core.record_miss();
                    return None;
                }
            },
        };

        inner.metrics.core.record_hit(bytes.len() as u64);
        let (evicted, _) = inner.index.evict_until(inner.max_memory);
        inner.metrics.core.record_evictions(evicted as u64);
        inner.metrics.core.set_cache_size(inner.index.live_bytes());
        Some(bytes)
    }

    /// Stores `bytes` under `key` at the most-recently-used position,
    /// replacing any previous payload.
    ///
    /// The entry is dirty until the next [`flush`](Self::flush). No eviction
    /// happens here: `store` stays O(1) and the memory budget is enforced on
    /// fetch and flush.
    pub fn store(&self, key: impl Into<String>, bytes: Vec<u8>) {
        let key = key.into();
        if let Err(e) = validate_key(&key) {
            warn!(error = %e, "dropping store");
            return;
        }
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let entry = CacheEntry::new(key, bytes);
        let size = entry.size;
        inner.index.put(entry);
        inner.metrics.core.record_insertion(size);
        inner.metrics.core.set_cache_size(inner.index.live_bytes());
    }

    /// Marks `key` for deletion.
    ///
    /// The key reads as absent immediately; the payload file is removed at
    /// the next [`flush`](Self::flush). A key only present on disk is bound
    /// to a tombstone first so the file is covered too.
    pub fn delete(&self, key: &str) {
        if let Err(e) = validate_key(key) {
            warn!(error = %e, "dropping delete");
            return;
        }
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if !inner.index.contains(key) {
            match inner.store.read(key) {
                Ok(Some(bytes)) => {
                    let path = inner.store.path(key);
                    inner.index.put(CacheEntry::from_disk(key, bytes, path));
                }
                Ok(None) => return,
                Err(e) => {
                    // The file may exist but be unreadable; bind a tombstone
                    // anyway so the next flush unlinks it.
                    warn!(key = %key, error = %e, "payload read failed, tombstoning anyway");
                    let path = inner.store.path(key);
                    inner.index.put(CacheEntry::from_disk(key, Vec::new(), path));
                }
            }
        }
        inner.index.tombstone(key);
        inner.metrics.core.set_cache_size(inner.index.live_bytes());
    }

    /// Empties the memory tier. The disk tier is unaffected.
    pub fn clear_memory(&self) {
        let mut guard = self.inner.write();
        guard.index.clear();
        guard.metrics.core.set_cache_size(0);
    }

    /// Byte-sum of all live (non-tombstone) entries in the memory tier.
    pub fn mem_size(&self) -> u64 {
        self.inner.write().index.live_bytes()
    }

    /// Number of entries in the memory tier, tombstones included.
    pub fn len(&self) -> usize {
        self.inner.write().index.len()
    }

    /// Whether the memory tier holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.inner.write().index.is_empty()
    }

    /// Schedules a flush: every dirty entry is journaled and written out,
    /// every tombstone is journaled and its file removed, read recency is
    /// propagated to file mtimes, and finally the disk tier is trimmed to
    /// its byte budget (oldest files first, keys in the index spared).
    ///
    /// The handle resolves to `true` when every entry flushed cleanly.
    /// Entries that failed keep their state and are retried next time.
    pub fn flush(&self) -> TaskHandle<bool> {
        let inner = Arc::clone(&self.inner);
        self.worker.schedule(move || {
            let mut guard = inner.write();
            let inner = &mut *guard;
            let ok = flush::flush_entries(&mut inner.index, &inner.store, &mut inner.journal);
            let trimmed = flush::purge_oldest_entries(&inner.index, &inner.store, inner.max_disk);
            inner.metrics.record_flush();
            inner.metrics.record_trimmed(trimmed);
            inner.metrics.core.set_cache_size(inner.index.live_bytes());
            ok
        })
    }

    /// Schedules a byte count of the payload folder. Resolves to `0` when
    /// the folder cannot be read.
    pub fn file_size(&self) -> TaskHandle<u64> {
        let inner = Arc::clone(&self.inner);
        self.worker.schedule(move || {
            let guard = inner.write();
            match guard.store.total_size() {
                Ok(total) => total,
                Err(e) => {
                    warn!(error = %e, "could not size the payload folder");
                    0
                }
            }
        })
    }

    /// Schedules a full wipe: empties the memory tier, deletes the payload
    /// folder recursively, recreates the folders, and resets the journal to
    /// a fresh header. Resolves to `true` on full success.
    pub fn clear_all(&self) -> TaskHandle<bool> {
        let inner = Arc::clone(&self.inner);
        self.worker.schedule(move || {
            let mut guard = inner.write();
            let inner = &mut *guard;
            let mut ok = true;

            inner.index.clear();
            inner.metrics.core.set_cache_size(0);

            match fs::remove_dir_all(inner.layout.payload_dir()) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(error = %e, "failed to remove the payload folder");
                    ok = false;
                }
            }
            if let Err(e) = inner.layout.ensure_dirs() {
                warn!(error = %e, "failed to recreate the cache folders");
                ok = false;
            }
            if let Err(e) = inner.journal.reset() {
                warn!(error = %e, "failed to reset the journal");
                ok = false;
            }
            ok
        })
    }
}

impl CacheMetrics for TieredCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.inner.read().metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "TLRU"
    }
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.read();
        f.debug_struct("TieredCache")
            .field("len", &guard.index.len())
            .field("live_bytes", &guard.index.live_bytes())
            .field("max_memory", &guard.max_memory)
            .field("max_disk", &guard.max_disk)
            .finish()
    }
}
