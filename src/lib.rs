#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Operation cheat sheet
//!
//! | Operation | Tier | Scheduling | Returns |
//! |-----------|------|------------|---------|
//! | [`TieredCache::store`] | memory | synchronous | `()` |
//! | [`TieredCache::fetch`] | memory, falls back to disk | synchronous | `Option<Vec<u8>>` |
//! | [`TieredCache::delete`] | memory (tombstone) | synchronous | `()` |
//! | [`TieredCache::mem_size`] | memory | synchronous | `u64` |
//! | [`TieredCache::clear_memory`] | memory | synchronous | `()` |
//! | [`TieredCache::flush`] | disk | background worker | [`TaskHandle<bool>`] |
//! | [`TieredCache::file_size`] | disk | background worker | [`TaskHandle<u64>`] |
//! | [`TieredCache::clear_all`] | both | background worker | [`TaskHandle<bool>`] |
//!
//! ## Budget behavior
//!
//! ```text
//!            store(k, v)                 fetch(k)                  flush()
//!                │                          │                        │
//!                ▼                          ▼                        ▼
//!      entry at MRU, dirty      hit: move to MRU, then      dirty entries ──▶ disk
//!      (no eviction here)       evict LRU until within      tombstones ──▶ unlink
//!                               max_size_in_memory          then trim disk to
//!                                                           max_size_on_disk
//! ```
//!
//! ## Durability
//!
//! Payload writes and deletes are bracketed by intent/commit records in an
//! append-only journal. Reopening a cache directory rolls back every intent
//! without a commit before any call is served, so a crash mid-flush never
//! leaves a partial payload observable.

/// Tiered cache facade: the public cache type and its locking discipline.
pub mod cache;

/// Cache configuration structures.
pub mod config;

/// Cache entry type and its persistence-state lifecycle.
pub mod entry;

/// Cache error types.
pub mod error;

/// Metrics collection and reporting.
pub mod metrics;

/// Flush engine and disk trimmer.
pub(crate) mod flush;

/// In-memory LRU index over the recency list.
pub(crate) mod index;

/// Append-only intent journal and crash recovery.
pub(crate) mod journal;

/// Cache directory layout and path derivation.
pub(crate) mod layout;

/// Doubly linked recency list with in-place editing.
///
/// Internal infrastructure: exposes raw pointer operations that require
/// careful invariant maintenance. Use [`TieredCache`] instead.
pub(crate) mod list;

/// Payload store: one file per key on the disk tier.
pub(crate) mod store;

/// Background worker thread and completion handles.
pub(crate) mod worker;

pub use cache::TieredCache;
pub use config::{TieredCacheConfig, DEFAULT_MAX_SIZE_ON_DISK};
pub use entry::{CacheEntry, EntryState};
pub use error::CacheError;
pub use metrics::{CacheMetrics, CoreCacheMetrics, TieredCacheMetrics};
pub use worker::TaskHandle;
