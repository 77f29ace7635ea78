//! Cache Metrics System
//!
//! BTreeMap-based metrics reporting for the tiered cache. BTreeMap is used
//! instead of HashMap so metrics always appear in a deterministic order:
//! reproducible test output, stable serialization, readable logs. The
//! performance difference is negligible at this key count.

use std::collections::BTreeMap;

/// Common counters every cache surface tracks.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total number of fetches made against the cache
    pub requests: u64,

    /// Number of fetches that returned a payload (from either tier)
    pub cache_hits: u64,

    /// Total bytes served to callers from cache hits
    pub bytes_served_from_cache: u64,

    /// Total bytes stored into the cache
    pub bytes_written_to_cache: u64,

    /// Number of entries evicted from memory by the byte budget
    pub evictions: u64,

    /// Current byte-sum of live in-memory entries
    pub cache_size_bytes: u64,

    /// The in-memory byte budget
    pub max_cache_size_bytes: u64,
}

impl CoreCacheMetrics {
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            max_cache_size_bytes,
            ..Default::default()
        }
    }

    /// Records a fetch that returned a payload of `object_size` bytes.
    pub fn record_hit(&mut self, object_size: u64) {
        self.requests += 1;
        self.cache_hits += 1;
        self.bytes_served_from_cache += object_size;
    }

    /// Records a fetch that found nothing on either tier.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a store of `object_size` bytes.
    pub fn record_insertion(&mut self, object_size: u64) {
        self.bytes_written_to_cache += object_size;
    }

    /// Records `count` memory-budget evictions.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Synchronizes the reported size with the index's live byte count.
    pub fn set_cache_size(&mut self, live_bytes: u64) {
        self.cache_size_bytes = live_bytes;
    }

    /// Hit rate in `0.0..=1.0`; `0.0` before the first request.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Miss rate in `0.0..=1.0`; `0.0` before the first request.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// How full the memory tier is relative to its budget.
    pub fn cache_utilization(&self) -> f64 {
        if self.max_cache_size_bytes > 0 {
            self.cache_size_bytes as f64 / self.max_cache_size_bytes as f64
        } else {
            0.0
        }
    }

    /// Core metrics as key-value pairs in deterministic order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("evictions".to_string(), self.evictions as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics.insert(
            "bytes_served_from_cache".to_string(),
            self.bytes_served_from_cache as f64,
        );
        metrics.insert(
            "bytes_written_to_cache".to_string(),
            self.bytes_written_to_cache as f64,
        );

        metrics.insert("cache_size_bytes".to_string(), self.cache_size_bytes as f64);
        metrics.insert(
            "max_cache_size_bytes".to_string(),
            self.max_cache_size_bytes as f64,
        );
        metrics.insert("cache_utilization".to_string(), self.cache_utilization());

        metrics
    }
}

/// Metrics for the tiered cache: core counters plus the disk-tier side.
#[derive(Debug, Clone)]
pub struct TieredCacheMetrics {
    /// Counters common to every cache surface
    pub core: CoreCacheMetrics,

    /// Number of completed flush runs
    pub flushes: u64,

    /// Payload files deleted by the disk trimmer
    pub files_trimmed: u64,

    /// Uncommitted journal intents rolled back at open
    pub recovered_intents: u64,
}

impl TieredCacheMetrics {
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            core: CoreCacheMetrics::new(max_cache_size_bytes),
            flushes: 0,
            files_trimmed: 0,
            recovered_intents: 0,
        }
    }

    pub fn record_flush(&mut self) {
        self.flushes += 1;
    }

    pub fn record_trimmed(&mut self, files: u64) {
        self.files_trimmed += files;
    }

    pub fn record_recovered(&mut self, intents: u64) {
        self.recovered_intents += intents;
    }

    /// All metrics, core and tiered, in deterministic order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("flushes".to_string(), self.flushes as f64);
        metrics.insert("files_trimmed".to_string(), self.files_trimmed as f64);
        metrics.insert(
            "recovered_intents".to_string(),
            self.recovered_intents as f64,
        );
        metrics
    }
}

/// Uniform metrics-reporting interface.
///
/// BTreeMap keeps the reported keys in a deterministic order, which matters
/// for reproducible benchmarks and consistent test output.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short identifier of the caching scheme (e.g. `"TLRU"`).
    fn algorithm_name(&self) -> &'static str;
}

impl CacheMetrics for TieredCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "TLRU"
    }
}
