//! Cache Configuration
//!
//! Configuration for the tiered cache, a public-field struct for simple
//! instantiation:
//!
//! ```
//! use rcache_rs::TieredCacheConfig;
//!
//! let config = TieredCacheConfig {
//!     cache_location: "/var/tmp/thumbs".into(),
//!     max_size_on_disk: 50 * 1024 * 1024,
//!     max_size_in_memory: 12 * 1024 * 1024,
//! };
//! ```
//!
//! Budgets are byte counts. A zero budget means "use the default": 50 MiB
//! for the disk tier, a quarter of the disk budget for the memory tier. The
//! memory budget is always clamped to the disk budget, so an entry that fits
//! in memory also fits on disk.

use std::fmt;
use std::path::PathBuf;

/// Disk-tier budget substituted when `max_size_on_disk` is zero.
pub const DEFAULT_MAX_SIZE_ON_DISK: u64 = 50 * 1024 * 1024;

/// Configuration for [`TieredCache`](crate::TieredCache).
///
/// # Fields
///
/// - `cache_location`: root directory of the cache; created if missing
/// - `max_size_on_disk`: upper bound on payload bytes after a flush
/// - `max_size_in_memory`: upper bound on in-memory payload bytes,
///   enforced on fetch
#[derive(Clone)]
pub struct TieredCacheConfig {
    /// Root directory the cache owns. The cache assumes sole ownership:
    /// sharing one root between processes is undefined.
    pub cache_location: PathBuf,
    /// Maximum total payload bytes on disk after a flush. Zero selects the
    /// 50 MiB default.
    pub max_size_on_disk: u64,
    /// Maximum total payload bytes held in memory. Zero selects a quarter
    /// of the disk budget; values above the disk budget are clamped to it.
    pub max_size_in_memory: u64,
}

impl TieredCacheConfig {
    /// Configuration with default budgets for the given root directory.
    pub fn new(cache_location: impl Into<PathBuf>) -> Self {
        TieredCacheConfig {
            cache_location: cache_location.into(),
            max_size_on_disk: DEFAULT_MAX_SIZE_ON_DISK,
            max_size_in_memory: DEFAULT_MAX_SIZE_ON_DISK / 4,
        }
    }

    /// Resolves the configured budgets to `(max_memory, max_disk)`,
    /// substituting defaults for zero values and clamping memory to disk.
    pub(crate) fn resolved_budgets(&self) -> (u64, u64) {
        let disk = if self.max_size_on_disk == 0 {
            DEFAULT_MAX_SIZE_ON_DISK
        } else {
            self.max_size_on_disk
        };
        let memory = if self.max_size_in_memory == 0 {
            disk / 4
        } else {
            self.max_size_in_memory
        };
        (memory.min(disk), disk)
    }
}

impl fmt::Debug for TieredCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCacheConfig")
            .field("cache_location", &self.cache_location)
            .field("max_size_on_disk", &self.max_size_on_disk)
            .field("max_size_in_memory", &self.max_size_in_memory)
            .finish()
    }
}
