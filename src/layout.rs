//! Cache Directory Layout
//!
//! Pure path derivation for the cache root: where payload files live and
//! where the journal lives. Per-key file paths are derived by the payload
//! store, which owns the payload folder.
//!
//! Given a root `R`:
//!
//! ```text
//! R/rcache/            payload folder, one file per key
//! R/jrnl/              journal folder
//! R/jrnl/rjournal.bin  journal file
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

/// Payload folder name under the cache root.
pub(crate) const PAYLOAD_DIR: &str = "rcache";
/// Journal folder name under the cache root.
pub(crate) const JOURNAL_DIR: &str = "jrnl";
/// Journal file name inside the journal folder.
pub(crate) const JOURNAL_FILE: &str = "rjournal.bin";

/// Derives every path the cache uses from its root directory.
#[derive(Debug, Clone)]
pub(crate) struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        CacheLayout { root: root.into() }
    }

    pub(crate) fn payload_dir(&self) -> PathBuf {
        self.root.join(PAYLOAD_DIR)
    }

    pub(crate) fn journal_dir(&self) -> PathBuf {
        self.root.join(JOURNAL_DIR)
    }

    pub(crate) fn journal_file(&self) -> PathBuf {
        self.journal_dir().join(JOURNAL_FILE)
    }

    /// Creates the payload and journal folders (and the root) if missing.
    pub(crate) fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.payload_dir())?;
        fs::create_dir_all(self.journal_dir())?;
        Ok(())
    }
}
