//! Payload Store
//!
//! Thin wrapper over the filesystem for the disk tier: one file per key
//! under the payload folder, file name = key, content = raw payload bytes.
//! No locking of its own; callers hold the cache lock.

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::warn;

/// One payload file as seen by [`PayloadStore::list`].
#[derive(Debug, Clone)]
pub(crate) struct PayloadFile {
    pub(crate) key: String,
    pub(crate) size: u64,
    pub(crate) modified: SystemTime,
}

/// Filesystem operations on the payload folder.
#[derive(Debug, Clone)]
pub(crate) struct PayloadStore {
    dir: PathBuf,
}

impl PayloadStore {
    pub(crate) fn new(dir: PathBuf) -> Self {
        PayloadStore { dir }
    }

    /// Payload file path for `key`.
    pub(crate) fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Reads the payload for `key`; `Ok(None)` when no file exists.
    pub(crate) fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Truncate-writes the payload for `key`, returning its path.
    pub(crate) fn write(&self, key: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path(key);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Removes the payload file for `key`. An already-absent file is success.
    pub(crate) fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Lists the direct children of the payload folder (non-recursive).
    ///
    /// Entries that cannot be stat'ed, or whose name is not valid UTF-8,
    /// are skipped with a warning rather than failing the listing.
    pub(crate) fn list(&self) -> io::Result<Vec<PayloadFile>> {
        let mut files = Vec::new();
        for dirent in fs::read_dir(&self.dir)? {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable payload dir entry");
                    continue;
                }
            };
            let meta = match dirent.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %dirent.path().display(), error = %e, "skipping unstat'able payload");
                    continue;
                }
            };
            let Ok(key) = dirent.file_name().into_string() else {
                warn!(path = %dirent.path().display(), "skipping payload with non-utf8 name");
                continue;
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(PayloadFile {
                key,
                size: meta.len(),
                modified,
            });
        }
        Ok(files)
    }

    /// Byte-sum of all payload files.
    pub(crate) fn total_size(&self) -> io::Result<u64> {
        Ok(self.list()?.iter().map(|f| f.size).sum())
    }

    /// Stamps the payload file for `key` with the given modification time,
    /// used to mirror in-memory recency on disk. A missing file is a no-op.
    pub(crate) fn set_mtime(&self, key: &str, mtime: SystemTime) -> io::Result<()> {
        let file = match File::options().write(true).open(self.path(key)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        file.set_modified(mtime)
    }
}
