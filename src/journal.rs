//! Intent Journal
//!
//! Append-only text log that makes payload mutations crash-recoverable.
//! Before the flush engine touches a payload file it appends an intent
//! record; after the filesystem call completes it appends a commit. Every
//! append is synced to the OS, so after a crash an intent without its commit
//! identifies a payload file that may be partial.
//!
//! # File format
//!
//! A fresh journal is the 8-byte header `R2D2v1.0`. Records follow, one per
//! line:
//!
//! ```text
//! R2D2v1.0
//! W: 0b0f1fd1-7b82-4a90-9d5e-8ef2d3b6a111 thumb-a 2026-08-02T10:14:03.512Z
//! C: 0b0f1fd1-7b82-4a90-9d5e-8ef2d3b6a111
//! D: 4f1f9f26-11b0-4b43-9b6b-0a3c2d2f0c02 thumb-b 2026-08-02T10:14:04.118Z
//! ```
//!
//! `W:` is intent-to-write, `D:` intent-to-delete, `C:` the commit for the
//! transaction token. Tokens are v4 UUIDs; instants are RFC-3339 and carry
//! no whitespace, so records stay space-splittable.
//!
//! Recovery scans the whole file first, then removes the payload file of
//! every intent left without a commit, then starts a fresh journal. A commit
//! that was written but lost before reaching the device makes recovery drop
//! a completed payload; that is the accepted trade-off of a single log
//! without redo.

use crate::error::CacheError;
use crate::store::PayloadStore;
use chrono::{SecondsFormat, Utc};
use hashbrown::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// First bytes of every fresh journal file.
pub(crate) const JOURNAL_HEADER: &str = "R2D2v1.0";

/// Append-only intent log backed by a single file.
#[derive(Debug)]
pub(crate) struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Opens the journal at `path`, creating it with a fresh header if it
    /// does not exist. An existing file is opened for appending untouched;
    /// run [`recover`](Self::recover) before trusting the disk tier.
    pub(crate) fn open(path: PathBuf) -> Result<Journal, CacheError> {
        let file = match OpenOptions::new().append(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut file = File::create(&path)?;
                file.write_all(JOURNAL_HEADER.as_bytes())?;
                file.sync_data()?;
                file
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Journal { path, file })
    }

    /// Records the intent to write or update `key`. Returns the transaction
    /// token to pass to [`commit`](Self::commit) once the payload write
    /// completed.
    pub(crate) fn begin_write(&mut self, key: &str) -> Result<Uuid, CacheError> {
        self.begin(b'W', key)
    }

    /// Records the intent to delete `key`.
    pub(crate) fn begin_delete(&mut self, key: &str) -> Result<Uuid, CacheError> {
        self.begin(b'D', key)
    }

    fn begin(&mut self, tag: u8, key: &str) -> Result<Uuid, CacheError> {
        let id = Uuid::new_v4();
        let instant = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.append(&format!("{}: {} {} {}", tag as char, id, key, instant))?;
        Ok(id)
    }

    /// Marks the transaction as completed.
    pub(crate) fn commit(&mut self, id: Uuid) -> Result<(), CacheError> {
        self.append(&format!("C: {id}"))
    }

    fn append(&mut self, record: &str) -> Result<(), CacheError> {
        self.file.write_all(b"\n")?;
        self.file.write_all(record.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Returns the raw journal lines, header included.
    pub(crate) fn read_all(&self) -> io::Result<Vec<String>> {
        let text = fs::read_to_string(&self.path)?;
        Ok(text.lines().map(str::to_owned).collect())
    }

    /// Deletes the journal file and writes a fresh one containing only the
    /// header.
    pub(crate) fn reset(&mut self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut file = File::create(&self.path)?;
        file.write_all(JOURNAL_HEADER.as_bytes())?;
        file.sync_data()?;
        self.file = file;
        Ok(())
    }

    /// Rolls back uncommitted intents against the payload store, then starts
    /// a fresh journal. Returns the number of intents rolled back.
    ///
    /// The scan runs over the complete file before any cleanup, so an intent
    /// whose commit appears later in the file is never treated as pending.
    /// Malformed lines are skipped; a journal that cannot be read at all is
    /// simply replaced.
    pub(crate) fn recover(&mut self, store: &PayloadStore) -> Result<usize, CacheError> {
        let lines = match self.read_all() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "journal unreadable, starting fresh");
                self.reset()?;
                return Ok(0);
            }
        };

        let mut pending: HashMap<String, String> = HashMap::new();
        for line in &lines {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("W:") | Some("D:") => {
                    let (Some(id), Some(key)) = (fields.next(), fields.next()) else {
                        debug!(line = %line, "skipping malformed intent record");
                        continue;
                    };
                    pending.insert(id.to_owned(), key.to_owned());
                }
                Some("C:") => {
                    let Some(id) = fields.next() else {
                        debug!(line = %line, "skipping malformed commit record");
                        continue;
                    };
                    pending.remove(id);
                }
                // Header line or garbage; neither affects recovery.
                _ => {}
            }
        }

        let rolled_back = pending.len();
        for (id, key) in &pending {
            debug!(txn = %id, key = %key, "rolling back uncommitted intent");
            if let Err(e) = store.delete(key) {
                warn!(key = %key, error = %e, "failed to remove partial payload");
            }
        }

        self.reset()?;
        if rolled_back > 0 {
            info!(count = rolled_back, "journal recovery rolled back uncommitted intents");
        }
        Ok(rolled_back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> (tempfile::TempDir, Journal, PayloadStore) {
        let tmp = tempfile::tempdir().unwrap();
        let journal = Journal::open(tmp.path().join("rjournal.bin")).unwrap();
        let store = PayloadStore::new(tmp.path().to_path_buf());
        (tmp, journal, store)
    }

    #[test]
    fn test_fresh_journal_is_just_the_header() {
        let (_tmp, journal, _) = journal();
        assert_eq!(journal.read_all().unwrap(), vec![JOURNAL_HEADER.to_string()]);
    }

    #[test]
    fn test_record_shapes() {
        let (_tmp, mut journal, _) = journal();
        let wid = journal.begin_write("some-key").unwrap();
        journal.commit(wid).unwrap();
        let did = journal.begin_delete("other-key").unwrap();

        let lines = journal.read_all().unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], JOURNAL_HEADER);

        let w: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(w[0], "W:");
        assert_eq!(w[1], wid.to_string());
        assert_eq!(w[2], "some-key");
        assert_eq!(w.len(), 4, "instant must not contain whitespace");

        assert_eq!(lines[2], format!("C: {wid}"));

        let d: Vec<&str> = lines[3].split_whitespace().collect();
        assert_eq!(d[0], "D:");
        assert_eq!(d[1], did.to_string());
        assert_eq!(d[2], "other-key");
    }

    #[test]
    fn test_reset_leaves_only_header() {
        let (_tmp, mut journal, _) = journal();
        let id = journal.begin_write("k").unwrap();
        journal.commit(id).unwrap();
        journal.reset().unwrap();
        assert_eq!(journal.read_all().unwrap(), vec![JOURNAL_HEADER.to_string()]);

        // The journal accepts appends after a reset
        journal.begin_write("k2").unwrap();
        assert_eq!(journal.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_recover_removes_uncommitted_payload() {
        let (_tmp, mut journal, store) = journal();
        store.write("committed", b"keep").unwrap();
        store.write("partial", b"drop").unwrap();

        let id = journal.begin_write("committed").unwrap();
        journal.commit(id).unwrap();
        journal.begin_write("partial").unwrap();

        let rolled_back = journal.recover(&store).unwrap();
        assert_eq!(rolled_back, 1);
        assert!(store.read("committed").unwrap().is_some());
        assert!(store.read("partial").unwrap().is_none());

        // Recovery ends with a fresh journal
        assert_eq!(journal.read_all().unwrap(), vec![JOURNAL_HEADER.to_string()]);
    }

    #[test]
    fn test_recover_honors_commit_later_in_file() {
        let (_tmp, mut journal, store) = journal();
        store.write("a", b"a").unwrap();
        store.write("b", b"b").unwrap();

        let ida = journal.begin_write("a").unwrap();
        let idb = journal.begin_write("b").unwrap();
        journal.commit(ida).unwrap();
        journal.commit(idb).unwrap();

        assert_eq!(journal.recover(&store).unwrap(), 0);
        assert!(store.read("a").unwrap().is_some());
        assert!(store.read("b").unwrap().is_some());
    }

    #[test]
    fn test_recover_skips_malformed_lines() {
        let (tmp, mut journal, store) = journal();
        store.write("k", b"k").unwrap();

        let path = tmp.path().join("rjournal.bin");
        fs::write(
            &path,
            "R2D2v1.0\ngarbage line\nW:\nC:\nW: not-a-real-journal\n",
        )
        .unwrap();

        // "W: not-a-real-journal" has a token but no key field, so nothing
        // is pending and the stored payload survives
        assert_eq!(journal.recover(&store).unwrap(), 0);
        assert!(store.read("k").unwrap().is_some());
    }

    #[test]
    fn test_recover_uncommitted_delete_intent() {
        let (_tmp, mut journal, store) = journal();
        store.write("victim", b"v").unwrap();
        journal.begin_delete("victim").unwrap();

        // A delete whose commit never landed may or may not have removed the
        // file; recovery removes it either way, which is idempotent.
        assert_eq!(journal.recover(&store).unwrap(), 1);
        assert!(store.read("victim").unwrap().is_none());
    }

    #[test]
    fn test_recover_twice_is_idempotent() {
        let (_tmp, mut journal, store) = journal();
        store.write("partial", b"drop").unwrap();
        journal.begin_write("partial").unwrap();

        assert_eq!(journal.recover(&store).unwrap(), 1);
        assert_eq!(journal.recover(&store).unwrap(), 0);
        assert!(store.read("partial").unwrap().is_none());
    }

    #[test]
    fn test_reopen_preserves_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rjournal.bin");

        let mut journal = Journal::open(path.clone()).unwrap();
        let id = journal.begin_write("k").unwrap();
        drop(journal);

        let journal = Journal::open(path).unwrap();
        let lines = journal.read_all().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(&id.to_string()));
    }
}
