use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use ccl_types::{Ledger, LedgerEntry};

use crate::error::{StoreError, StoreResult};
use crate::journal::{Journal, SyncMode};
use crate::snapshot::{read_snapshot, write_snapshot};
use crate::traits::LedgerStore;

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "ledger.json";
/// Journal file name inside the data directory.
pub const JOURNAL_FILE: &str = "ledger.journal";
/// Lock file held exclusively while a store is open.
pub const LOCK_FILE: &str = "LOCK";

/// Directory-backed ledger store: atomic snapshot plus entry journal.
///
/// One store per directory: `open` takes an exclusive lock on
/// [`LOCK_FILE`], released when the store is dropped.
pub struct FileStore {
    dir: PathBuf,
    snapshot_path: PathBuf,
    journal: Journal,
    _lock: File,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, sync_mode: SyncMode) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let lock = lock_dir(&dir)?;
        let journal = Journal::open(&dir.join(JOURNAL_FILE), sync_mode)?;
        info!(dir = %dir.display(), ?sync_mode, "file store opened");
        Ok(Self {
            snapshot_path: dir.join(SNAPSHOT_FILE),
            dir,
            journal,
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }
}

fn lock_dir(dir: &Path) -> StoreResult<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;
    file.try_lock_exclusive().map_err(|e| StoreError::Locked {
        dir: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(file)
}

impl LedgerStore for FileStore {
    fn load(&mut self) -> StoreResult<Ledger> {
        let mut ledger = read_snapshot(&self.snapshot_path)?.unwrap_or_default();
        let mut known: HashSet<_> = ledger.entries.iter().map(|e| e.id.clone()).collect();
        let snapshot_len = ledger.entries.len();

        // A crash between writing the snapshot and truncating the journal
        // leaves entries in both; the snapshot copy wins.
        for entry in self.journal.recover()? {
            if known.insert(entry.id.clone()) {
                ledger.entries.push(entry);
            } else {
                debug!(id = %entry.id, "journal entry already in snapshot");
            }
        }

        info!(
            snapshot_entries = snapshot_len,
            journal_entries = ledger.entries.len() - snapshot_len,
            "ledger loaded"
        );
        Ok(ledger)
    }

    fn save(&mut self, ledger: &Ledger) -> StoreResult<()> {
        write_snapshot(&self.snapshot_path, ledger)?;
        self.journal.truncate()?;
        debug!(entries = ledger.entries.len(), "checkpoint complete");
        Ok(())
    }

    fn append(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        self.journal.append(entry).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccl_types::{into_payload, EntryId, LedgerMetadata, Timestamp};
    use serde_json::json;

    fn entry(n: u32) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(format!("f-{n}-abcdef0{n}")),
            data: into_payload(json!({"deviceId": format!("sim-{}", n % 2), "carbonCredits": n}))
                .unwrap(),
            timestamp: Timestamp::now(),
            signature: "00".repeat(32),
        }
    }

    fn initialized() -> Ledger {
        Ledger::new(LedgerMetadata::new("File", "1.0.0", "file store test"))
    }

    #[test]
    fn empty_directory_loads_scaffold() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        assert_eq!(store.load().unwrap(), Ledger::scaffold());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = initialized();
        ledger.entries.extend((1..=3).map(entry));

        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        store.save(&ledger).unwrap();
        drop(store);

        let mut reopened = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        assert_eq!(reopened.load().unwrap(), ledger);
    }

    #[test]
    fn appended_entries_follow_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = initialized();
        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        store.save(&ledger).unwrap();

        for n in 1..=2 {
            let e = entry(n);
            store.append(&e).unwrap();
            ledger.entries.push(e);
        }
        drop(store);

        let mut reopened = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        assert_eq!(reopened.load().unwrap(), ledger);
    }

    #[test]
    fn save_empties_the_journal() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = initialized();
        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        let e = entry(1);
        store.append(&e).unwrap();
        ledger.entries.push(e);
        store.save(&ledger).unwrap();

        assert_eq!(fs::metadata(store.journal_path()).unwrap().len(), 0);
        assert_eq!(store.load().unwrap(), ledger);
    }

    #[test]
    fn entries_in_both_snapshot_and_journal_load_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = initialized();
        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        let e = entry(1);
        store.append(&e).unwrap();
        ledger.entries.push(e);
        // Simulate a crash after the snapshot rename but before truncation.
        write_snapshot(store.snapshot_path(), &ledger).unwrap();

        assert_eq!(store.load().unwrap(), ledger);
    }

    #[test]
    fn snapshot_is_plain_json_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = initialized();
        ledger.entries.push(entry(5));
        let mut store = FileStore::open(dir.path(), SyncMode::OsDefault).unwrap();
        store.save(&ledger).unwrap();

        let text = fs::read_to_string(dir.path().join(SNAPSHOT_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["metadata"]["name"], "File");
        assert_eq!(value["entries"][0]["data"]["carbonCredits"], 5);
    }

    #[test]
    fn second_open_on_a_locked_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        let e = entry(1);
        store.append(&e).unwrap();

        let err = FileStore::open(dir.path(), SyncMode::EveryWrite).err().unwrap();
        assert!(matches!(err, StoreError::Locked { .. }));

        drop(store);
        let mut reopened = FileStore::open(dir.path(), SyncMode::EveryWrite).unwrap();
        assert_eq!(reopened.load().unwrap().entries, vec![e]);
    }
}
