use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use ccl_types::Ledger;

use crate::error::{StoreError, StoreResult};

/// Read a snapshot file. Returns `Ok(None)` if it does not exist.
pub fn read_snapshot(path: &Path) -> StoreResult<Option<Ledger>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let ledger = Ledger::from_json(&bytes).map_err(|e| StoreError::CorruptSnapshot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Some(ledger))
}

/// Atomically replace the snapshot at `path`.
///
/// The document is written to a temporary file in the same directory,
/// synced, and renamed over the target; the directory is synced afterwards
/// so the rename itself is durable.
pub fn write_snapshot(path: &Path, ledger: &Ledger) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut document = ledger
        .to_json_pretty()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    document.push('\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(document.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    sync_dir(dir)?;

    debug!(path = %path.display(), entries = ledger.entries.len(), bytes = document.len(), "snapshot written");
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
