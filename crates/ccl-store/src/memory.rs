use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ccl_types::{Ledger, LedgerEntry};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// In-memory ledger store for tests and embedding.
///
/// Clones share the same state, so a test can keep a handle to inspect what
/// was persisted after handing the store to a ledger. Writes can be made to
/// fail on demand to exercise error paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    snapshot: Ledger,
    journal: Vec<LedgerEntry>,
    fail_writes: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `ledger` as its snapshot.
    pub fn with_ledger(ledger: Ledger) -> Self {
        let store = Self::new();
        store.state().snapshot = ledger;
        store
    }

    /// Make every subsequent `save`/`append` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// The ledger as `load` would return it right now.
    pub fn persisted(&self) -> Ledger {
        let state = self.state();
        let mut ledger = state.snapshot.clone();
        ledger.entries.extend(state.journal.iter().cloned());
        ledger
    }

    /// Number of entries appended since the last snapshot.
    pub fn journal_len(&self) -> usize {
        self.state().journal.len()
    }

    /// Number of successful snapshot saves.
    pub fn save_count(&self) -> usize {
        self.state().saves
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writable(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self.state();
        if state.fail_writes {
            return Err(StoreError::Unavailable("memory store rejecting writes".into()));
        }
        Ok(state)
    }
}

impl LedgerStore for MemoryStore {
    fn load(&mut self) -> StoreResult<Ledger> {
        Ok(self.persisted())
    }

    fn save(&mut self, ledger: &Ledger) -> StoreResult<()> {
        let mut state = self.writable()?;
        state.snapshot = ledger.clone();
        state.journal.clear();
        state.saves += 1;
        Ok(())
    }

    fn append(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        self.writable()?.journal.push(entry.clone());
        Ok(())
    }
}
