use ccl_types::{Ledger, LedgerEntry};

use crate::error::StoreResult;

/// Durable home of a ledger.
///
/// Implementations must satisfy these invariants:
/// - `append` returns only after the entry is as durable as the backend
///   can make it; on error nothing of the entry remains.
/// - `save` replaces the stored ledger with the given value as a whole;
///   a crash during `save` leaves either the old or the new state.
/// - `load` after any sequence of successful `save`/`append` calls returns
///   the last saved ledger followed by every entry appended since, in
///   order.
///
/// Methods take `&mut self`: callers serialize writers, and the store
/// itself holds no locks.
pub trait LedgerStore: Send {
    /// Read the stored ledger.
    ///
    /// Returns a scaffold (no metadata, no entries) if nothing was ever
    /// stored; initialization is left to the caller.
    fn load(&mut self) -> StoreResult<Ledger>;

    /// Replace the stored ledger with a complete snapshot.
    fn save(&mut self, ledger: &Ledger) -> StoreResult<()>;

    /// Durably record one entry appended after the last snapshot.
    fn append(&mut self, entry: &LedgerEntry) -> StoreResult<()>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Box<S> {
    fn load(&mut self) -> StoreResult<Ledger> {
        (**self).load()
    }

    fn save(&mut self, ledger: &Ledger) -> StoreResult<()> {
        (**self).save(ledger)
    }

    fn append(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        (**self).append(entry)
    }
}
