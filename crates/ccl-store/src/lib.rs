//! Durable storage for the Carbon Credit Ledger.
//!
//! The ledger is persisted as two files inside a data directory:
//!
//! - `ledger.json` -- the full snapshot (metadata + every entry), replaced
//!   atomically via write-to-temp, fsync, rename.
//! - `ledger.journal` -- entries appended since the last snapshot, each in
//!   its own length + CRC32 frame, flushed before the append returns.
//!
//! Appends only touch the journal, so their cost does not grow with the
//! ledger. A checkpoint rewrites the snapshot and empties the journal.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`FileStore`] -- journal + snapshot on the local filesystem
//! - [`MemoryStore`] -- in-process store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every I/O error is propagated, never logged and dropped.
//! 2. A failed append leaves no partial frame behind.
//! 3. A torn trailing frame (crash mid-append) is discarded on recovery;
//!    damage anywhere else is a hard error.
//! 4. The store never interprets entry payloads.

pub mod error;
pub mod file;
pub mod journal;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use journal::{Journal, SyncMode};
pub use memory::MemoryStore;
pub use traits::LedgerStore;
