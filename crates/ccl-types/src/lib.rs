//! Foundation types for the Carbon Credit Ledger (CCL).
//!
//! Every other CCL crate depends on `ccl-types`. The types here mirror the
//! persisted snapshot format one-to-one, so serializing a [`Ledger`] with
//! `serde_json` produces exactly the document written to disk and served by
//! the export endpoint.
//!
//! # Key Types
//!
//! - [`LedgerEntry`]: One signed record (id, opaque payload, timestamp, signature)
//! - [`EntryId`]: Time-prefixed, randomly suffixed entry identifier
//! - [`Timestamp`]: Millisecond-precision UTC instant, ISO-8601 on the wire
//! - [`Ledger`]: Metadata header plus the ordered entry sequence
//! - [`Payload`]: The caller-supplied JSON object carried by an entry

pub mod entry;
pub mod error;
pub mod ledger;
pub mod temporal;

pub use entry::{into_payload, EntryId, LedgerEntry, Payload, CREDITS_FIELD, DEVICE_FIELD};
pub use error::TypeError;
pub use ledger::{Ledger, LedgerMetadata};
pub use temporal::Timestamp;
