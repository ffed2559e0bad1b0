//! Signed append-only ledger for carbon credit records.
//!
//! This crate is the heart of CCL. It provides:
//! - [`CreditLedger`]: id assignment, signing and durable appends, with a
//!   single serialized writer and concurrent readers
//! - Integrity sweeps that recheck every entry signature ([`IntegrityReport`])
//! - Ledger statistics ([`LedgerStats`]) and snapshot export
//! - [`CreditConverter`]: kWh readings to credit records
//! - [`LedgerConfig`]: file-backed construction from configuration

pub mod config;
pub mod converter;
pub mod error;
pub mod integrity;
pub mod ledger;
pub mod stats;

pub use config::{ConverterConfig, LedgerConfig};
pub use converter::{ConversionStats, Coordinates, CreditConverter, Reading};
pub use error::{LedgerError, LedgerResult};
pub use integrity::IntegrityReport;
pub use ledger::{CreditLedger, LedgerOptions};
pub use stats::LedgerStats;
