//! HTTP server for the Carbon Credit Ledger.
//!
//! A thin REST layer over [`ccl_ledger::CreditLedger`] and
//! [`ccl_ledger::CreditConverter`]. Errors are returned as `{"error": ...}`
//! with 400 for bad input, 404 for unknown entries, and 500 for storage
//! failures.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::CclServer;
