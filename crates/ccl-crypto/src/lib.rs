//! Signature engine for the Carbon Credit Ledger.
//!
//! Provides the canonical JSON encoding every signature is computed over,
//! the process-wide [`SecretKey`], and the [`Signer`] that produces and
//! checks hex-encoded keyed digests (HMAC-SHA256 or BLAKE3 keyed mode).
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod canonical;
pub mod error;
pub mod key;
pub mod signer;

pub use canonical::canonical_json;
pub use error::SignerError;
pub use key::SecretKey;
pub use signer::{SignatureAlgorithm, Signer};
