use ccl_crypto::SignerError;
use ccl_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger writer lock poisoned")]
    LockPoisoned,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
