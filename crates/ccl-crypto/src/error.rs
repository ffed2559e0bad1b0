/// Errors from key handling and signing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("secret key must not be empty")]
    EmptyKey,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("payload cannot be canonicalized: {0}")]
    Canonicalization(String),
}
