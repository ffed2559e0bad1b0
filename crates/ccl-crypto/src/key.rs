use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::SignerError;

/// The process-wide secret used for every ledger signature.
///
/// Loaded once at startup. There is exactly one key per ledger; entries
/// signed under a different key will fail verification.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Create from raw key bytes. Empty keys are rejected.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SignerError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SignerError::EmptyKey);
        }
        Ok(Self(bytes))
    }

    /// Decode a hex-encoded key.
    pub fn from_hex(s: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(s.trim()).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Parses the UTF-8 bytes of a passphrase-style key.
impl FromStr for SecretKey {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes().to_vec())
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert_eq!(SecretKey::from_bytes(Vec::new()), Err(SignerError::EmptyKey));
        assert_eq!("".parse::<SecretKey>(), Err(SignerError::EmptyKey));
    }

    #[test]
    fn passphrase_uses_utf8_bytes() {
        let key: SecretKey = "s3cret".parse().unwrap();
        assert_eq!(key.as_bytes(), b"s3cret");
    }

    #[test]
    fn hex_key() {
        let key = SecretKey::from_hex("00ff10").unwrap();
        assert_eq!(key.as_bytes(), &[0x00, 0xff, 0x10]);
        assert!(matches!(SecretKey::from_hex("zz"), Err(SignerError::InvalidKey(_))));
    }

    #[test]
    fn debug_redacts_key() {
        let key: SecretKey = "do-not-print".parse().unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("do-not-print"));
    }

    #[test]
    fn deserializes_from_string() {
        let key: SecretKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(key.as_bytes(), b"abc");
        assert!(serde_json::from_str::<SecretKey>("\"\"").is_err());
    }
}
