use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use ccl_types::{LedgerEntry, Payload};

use crate::canonical::canonical_json;
use crate::error::SignerError;
use crate::key::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Context string for deriving the BLAKE3 keyed-mode key from the secret.
const BLAKE3_KEY_CONTEXT: &str = "ccl 2025-01 ledger entry signature v1";

/// Keyed digest construction used for entry signatures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// HMAC over SHA-256.
    #[default]
    HmacSha256,
    /// BLAKE3 in keyed mode with a key derived from the secret.
    Blake3Keyed,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::Blake3Keyed => "blake3-keyed",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hmac-sha256" | "sha256" => Ok(Self::HmacSha256),
            "blake3-keyed" | "blake3" => Ok(Self::Blake3Keyed),
            other => Err(SignerError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Computes and checks entry signatures.
///
/// A signature is the lowercase hex encoding of a keyed digest over the
/// canonical JSON encoding of an entry's `data`. Signing is a pure function
/// of (key, algorithm, payload).
#[derive(Clone)]
pub struct Signer {
    algorithm: SignatureAlgorithm,
    key: SecretKey,
    blake3_key: [u8; 32],
}

impl Signer {
    pub fn new(key: SecretKey, algorithm: SignatureAlgorithm) -> Self {
        let blake3_key = blake3::derive_key(BLAKE3_KEY_CONTEXT, key.as_bytes());
        Self {
            algorithm,
            key,
            blake3_key,
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Sign a payload, returning the hex-encoded digest.
    pub fn sign(&self, payload: &Payload) -> Result<String, SignerError> {
        let message = canonical_payload(payload)?;
        Ok(hex::encode(self.digest(&message)?))
    }

    /// Check `signature` against a freshly computed signature of `payload`.
    ///
    /// Returns `false` for an empty or non-hex signature. Comparison is
    /// constant-time.
    pub fn verify_payload(&self, payload: &Payload, signature: &str) -> bool {
        if signature.is_empty() {
            return false;
        }
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let Ok(message) = canonical_payload(payload) else {
            return false;
        };
        match self.digest(&message) {
            Ok(expected) => expected.ct_eq(&provided).into(),
            Err(_) => false,
        }
    }

    /// Verify a stored entry. Never fails; a missing payload or signature
    /// simply does not verify.
    pub fn verify(&self, entry: &LedgerEntry) -> bool {
        self.verify_payload(&entry.data, &entry.signature)
    }

    fn digest(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        match self.algorithm {
            SignatureAlgorithm::HmacSha256 => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.as_bytes())
                    .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            SignatureAlgorithm::Blake3Keyed => {
                Ok(blake3::keyed_hash(&self.blake3_key, message).as_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &self.algorithm)
            .field("key", &self.key)
            .finish()
    }
}

fn canonical_payload(payload: &Payload) -> Result<Vec<u8>, SignerError> {
    canonical_json(&serde_json::Value::Object(payload.clone()))
}
