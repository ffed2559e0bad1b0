use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use ccl_crypto::{SecretKey, SignatureAlgorithm, Signer};
use ccl_store::{FileStore, SyncMode};

use crate::converter::{CreditConverter, DEFAULT_EMISSION_FACTOR};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{CreditLedger, LedgerOptions};

/// The `[ledger]` configuration section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding `ledger.json` and `ledger.journal`.
    pub data_dir: PathBuf,
    /// Signing key. Required; there is no built-in fallback.
    pub secret_key: Option<SecretKey>,
    pub algorithm: SignatureAlgorithm,
    pub id_prefix: String,
    pub checkpoint_every: usize,
    pub sync: SyncMode,
    pub name: String,
    pub description: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let options = LedgerOptions::default();
        Self {
            data_dir: PathBuf::from("data"),
            secret_key: None,
            algorithm: SignatureAlgorithm::default(),
            id_prefix: options.id_prefix,
            checkpoint_every: options.checkpoint_every,
            sync: SyncMode::default(),
            name: options.name,
            description: options.description,
        }
    }
}

impl LedgerConfig {
    /// Build the signer; fails when no key is configured.
    pub fn signer(&self) -> LedgerResult<Signer> {
        let key = self.secret_key.clone().ok_or_else(|| {
            LedgerError::Config("no secret key configured (set ledger.secret_key or CCL_SECRET_KEY)".into())
        })?;
        Ok(Signer::new(key, self.algorithm))
    }

    pub fn options(&self) -> LedgerOptions {
        LedgerOptions {
            id_prefix: self.id_prefix.clone(),
            checkpoint_every: self.checkpoint_every,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Open the file-backed ledger described by this configuration.
    pub fn open(&self) -> LedgerResult<CreditLedger> {
        let signer = self.signer()?;
        debug!(dir = %self.data_dir.display(), algorithm = %self.algorithm, "opening ledger");
        let store = FileStore::open(&self.data_dir, self.sync)?;
        CreditLedger::open(store, signer, self.options())
    }
}

/// The `[converter]` configuration section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub emission_factor: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            emission_factor: DEFAULT_EMISSION_FACTOR,
        }
    }
}

impl ConverterConfig {
    pub fn converter(&self) -> LedgerResult<CreditConverter> {
        CreditConverter::new(self.emission_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let c = LedgerConfig::default();
        assert_eq!(c.data_dir, PathBuf::from("data"));
        assert_eq!(c.id_prefix, "ccl");
        assert_eq!(c.checkpoint_every, 100);
        assert_eq!(c.algorithm, SignatureAlgorithm::HmacSha256);
        assert_eq!(c.sync, SyncMode::EveryWrite);
        assert!(c.secret_key.is_none());
        assert_eq!(ConverterConfig::default().emission_factor, 1.0);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = LedgerConfig::default().signer().unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let c: LedgerConfig = serde_json::from_value(json!({
            "secret_key": "s3cret",
            "algorithm": "blake3-keyed",
            "sync": "os-default"
        }))
        .unwrap();
        assert_eq!(c.algorithm, SignatureAlgorithm::Blake3Keyed);
        assert_eq!(c.sync, SyncMode::OsDefault);
        assert_eq!(c.id_prefix, "ccl");
        assert_eq!(c.signer().unwrap().algorithm(), SignatureAlgorithm::Blake3Keyed);
    }

    #[test]
    fn open_creates_data_dir_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            data_dir: dir.path().join("ledger"),
            secret_key: Some("k".parse().unwrap()),
            id_prefix: "test".into(),
            ..LedgerConfig::default()
        };
        let ledger = config.open().unwrap();
        let entry = ledger.add_entry(json!({"deviceId": "d"})).unwrap();
        assert!(entry.id.as_str().starts_with("test-"));
        assert!(dir.path().join("ledger").join("ledger.json").exists());
    }

    #[test]
    fn converter_factor_is_validated() {
        let bad = ConverterConfig { emission_factor: 0.0 };
        assert!(bad.converter().is_err());
        assert_eq!(ConverterConfig { emission_factor: 0.4 }.converter().unwrap().emission_factor(), 0.4);
    }
}
