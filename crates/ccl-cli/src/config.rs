use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use ccl_crypto::SecretKey;
use ccl_ledger::{ConverterConfig, LedgerConfig};
use ccl_server::ServerConfig;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ccl.toml";

/// Full application configuration (`ccl.toml`).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
    pub converter: ConverterConfig,
}

impl AppConfig {
    /// Load from `path`, or from `./ccl.toml` if it exists, or defaults;
    /// then apply `CCL_*` environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides looked up by variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CCL_SECRET_KEY") {
            self.ledger.secret_key = Some(key.parse::<SecretKey>().context("CCL_SECRET_KEY")?);
        }
        if let Some(dir) = lookup("CCL_DATA_DIR") {
            self.ledger.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("CCL_BIND_ADDR") {
            self.server.bind_addr = addr
                .parse()
                .with_context(|| format!("CCL_BIND_ADDR: invalid address {addr:?}"))?;
        }
        if let Some(factor) = lookup("CCL_EMISSION_FACTOR") {
            self.converter.emission_factor = factor
                .parse()
                .with_context(|| format!("CCL_EMISSION_FACTOR: invalid number {factor:?}"))?;
        }
        Ok(())
    }
}
