use serde::{Deserialize, Serialize};

use crate::entry::LedgerEntry;
use crate::error::TypeError;
use crate::temporal::Timestamp;

/// Descriptive header written once when a ledger is initialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub name: String,
    pub version: String,
    pub created: Timestamp,
    pub description: String,
}

impl LedgerMetadata {
    /// Metadata stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            created: Timestamp::now(),
            description: description.into(),
        }
    }
}

/// The complete ledger value: header plus ordered entries.
///
/// A ledger read from an empty store is a *scaffold*: no metadata and no
/// entries. Callers decide how to initialize it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<LedgerMetadata>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// An uninitialized ledger with no metadata.
    pub fn scaffold() -> Self {
        Self::default()
    }

    /// An empty ledger with the given header.
    pub fn new(metadata: LedgerMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            entries: Vec::new(),
        }
    }

    /// Returns `true` once metadata has been written.
    pub fn is_initialized(&self) -> bool {
        self.metadata.is_some()
    }

    /// Pretty-printed JSON snapshot.
    pub fn to_json_pretty(&self) -> Result<String, TypeError> {
        serde_json::to_string_pretty(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Parse a JSON snapshot.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
