use serde::{Deserialize, Serialize};

use ccl_crypto::Signer;
use ccl_types::{EntryId, LedgerEntry};

/// Result of rechecking every entry signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub invalid_entries: usize,
    /// Ids of failing entries, in ledger order.
    pub invalid_ids: Vec<EntryId>,
}

impl IntegrityReport {
    /// Verify each entry in `entries` against `signer`.
    pub fn sweep(signer: &Signer, entries: &[LedgerEntry]) -> Self {
        let invalid_ids: Vec<EntryId> = entries
            .iter()
            .filter(|entry| !signer.verify(entry))
            .map(|entry| entry.id.clone())
            .collect();
        Self {
            total_entries: entries.len(),
            valid_entries: entries.len() - invalid_ids.len(),
            invalid_entries: invalid_ids.len(),
            invalid_ids,
        }
    }

    /// True when no entry failed verification.
    pub fn is_intact(&self) -> bool {
        self.invalid_entries == 0
    }
}
