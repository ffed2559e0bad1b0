use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use ccl_types::{LedgerEntry, Timestamp};

/// Aggregate figures over a ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_entries: usize,
    /// Distinct device ids; entries without one are not counted.
    pub total_devices: usize,
    /// Sum of the credits field; entries without one contribute zero.
    pub total_credits: f64,
    pub first_entry_date: Option<Timestamp>,
    pub last_entry_date: Option<Timestamp>,
}

impl LedgerStats {
    /// Compute statistics over entries in ledger order. First and last
    /// dates are those of the first and last entry, not the min and max.
    pub fn compute(entries: &[LedgerEntry]) -> Self {
        let devices: HashSet<&str> = entries.iter().filter_map(LedgerEntry::device_id).collect();
        Self {
            total_entries: entries.len(),
            total_devices: devices.len(),
            total_credits: entries.iter().map(LedgerEntry::credits).sum(),
            first_entry_date: entries.first().map(|e| e.timestamp),
            last_entry_date: entries.last().map(|e| e.timestamp),
        }
    }
}
