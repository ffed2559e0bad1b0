use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use ccl_crypto::{Signer, SignerError};
use ccl_store::LedgerStore;
use ccl_types::{into_payload, EntryId, Ledger, LedgerEntry, LedgerMetadata, Payload, Timestamp};

use crate::error::{LedgerError, LedgerResult};
use crate::integrity::IntegrityReport;
use crate::stats::LedgerStats;

/// Version string written into the metadata of new ledgers.
pub const LEDGER_FORMAT_VERSION: &str = "1.0.0";

/// Tunables for a [`CreditLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Prefix of generated entry ids.
    pub id_prefix: String,
    /// Write a full snapshot after this many journaled appends (0 = never
    /// automatically).
    pub checkpoint_every: usize,
    /// Name recorded when a new ledger is initialized.
    pub name: String,
    /// Description recorded when a new ledger is initialized.
    pub description: String,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            id_prefix: "ccl".into(),
            checkpoint_every: 100,
            name: "Carbon Credit Ledger".into(),
            description: "Signed ledger of carbon credits derived from renewable generation".into(),
        }
    }
}

/// Writer-side state: only the thread holding this lock may append.
struct WriterState {
    store: Box<dyn LedgerStore>,
    since_checkpoint: usize,
}

/// Reader-side state: what queries see.
struct LedgerState {
    metadata: LedgerMetadata,
    entries: Vec<LedgerEntry>,
    ids: HashSet<EntryId>,
}

/// The signed append-only ledger.
///
/// One instance owns one store. Appends are serialized through the writer
/// lock: id assignment, signing, the durable store append, and the
/// in-memory push happen for one entry at a time, and the in-memory push
/// only happens once the store has accepted the entry. Queries take a
/// shared lock on the in-memory state and never touch the store, so they
/// are not blocked by a slow fsync.
pub struct CreditLedger {
    signer: Signer,
    options: LedgerOptions,
    writer: Mutex<WriterState>,
    state: RwLock<LedgerState>,
}

impl CreditLedger {
    /// Load the ledger held by `store`, initializing it if the store is
    /// empty.
    pub fn open<S>(store: S, signer: Signer, options: LedgerOptions) -> LedgerResult<Self>
    where
        S: LedgerStore + 'static,
    {
        let mut store: Box<dyn LedgerStore> = Box::new(store);
        let loaded = store.load()?;

        let metadata = match loaded.metadata {
            Some(metadata) => metadata,
            None => {
                let metadata = LedgerMetadata::new(
                    options.name.clone(),
                    LEDGER_FORMAT_VERSION,
                    options.description.clone(),
                );
                store.save(&Ledger {
                    metadata: Some(metadata.clone()),
                    entries: loaded.entries.clone(),
                })?;
                info!(name = %metadata.name, "initialized new ledger");
                metadata
            }
        };

        let ids = loaded.entries.iter().map(|e| e.id.clone()).collect::<HashSet<_>>();
        if ids.len() != loaded.entries.len() {
            warn!(
                entries = loaded.entries.len(),
                distinct_ids = ids.len(),
                "stored ledger contains duplicate entry ids"
            );
        }
        info!(
            entries = loaded.entries.len(),
            algorithm = %signer.algorithm(),
            "ledger opened"
        );

        Ok(Self {
            signer,
            options,
            writer: Mutex::new(WriterState {
                store,
                since_checkpoint: 0,
            }),
            state: RwLock::new(LedgerState {
                metadata,
                entries: loaded.entries,
                ids,
            }),
        })
    }

    /// Append a new signed entry for an arbitrary JSON payload.
    ///
    /// The payload must be a JSON object.
    pub fn add_entry(&self, payload: Value) -> LedgerResult<LedgerEntry> {
        let payload =
            into_payload(payload).map_err(|e| LedgerError::MalformedPayload(e.to_string()))?;
        self.add_payload(payload)
    }

    /// Append a new signed entry.
    ///
    /// Returns only once the entry is durably stored. If the store rejects
    /// the write the error is returned and the ledger is unchanged.
    pub fn add_payload(&self, payload: Payload) -> LedgerResult<LedgerEntry> {
        let mut writer = self.lock_writer()?;

        let signature = self.signer.sign(&payload).map_err(|e| match e {
            SignerError::Canonicalization(reason) => LedgerError::MalformedPayload(reason),
            other => LedgerError::Signing(other),
        })?;
        let timestamp = Timestamp::now();
        let id = self.fresh_id(timestamp);
        let entry = LedgerEntry {
            id,
            data: payload,
            timestamp,
            signature,
        };

        writer.store.append(&entry)?;
        {
            let mut state = self.write_state();
            state.ids.insert(entry.id.clone());
            state.entries.push(entry.clone());
        }
        writer.since_checkpoint += 1;
        info!(id = %entry.id, device = ?entry.device_id(), "entry appended");

        if self.options.checkpoint_every > 0
            && writer.since_checkpoint >= self.options.checkpoint_every
        {
            // The entry is already durable in the journal; a failed
            // checkpoint is retried on the next append.
            if let Err(e) = self.checkpoint_locked(&mut writer) {
                warn!(error = %e, pending = writer.since_checkpoint, "automatic checkpoint failed");
            }
        }

        Ok(entry)
    }

    /// Write a full snapshot and reset the journal.
    pub fn checkpoint(&self) -> LedgerResult<()> {
        let mut writer = self.lock_writer()?;
        self.checkpoint_locked(&mut writer)
    }

    fn checkpoint_locked(&self, writer: &mut WriterState) -> LedgerResult<()> {
        let snapshot = self.snapshot();
        writer.store.save(&snapshot)?;
        debug!(entries = snapshot.entries.len(), journaled = writer.since_checkpoint, "checkpoint");
        writer.since_checkpoint = 0;
        Ok(())
    }

    /// Generate an id not yet used in this ledger. Caller holds the writer
    /// lock, so no other id can be inserted concurrently.
    fn fresh_id(&self, at: Timestamp) -> EntryId {
        let state = self.read_state();
        loop {
            let id = EntryId::generate(&self.options.id_prefix, at);
            if !state.ids.contains(&id) {
                return id;
            }
            debug!(%id, "entry id collision; regenerating");
        }
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.read_state().entries.clone()
    }

    /// The entry with the given id, if any.
    pub fn entry(&self, id: &str) -> Option<LedgerEntry> {
        self.read_state()
            .entries
            .iter()
            .find(|e| e.id == *id)
            .cloned()
    }

    /// Entries whose payload names `device_id`, in insertion order.
    pub fn entries_by_device(&self, device_id: &str) -> Vec<LedgerEntry> {
        self.read_state()
            .entries
            .iter()
            .filter(|e| e.device_id() == Some(device_id))
            .cloned()
            .collect()
    }

    /// Recheck every entry signature.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let report = IntegrityReport::sweep(&self.signer, &self.read_state().entries);
        if report.is_intact() {
            debug!(entries = report.total_entries, "integrity sweep clean");
        } else {
            warn!(
                invalid = report.invalid_entries,
                ids = ?report.invalid_ids,
                "integrity sweep found entries with invalid signatures"
            );
        }
        report
    }

    /// Aggregate statistics over all entries.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats::compute(&self.read_state().entries)
    }

    /// The complete ledger value.
    pub fn snapshot(&self) -> Ledger {
        let state = self.read_state();
        Ledger {
            metadata: Some(state.metadata.clone()),
            entries: state.entries.clone(),
        }
    }

    /// The complete ledger as a pretty-printed JSON document.
    pub fn export(&self) -> LedgerResult<String> {
        self.snapshot()
            .to_json_pretty()
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn metadata(&self) -> LedgerMetadata {
        self.read_state().metadata.clone()
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    fn lock_writer(&self) -> LedgerResult<MutexGuard<'_, WriterState>> {
        self.writer.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    // The in-memory state only changes by a single push, so it is
    // consistent even if a holder panicked.
    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
