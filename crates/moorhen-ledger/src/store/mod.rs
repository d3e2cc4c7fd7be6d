mod memory;
mod sqlite;

pub use memory::MemoryLedgerStore;
pub use sqlite::{SqliteLedgerStore, ledger_db_path, resolve_ledger_home};

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::model::{IngestRun, LedgerRecord, NewLedgerRecord};

/// Storage boundary for the ledger.
///
/// Uniqueness of the content hash is the store's responsibility; the
/// pipeline keeps no bookkeeping of its own, which is what makes concurrent
/// uploads of overlapping statements race safely.
pub trait LedgerStore {
    /// Looks a record up by content hash. The lookup is global, not scoped
    /// per account.
    fn find_by_hash(&self, hash: &str) -> Result<Option<LedgerRecord>, StoreError>;

    /// Inserts a new record, assigning identity. Returns
    /// [`StoreError::DuplicateHash`] when a record with the same hash
    /// already exists.
    fn insert(&self, record: NewLedgerRecord<'_>) -> Result<LedgerRecord, StoreError>;

    /// Writes the audit row for one committed ingestion. Stores without run
    /// bookkeeping keep the default no-op.
    fn record_run(&self, run: &IngestRun) -> Result<(), StoreError> {
        let _ = run;
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The hash uniqueness constraint rejected the insert. The upsert
    /// service counts this as a skipped row, never as a batch failure.
    #[error("a ledger record with this content hash already exists")]
    DuplicateHash,
    #[error("ledger database is locked at `{path}`")]
    Locked { path: String },
    #[error("ledger database appears corrupt at `{path}`")]
    Corrupt { path: String },
    #[error("cannot open ledger database at `{path}`: {detail}")]
    Unavailable { path: String, detail: String },
    #[error("ledger migration failed at `{path}`: {detail}")]
    Migration { path: String, detail: String },
    #[error("ledger store failure: {detail}")]
    Backend { detail: String },
}

pub(crate) fn now_timestamp() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH);
    match now {
        Ok(duration) => format!("{}", duration.as_secs()),
        Err(_) => "0".to_string(),
    }
}
