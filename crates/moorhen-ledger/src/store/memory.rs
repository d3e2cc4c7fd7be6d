use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ulid::Ulid;

use crate::model::{IngestRun, LedgerRecord, NewLedgerRecord};
use crate::store::{LedgerStore, StoreError, now_timestamp};

/// Hash-keyed in-memory ledger.
///
/// The double the pipeline is tested against, and a real option for
/// embedders that keep the ledger elsewhere and only need dedup semantics
/// in process.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: Vec<LedgerRecord>,
    index_by_hash: HashMap<String, usize>,
    runs: Vec<IngestRun>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger records in insertion order.
    pub fn records(&self) -> Vec<LedgerRecord> {
        match self.lock() {
            Ok(inner) => inner.records.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Audit rows in insertion order.
    pub fn runs(&self) -> Vec<IngestRun> {
        match self.lock() {
            Ok(inner) => inner.runs.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self.lock() {
            Ok(inner) => inner.records.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Backend {
            detail: "in-memory ledger lock was poisoned".to_string(),
        })
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn find_by_hash(&self, hash: &str) -> Result<Option<LedgerRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .index_by_hash
            .get(hash)
            .map(|index| inner.records[*index].clone()))
    }

    fn insert(&self, record: NewLedgerRecord<'_>) -> Result<LedgerRecord, StoreError> {
        let mut inner = self.lock()?;
        if inner.index_by_hash.contains_key(&record.transaction.hash) {
            return Err(StoreError::DuplicateHash);
        }

        let stored = LedgerRecord {
            record_id: format!("txn_{}", Ulid::new()),
            bank_account_id: record.bank_account_id.to_string(),
            transaction: record.transaction.clone(),
            created_at: now_timestamp(),
        };

        let position = inner.records.len();
        inner
            .index_by_hash
            .insert(stored.transaction.hash.clone(), position);
        inner.records.push(stored.clone());
        Ok(stored)
    }

    fn record_run(&self, run: &IngestRun) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.runs.push(run.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::model::{Currency, NewLedgerRecord, UnifiedTransaction};
    use crate::store::{LedgerStore, StoreError};

    use super::MemoryLedgerStore;

    fn transaction(hash: &str) -> UnifiedTransaction {
        UnifiedTransaction {
            external_id: None,
            posted_on: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or_default(),
            description: "Tesco Stores".to_string(),
            amount: -50.0,
            currency: Currency::Gbp,
            fee: None,
            status: "completed".to_string(),
            category: None,
            reference: None,
            hash: hash.to_string(),
        }
    }

    #[test]
    fn insert_assigns_identity_and_find_by_hash_returns_it() {
        let store = MemoryLedgerStore::new();
        let candidate = transaction("abc123");

        let inserted = store.insert(NewLedgerRecord {
            bank_account_id: "acct_1",
            transaction: &candidate,
        });
        assert!(inserted.is_ok());
        if let Ok(record) = inserted {
            assert!(record.record_id.starts_with("txn_"));
            assert_eq!(record.bank_account_id, "acct_1");
        }

        let found = store.find_by_hash("abc123");
        assert!(found.is_ok());
        if let Ok(found) = found {
            assert!(found.is_some());
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_insert_with_the_same_hash_is_rejected() {
        let store = MemoryLedgerStore::new();
        let candidate = transaction("abc123");

        let first = store.insert(NewLedgerRecord {
            bank_account_id: "acct_1",
            transaction: &candidate,
        });
        assert!(first.is_ok());

        let second = store.insert(NewLedgerRecord {
            bank_account_id: "acct_2",
            transaction: &candidate,
        });
        assert!(matches!(second, Err(StoreError::DuplicateHash)));
        assert_eq!(store.len(), 1);
    }
}
