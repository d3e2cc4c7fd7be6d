use serde::Serialize;

use crate::error::IngestResult;
use crate::model::{NewLedgerRecord, RowSkip, SkipReason, UnifiedTransaction};
use crate::store::{LedgerStore, StoreError};

/// Outcome of one idempotent batch: how many records are genuinely new and
/// how many were already present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpsertOutcome {
    pub inserted: i64,
    pub skipped: i64,
    /// One entry per skipped transaction; `row` is the 1-based position
    /// within the batch.
    pub skips: Vec<RowSkip>,
}

/// Inserts each transaction at most once, keyed by content hash.
///
/// Existing hashes are left untouched and counted as skipped; there is no
/// update-on-conflict, so re-uploading the same statement or an overlapping
/// export window is always non-destructive. A [`StoreError::DuplicateHash`]
/// from a losing race against the storage constraint is absorbed the same
/// way; any other store failure aborts the batch.
pub fn upsert_batch(
    store: &dyn LedgerStore,
    account_id: &str,
    transactions: &[UnifiedTransaction],
) -> IngestResult<UpsertOutcome> {
    let mut outcome = UpsertOutcome::default();

    for (index, transaction) in transactions.iter().enumerate() {
        let row = (index as i64) + 1;

        if store.find_by_hash(&transaction.hash)?.is_some() {
            record_duplicate(&mut outcome, row, transaction);
            continue;
        }

        let inserted = store.insert(NewLedgerRecord {
            bank_account_id: account_id,
            transaction,
        });
        match inserted {
            Ok(_) => outcome.inserted += 1,
            // Lost the uniqueness race to a concurrent upload. The record
            // exists, which is all idempotence requires.
            Err(StoreError::DuplicateHash) => record_duplicate(&mut outcome, row, transaction),
            Err(error) => return Err(error.into()),
        }
    }

    Ok(outcome)
}

fn record_duplicate(outcome: &mut UpsertOutcome, row: i64, transaction: &UnifiedTransaction) {
    log::warn!(
        "ledger already holds a record with hash {}, skipping",
        transaction.hash
    );
    outcome.skipped += 1;
    outcome.skips.push(RowSkip {
        row,
        reason: SkipReason::Duplicate,
        detail: format!("ledger already holds a record with hash {}", transaction.hash),
    });
}
