use serde::Serialize;
use ulid::Ulid;

use crate::error::{IngestError, IngestResult};
use crate::model::{IngestRun, RowSkip};
use crate::parse;
use crate::provider::Provider;
use crate::refresh::RefreshSink;
use crate::store::{LedgerStore, now_timestamp};
use crate::upsert;

/// Result of one upload. `count` is newly inserted records only, never the
/// total number of rows in the file; re-uploading a statement that is fully
/// present reports `count == 0`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub count: i64,
    pub skipped: i64,
    pub rows_read: i64,
    pub run_id: String,
    /// Malformed and duplicate rows, ordered by source row.
    pub skips: Vec<RowSkip>,
}

/// Entry point tying the pipeline together for one uploaded statement:
/// parse → normalize → upsert.
///
/// Collaborators arrive by injection; the orchestrator holds no state of its
/// own, so one instance can serve any number of calls.
pub struct Ingestor<'a> {
    store: &'a dyn LedgerStore,
    refresh: Option<&'a dyn RefreshSink>,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            refresh: None,
        }
    }

    /// Registers a collaborator to poke after ingestions that changed the
    /// ledger.
    pub fn with_refresh_sink(mut self, refresh: &'a dyn RefreshSink) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Ingests one uploaded statement for `account_id`.
    ///
    /// Structural problems (empty upload, blank account id, unrecognized
    /// header layout) fail the whole call; row-level problems inside the
    /// batch are absorbed as skips. Account existence is trusted to the
    /// caller and the storage layer's foreign-key constraint.
    pub fn ingest(
        &self,
        contents: &str,
        provider: Provider,
        account_id: &str,
    ) -> IngestResult<IngestOutcome> {
        if contents.trim().is_empty() {
            return Err(IngestError::missing_input("statement file contents"));
        }
        if account_id.trim().is_empty() {
            return Err(IngestError::missing_input("bank account id"));
        }

        let parsed = parse::parse_statement(contents, provider)?;
        let batch = upsert::upsert_batch(self.store, account_id, &parsed.transactions)?;

        let mut skips = parsed.skips;
        for skip in batch.skips {
            // Duplicate skips are numbered by batch position; map them back
            // to the source row the candidate came from.
            let index = (skip.row - 1) as usize;
            let row = parsed.candidate_rows.get(index).copied().unwrap_or(skip.row);
            skips.push(RowSkip {
                row,
                reason: skip.reason,
                detail: skip.detail,
            });
        }
        skips.sort_by_key(|skip| skip.row);

        let run = IngestRun {
            run_id: format!("run_{}", Ulid::new()),
            bank_account_id: account_id.to_string(),
            provider,
            rows_read: parsed.rows_read,
            inserted: batch.inserted,
            skipped: skips.len() as i64,
            skips: skips.clone(),
            created_at: now_timestamp(),
        };
        self.store.record_run(&run)?;

        log::debug!(
            "ingested {provider} statement for account {account_id}: {} new, {} skipped",
            run.inserted,
            run.skipped
        );

        if batch.inserted > 0
            && let Some(refresh) = self.refresh
        {
            refresh.ledger_updated(account_id);
        }

        Ok(IngestOutcome {
            success: true,
            count: batch.inserted,
            skipped: run.skipped,
            rows_read: run.rows_read,
            run_id: run.run_id,
            skips,
        })
    }
}
