//! Bank statement ingestion for the moorhen ledger.
//!
//! Parses provider CSV exports (Revolut, Wise, WorldFirst) into a unified
//! transaction representation, fingerprints every transaction with a SHA-256
//! content hash, and upserts against the ledger keyed by that hash, so
//! uploading the same statement twice, or overlapping export windows, is
//! always a safe no-op.
//!
//! The pipeline is invoked programmatically by the surrounding application:
//!
//! ```
//! use moorhen_ledger::{Ingestor, MemoryLedgerStore, Provider};
//!
//! let store = MemoryLedgerStore::new();
//! let ingestor = Ingestor::new(&store);
//!
//! let statement = "\
//! Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance
//! Card Payment,Current,2024-01-05 11:32:10,2024-01-05 11:32:10,Tesco Stores,-50.00,0.00,GBP,COMPLETED,950.00
//! ";
//!
//! let outcome = ingestor.ingest(statement, Provider::Revolut, "acct_1")?;
//! assert_eq!(outcome.count, 1);
//!
//! let again = ingestor.ingest(statement, Provider::Revolut, "acct_1")?;
//! assert_eq!(again.count, 0);
//! # Ok::<(), moorhen_ledger::IngestError>(())
//! ```

pub mod error;
mod ingest;
pub mod migrations;
mod model;
mod normalize;
mod parse;
mod provider;
mod refresh;
pub mod store;
mod upsert;

pub use error::{IngestError, IngestResult};
pub use ingest::{IngestOutcome, Ingestor};
pub use model::{
    Currency, IngestRun, LedgerRecord, NewLedgerRecord, RowSkip, SkipReason, UnifiedTransaction,
};
pub use provider::Provider;
pub use refresh::RefreshSink;
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore, StoreError};
pub use upsert::{UpsertOutcome, upsert_batch};
