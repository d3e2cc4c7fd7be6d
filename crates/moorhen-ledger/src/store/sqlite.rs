use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, ffi::ErrorCode, params};
use ulid::Ulid;

use crate::migrations;
use crate::model::{Currency, IngestRun, LedgerRecord, NewLedgerRecord, UnifiedTransaction};
use crate::store::{LedgerStore, StoreError, now_timestamp};

/// Resolves where the ledger database lives: explicit override first, then
/// the `MOORHEN_HOME` environment variable, then `~/.moorhen`.
pub fn resolve_ledger_home(home_override: Option<&Path>) -> Result<PathBuf, StoreError> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os("MOORHEN_HOME") {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".moorhen")
            } else {
                return Err(StoreError::Unavailable {
                    path: ".".to_string(),
                    detail: "could not resolve a home directory for the ledger".to_string(),
                });
            }
        }
    };

    absolutize(&candidate)
}

pub fn ledger_db_path(home: &Path) -> PathBuf {
    home.join("ledger.db")
}

/// SQLite-backed ledger.
///
/// The `UNIQUE` index on `content_hash` is the deduplication constraint and
/// the concurrency-control mechanism: the second writer of a duplicate
/// surfaces as [`StoreError::DuplicateHash`] instead of overwriting.
pub struct SqliteLedgerStore {
    connection: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteLedgerStore {
    /// Opens the ledger at `db_path`, creating the file and its parent
    /// directory if needed, and applies pending migrations.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            ensure_ledger_directory(parent)?;
        }

        let mut connection =
            Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
        connection
            .busy_timeout(Duration::from_millis(250))
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        migrations::run_pending(&mut connection).map_err(|error| StoreError::Migration {
            path: db_path.display().to_string(),
            detail: error.to_string(),
        })?;

        Ok(Self {
            connection: Mutex::new(connection),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Backend {
            detail: "ledger connection lock was poisoned".to_string(),
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn find_by_hash(&self, hash: &str) -> Result<Option<LedgerRecord>, StoreError> {
        let connection = self.lock()?;
        let row = connection
            .query_row(
                "SELECT record_id, bank_account_id, external_id, posted_on, description,
                        amount, currency, fee, status, category, reference, content_hash,
                        created_at
                 FROM ledger_records
                 WHERE content_hash = ?1",
                params![hash],
                read_record_row,
            )
            .optional()
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: NewLedgerRecord<'_>) -> Result<LedgerRecord, StoreError> {
        let stored = LedgerRecord {
            record_id: format!("txn_{}", Ulid::new()),
            bank_account_id: record.bank_account_id.to_string(),
            transaction: record.transaction.clone(),
            created_at: now_timestamp(),
        };

        let connection = self.lock()?;
        let transaction = &stored.transaction;
        connection
            .execute(
                "INSERT INTO ledger_records (
                    record_id,
                    bank_account_id,
                    external_id,
                    posted_on,
                    description,
                    amount,
                    currency,
                    fee,
                    status,
                    category,
                    reference,
                    content_hash,
                    created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    &stored.record_id,
                    &stored.bank_account_id,
                    &transaction.external_id,
                    transaction.posted_on.format("%Y-%m-%d").to_string(),
                    &transaction.description,
                    transaction.amount,
                    transaction.currency.as_str(),
                    transaction.fee,
                    &transaction.status,
                    &transaction.category,
                    &transaction.reference,
                    &transaction.hash,
                    &stored.created_at
                ],
            )
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        Ok(stored)
    }

    fn record_run(&self, run: &IngestRun) -> Result<(), StoreError> {
        let skips = serde_json::to_string(&run.skips).map_err(|error| StoreError::Backend {
            detail: format!("could not serialize run diagnostics: {error}"),
        })?;

        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO ingest_runs (
                    run_id,
                    bank_account_id,
                    provider,
                    rows_read,
                    inserted,
                    skipped,
                    skips,
                    created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &run.run_id,
                    &run.bank_account_id,
                    run.provider.as_str(),
                    run.rows_read,
                    run.inserted,
                    run.skipped,
                    skips,
                    &run.created_at
                ],
            )
            .map_err(|error| map_sqlite_error(&self.db_path, &error))?;

        Ok(())
    }
}

struct RecordRow {
    record_id: String,
    bank_account_id: String,
    external_id: Option<String>,
    posted_on: String,
    description: String,
    amount: f64,
    currency: String,
    fee: Option<f64>,
    status: String,
    category: Option<String>,
    reference: Option<String>,
    content_hash: String,
    created_at: String,
}

fn read_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        record_id: row.get(0)?,
        bank_account_id: row.get(1)?,
        external_id: row.get(2)?,
        posted_on: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        currency: row.get(6)?,
        fee: row.get(7)?,
        status: row.get(8)?,
        category: row.get(9)?,
        reference: row.get(10)?,
        content_hash: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl RecordRow {
    fn into_record(self) -> Result<LedgerRecord, StoreError> {
        let posted_on =
            NaiveDate::parse_from_str(&self.posted_on, "%Y-%m-%d").map_err(|error| {
                StoreError::Backend {
                    detail: format!("stored posted_on `{}` is not a date: {error}", self.posted_on),
                }
            })?;
        let currency = Currency::from_code(&self.currency).ok_or_else(|| StoreError::Backend {
            detail: format!("stored currency `{}` is not recognized", self.currency),
        })?;

        Ok(LedgerRecord {
            record_id: self.record_id,
            bank_account_id: self.bank_account_id,
            transaction: UnifiedTransaction {
                external_id: self.external_id,
                posted_on,
                description: self.description,
                amount: self.amount,
                currency,
                fee: self.fee,
                status: self.status,
                category: self.category,
                reference: self.reference,
                hash: self.content_hash,
            },
            created_at: self.created_at,
        })
    }
}

fn ensure_ledger_directory(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|error| map_io_error(path, &error))?;
    set_private_permissions_best_effort(path);
    Ok(())
}

fn map_io_error(path: &Path, error: &std::io::Error) -> StoreError {
    StoreError::Unavailable {
        path: path.display().to_string(),
        detail: error.to_string(),
    }
}

fn map_sqlite_error(path: &Path, error: &SqliteError) -> StoreError {
    let error_code = error.sqlite_error_code();

    if matches!(error_code, Some(ErrorCode::ConstraintViolation)) {
        return StoreError::DuplicateHash;
    }

    if matches!(
        error_code,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    ) {
        return StoreError::Locked {
            path: path.display().to_string(),
        };
    }

    if matches!(error_code, Some(ErrorCode::NotADatabase)) {
        return StoreError::Corrupt {
            path: path.display().to_string(),
        };
    }

    StoreError::Unavailable {
        path: path.display().to_string(),
        detail: error.to_string(),
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, StoreError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| StoreError::Unavailable {
            path: path.display().to_string(),
            detail: error.to_string(),
        })
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::model::{Currency, NewLedgerRecord, UnifiedTransaction};
    use crate::store::{LedgerStore, StoreError};

    use super::{SqliteLedgerStore, ledger_db_path, resolve_ledger_home};

    fn transaction(hash: &str) -> UnifiedTransaction {
        UnifiedTransaction {
            external_id: Some("TRANSFER-1".to_string()),
            posted_on: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or_default(),
            description: "Sent money to ACME GmbH".to_string(),
            amount: -80.5,
            currency: Currency::Eur,
            fee: Some(0.43),
            status: "completed".to_string(),
            category: None,
            reference: Some("INV-2024-07".to_string()),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn open_creates_the_parent_directory_and_applies_migrations() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let db_path = ledger_db_path(&temp.path().join("nested-home"));
            let store = SqliteLedgerStore::open(&db_path);
            assert!(store.is_ok());
            if let Ok(store) = store {
                assert_eq!(store.db_path(), db_path.as_path());
            }
            assert!(db_path.exists());
        }
    }

    #[test]
    fn insert_then_find_by_hash_round_trips_every_field() {
        let temp = tempdir();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };

        let store = SqliteLedgerStore::open(&ledger_db_path(temp.path()));
        assert!(store.is_ok());
        let Ok(store) = store else {
            return;
        };

        let candidate = transaction("feedface");
        let inserted = store.insert(NewLedgerRecord {
            bank_account_id: "acct_1",
            transaction: &candidate,
        });
        assert!(inserted.is_ok());

        let found = store.find_by_hash("feedface");
        assert!(found.is_ok());
        if let Ok(Some(record)) = found {
            assert!(record.record_id.starts_with("txn_"));
            assert_eq!(record.bank_account_id, "acct_1");
            assert_eq!(record.transaction.external_id.as_deref(), Some("TRANSFER-1"));
            assert_eq!(record.transaction.amount, -80.5);
            assert_eq!(record.transaction.currency, Currency::Eur);
            assert_eq!(record.transaction.fee, Some(0.43));
            assert_eq!(record.transaction.reference.as_deref(), Some("INV-2024-07"));
            assert_eq!(record.transaction.posted_on, candidate.posted_on);
        }

        let missing = store.find_by_hash("cafebabe");
        assert!(matches!(missing, Ok(None)));
    }

    #[test]
    fn duplicate_hash_inserts_hit_the_unique_index() {
        let temp = tempdir();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };

        let store = SqliteLedgerStore::open(&ledger_db_path(temp.path()));
        assert!(store.is_ok());
        let Ok(store) = store else {
            return;
        };

        let candidate = transaction("feedface");
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
    }

    #[test]
    fn explicit_home_override_wins_and_is_absolutized() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let resolved = resolve_ledger_home(Some(temp.path()));
            assert!(resolved.is_ok());
            if let Ok(home) = resolved {
                assert!(home.is_absolute());
                assert_eq!(ledger_db_path(&home), home.join("ledger.db"));
            }
        }
    }
}
