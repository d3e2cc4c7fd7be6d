use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::model::{Currency, UnifiedTransaction};

/// Unnormalized candidate produced by a provider parser. Field values are
/// already typed; `finalize` seals the candidate once the content hash is
/// computed.
#[derive(Debug, Clone)]
pub(crate) struct TransactionDraft {
    pub(crate) external_id: Option<String>,
    pub(crate) posted_on: NaiveDate,
    pub(crate) description: String,
    pub(crate) amount: f64,
    pub(crate) currency: Currency,
    pub(crate) fee: Option<f64>,
    pub(crate) status: String,
    pub(crate) category: Option<String>,
    pub(crate) reference: Option<String>,
}

pub(crate) fn finalize(draft: TransactionDraft) -> UnifiedTransaction {
    let hash = content_hash(
        draft.external_id.as_deref(),
        draft.posted_on,
        &draft.description,
        draft.amount,
        draft.currency,
    );

    UnifiedTransaction {
        external_id: draft.external_id,
        posted_on: draft.posted_on,
        description: draft.description,
        amount: draft.amount,
        currency: draft.currency,
        fee: draft.fee,
        status: draft.status,
        category: draft.category,
        reference: draft.reference,
        hash,
    }
}

/// Collapses split debit/credit columns to one signed amount: debits
/// negative, credits positive. Exports fill the unused column with zero or
/// leave it blank; a row populating both sides, or neither, is malformed.
pub(crate) fn signed_amount(debit: Option<f64>, credit: Option<f64>) -> Option<f64> {
    let debit = debit.filter(|value| *value != 0.0);
    let credit = credit.filter(|value| *value != 0.0);

    match (debit, credit) {
        (Some(debit), None) => Some(-debit.abs()),
        (None, Some(credit)) => Some(credit.abs()),
        _ => None,
    }
}

/// First format that parses wins. Formats are fixed per provider contract,
/// not auto-detected.
pub(crate) fn parse_provider_date(raw: &str, formats: &[&str]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Lower-cased with runs of whitespace collapsed to single spaces, so two
/// exports of the same statement period hash identically despite formatting
/// drift between them.
pub(crate) fn canonical_description(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 fingerprint over the canonical tuple, hex-encoded.
///
/// Providers that assign their own transaction id hash on that id alone;
/// everything else hashes on `(date, description, amount, currency)`. The
/// amount is rendered with exactly two decimals so re-parsed floats cannot
/// drift the digest. Stable across process restarts and platforms.
pub(crate) fn content_hash(
    external_id: Option<&str>,
    posted_on: NaiveDate,
    description: &str,
    amount: f64,
    currency: Currency,
) -> String {
    let canonical = match external_id {
        Some(id) => format!("ext|{}", id.trim()),
        None => format!(
            "txn|{}|{}|{:.2}|{}",
            posted_on.format("%Y-%m-%d"),
            canonical_description(description),
            amount,
            currency.as_str(),
        ),
    };

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
