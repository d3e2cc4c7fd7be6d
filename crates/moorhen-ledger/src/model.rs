use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::provider::Provider;

/// Currencies the supported providers emit. A row carrying a code outside
/// this set is rejected at parse time rather than flowing through as free
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Gbp,
    Eur,
    Usd,
    Chf,
    Aud,
    Cad,
    Cny,
    Dkk,
    Hkd,
    Jpy,
    Nok,
    Nzd,
    Pln,
    Sek,
    Sgd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Chf => "CHF",
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Cny => "CNY",
            Self::Dkk => "DKK",
            Self::Hkd => "HKD",
            Self::Jpy => "JPY",
            Self::Nok => "NOK",
            Self::Nzd => "NZD",
            Self::Pln => "PLN",
            Self::Sek => "SEK",
            Self::Sgd => "SGD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "GBP" => Some(Self::Gbp),
            "EUR" => Some(Self::Eur),
            "USD" => Some(Self::Usd),
            "CHF" => Some(Self::Chf),
            "AUD" => Some(Self::Aud),
            "CAD" => Some(Self::Cad),
            "CNY" => Some(Self::Cny),
            "DKK" => Some(Self::Dkk),
            "HKD" => Some(Self::Hkd),
            "JPY" => Some(Self::Jpy),
            "NOK" => Some(Self::Nok),
            "NZD" => Some(Self::Nzd),
            "PLN" => Some(Self::Pln),
            "SEK" => Some(Self::Sek),
            "SGD" => Some(Self::Sgd),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Canonical representation of one bank movement, provider differences
/// already erased: debits are negative, credits positive, dates are calendar
/// dates.
///
/// `hash` is the deduplication key, sealed when the normalizer finalizes the
/// candidate. It is a pure function of the external id when the provider
/// assigns one, and of `(posted_on, description, amount, currency)`
/// otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedTransaction {
    pub external_id: Option<String>,
    pub posted_on: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub currency: Currency,
    pub fee: Option<f64>,
    pub status: String,
    pub category: Option<String>,
    pub reference: Option<String>,
    pub hash: String,
}

/// A transaction as persisted in the ledger: the unified fields plus the
/// owning account and store-assigned identity. Created only through
/// upsert-by-hash and never mutated by the pipeline afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRecord {
    pub record_id: String,
    pub bank_account_id: String,
    #[serde(flatten)]
    pub transaction: UnifiedTransaction,
    pub created_at: String,
}

/// Insert request for a ledger store. Identity (`record_id`, `created_at`)
/// is assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewLedgerRecord<'a> {
    pub bank_account_id: &'a str,
    pub transaction: &'a UnifiedTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedRow,
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRow => "malformed_row",
            Self::Duplicate => "duplicate",
        }
    }
}

/// One row the batch carried past without inserting. Not an error: the rest
/// of the batch keeps going and the skip is reported in the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RowSkip {
    /// 1-based data-row position in the uploaded file, header excluded.
    pub row: i64,
    pub reason: SkipReason,
    pub detail: String,
}

/// Audit row written for each committed ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRun {
    pub run_id: String,
    pub bank_account_id: String,
    pub provider: Provider,
    pub rows_read: i64,
    pub inserted: i64,
    pub skipped: i64,
    pub skips: Vec<RowSkip>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::Currency;

    #[test]
    fn currency_codes_round_trip() {
        for code in ["GBP", "EUR", "USD", "CHF"] {
            let currency = Currency::from_code(code);
            assert!(currency.is_some());
            if let Some(currency) = currency {
                assert_eq!(currency.as_str(), code);
            }
        }
    }

    #[test]
    fn currency_codes_are_case_insensitive_and_trimmed() {
        assert_eq!(Currency::from_code(" gbp "), Some(Currency::Gbp));
        assert_eq!(Currency::from_code("XXX"), None);
        assert_eq!(Currency::from_code(""), None);
    }
}
