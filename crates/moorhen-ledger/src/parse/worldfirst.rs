use serde::Deserialize;

use crate::error::IngestResult;
use crate::model::Currency;
use crate::normalize::{self, TransactionDraft};
use crate::parse::{ParseOutput, check_headers, optional_text, statement_reader};
use crate::provider::Provider;

const REQUIRED_HEADERS: [&str; 8] = [
    "Transaction ID",
    "Date",
    "Details",
    "Debit Amount",
    "Credit Amount",
    "Currency",
    "Status",
    "Reference",
];

const DATE_FORMATS: [&str; 1] = ["%d/%m/%Y"];

/// One row of a WorldFirst account export. Movements arrive as unsigned
/// debit/credit columns; the normalizer collapses them to a signed amount.
#[derive(Debug, Deserialize)]
struct WorldFirstRow {
    #[serde(rename = "Transaction ID")]
    transaction_id: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Details")]
    details: String,
    #[serde(rename = "Debit Amount")]
    debit_amount: Option<f64>,
    #[serde(rename = "Credit Amount")]
    credit_amount: Option<f64>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Reference")]
    reference: String,
}

pub(crate) fn parse(raw: &str) -> IngestResult<ParseOutput> {
    let mut reader = statement_reader(raw);
    check_headers(Provider::WorldFirst, &mut reader, &REQUIRED_HEADERS)?;

    let mut output = ParseOutput::new();

    for (index, record) in reader.deserialize::<WorldFirstRow>().enumerate() {
        let row_number = (index as i64) + 1;
        output.rows_read += 1;

        let row = match record {
            Ok(row) => row,
            Err(error) => {
                output.push_skip(
                    Provider::WorldFirst,
                    row_number,
                    format!("unreadable row: {error}"),
                );
                continue;
            }
        };

        let Some(amount) = normalize::signed_amount(row.debit_amount, row.credit_amount) else {
            output.push_skip(
                Provider::WorldFirst,
                row_number,
                "row does not carry exactly one of debit and credit".to_string(),
            );
            continue;
        };

        if row.details.trim().is_empty() {
            output.push_skip(
                Provider::WorldFirst,
                row_number,
                "details column is missing".to_string(),
            );
            continue;
        }

        let Some(posted_on) = normalize::parse_provider_date(&row.date, &DATE_FORMATS) else {
            output.push_skip(
                Provider::WorldFirst,
                row_number,
                format!("unparseable date `{}`", row.date),
            );
            continue;
        };

        let Some(currency) = Currency::from_code(&row.currency) else {
            output.push_skip(
                Provider::WorldFirst,
                row_number,
                format!("unknown currency `{}`", row.currency),
            );
            continue;
        };

        output.push_candidate(
            row_number,
            normalize::finalize(TransactionDraft {
                external_id: optional_text(&row.transaction_id),
                posted_on,
                description: row.details.trim().to_string(),
                amount,
                currency,
                fee: None,
                status: row.status.trim().to_lowercase(),
                category: None,
                reference: optional_text(&row.reference),
            }),
        );
    }

    Ok(output)
}
