use serde::Deserialize;

use crate::error::IngestResult;
use crate::model::Currency;
use crate::normalize::{self, TransactionDraft};
use crate::parse::{ParseOutput, check_headers, optional_text, statement_reader};
use crate::provider::Provider;

const REQUIRED_HEADERS: [&str; 9] = [
    "ID",
    "Date",
    "Amount",
    "Currency",
    "Description",
    "Payment Reference",
    "Merchant",
    "Total fees",
    "Status",
];

const DATE_FORMATS: [&str; 1] = ["%d-%m-%Y"];

/// One row of a Wise balance export. The `ID` column is Wise's own transfer
/// id and becomes the external id, so a corrected re-export dedups against
/// the original even when the description changed.
#[derive(Debug, Deserialize)]
struct WiseRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Amount")]
    amount: Option<f64>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Payment Reference")]
    payment_reference: String,
    #[serde(rename = "Merchant")]
    merchant: String,
    #[serde(rename = "Total fees")]
    total_fees: Option<f64>,
    #[serde(rename = "Status")]
    status: String,
}

pub(crate) fn parse(raw: &str) -> IngestResult<ParseOutput> {
    let mut reader = statement_reader(raw);
    check_headers(Provider::Wise, &mut reader, &REQUIRED_HEADERS)?;

    let mut output = ParseOutput::new();

    for (index, record) in reader.deserialize::<WiseRow>().enumerate() {
        let row_number = (index as i64) + 1;
        output.rows_read += 1;

        let row = match record {
            Ok(row) => row,
            Err(error) => {
                output.push_skip(Provider::Wise, row_number, format!("unreadable row: {error}"));
                continue;
            }
        };

        // Wise amounts are already signed from the balance's perspective.
        let Some(amount) = row.amount else {
            output.push_skip(Provider::Wise, row_number, "amount is missing".to_string());
            continue;
        };

        if row.description.trim().is_empty() {
            output.push_skip(
                Provider::Wise,
                row_number,
                "description is missing".to_string(),
            );
            continue;
        }

        let Some(posted_on) = normalize::parse_provider_date(&row.date, &DATE_FORMATS) else {
            output.push_skip(
                Provider::Wise,
                row_number,
                format!("unparseable date `{}`", row.date),
            );
            continue;
        };

        let Some(currency) = Currency::from_code(&row.currency) else {
            output.push_skip(
                Provider::Wise,
                row_number,
                format!("unknown currency `{}`", row.currency),
            );
            continue;
        };

        output.push_candidate(
            row_number,
            normalize::finalize(TransactionDraft {
                external_id: optional_text(&row.id),
                posted_on,
                description: row.description.trim().to_string(),
                amount,
                currency,
                fee: row.total_fees.filter(|fee| *fee != 0.0),
                status: row.status.trim().to_lowercase(),
                category: optional_text(&row.merchant),
                reference: optional_text(&row.payment_reference),
            }),
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::parse;

    const HEADER: &str = "ID,Date,Amount,Currency,Description,Payment Reference,Merchant,Total fees,Status";

    #[test]
    fn transfer_id_becomes_the_external_id() {
        let statement = format!(
            "{HEADER}\n\
             TRANSFER-1042,05-01-2024,-80.50,EUR,Sent money to ACME GmbH,INV-2024-07,,0.43,COMPLETED\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert_eq!(output.transactions.len(), 1);
            let transaction = &output.transactions[0];
            assert_eq!(transaction.external_id.as_deref(), Some("TRANSFER-1042"));
            assert_eq!(transaction.amount, -80.5);
            assert_eq!(transaction.fee, Some(0.43));
            assert_eq!(transaction.reference.as_deref(), Some("INV-2024-07"));
            assert_eq!(
                transaction.posted_on.format("%Y-%m-%d").to_string(),
                "2024-01-05"
            );
        }
    }

    #[test]
    fn blank_id_falls_back_to_the_content_hash() {
        let statement = format!(
            "{HEADER}\n\
             ,05-01-2024,25.00,EUR,Refund from ACME GmbH,,,0.00,COMPLETED\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert_eq!(output.transactions.len(), 1);
            assert!(output.transactions[0].external_id.is_none());
            assert!(output.transactions[0].fee.is_none());
        }
    }

    #[test]
    fn iso_dates_do_not_satisfy_the_wise_day_first_format() {
        let statement = format!(
            "{HEADER}\n\
             TRANSFER-1,2024-01-05,-80.50,EUR,Sent money,,,0.00,COMPLETED\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert!(output.transactions.is_empty());
            assert_eq!(output.skips.len(), 1);
        }
    }
}
