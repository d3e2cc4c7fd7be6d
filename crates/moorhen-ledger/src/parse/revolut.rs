use serde::Deserialize;

use crate::error::IngestResult;
use crate::model::Currency;
use crate::normalize::{self, TransactionDraft};
use crate::parse::{ParseOutput, check_headers, statement_reader};
use crate::provider::Provider;

const REQUIRED_HEADERS: [&str; 10] = [
    "Type",
    "Product",
    "Started Date",
    "Completed Date",
    "Description",
    "Amount",
    "Fee",
    "Currency",
    "State",
    "Balance",
];

// Completed Date carries a time-of-day in account exports but some older
// exports ship the bare date.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

/// One row of a Revolut account export. Revolut assigns no transaction id,
/// so deduplication falls back to the content tuple.
#[derive(Debug, Deserialize)]
struct RevolutRow {
    #[serde(rename = "Type")]
    txn_type: String,
    #[serde(rename = "Product")]
    _product: String,
    #[serde(rename = "Started Date")]
    _started_date: String,
    #[serde(rename = "Completed Date")]
    completed_date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Amount")]
    amount: Option<f64>,
    #[serde(rename = "Fee")]
    fee: Option<f64>,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Balance")]
    _balance: Option<f64>,
}

pub(crate) fn parse(raw: &str) -> IngestResult<ParseOutput> {
    let mut reader = statement_reader(raw);
    check_headers(Provider::Revolut, &mut reader, &REQUIRED_HEADERS)?;

    let mut output = ParseOutput::new();

    for (index, record) in reader.deserialize::<RevolutRow>().enumerate() {
        let row_number = (index as i64) + 1;
        output.rows_read += 1;

        let row = match record {
            Ok(row) => row,
            Err(error) => {
                output.push_skip(
                    Provider::Revolut,
                    row_number,
                    format!("unreadable row: {error}"),
                );
                continue;
            }
        };

        // Revolut exports carry the amount already signed.
        let Some(amount) = row.amount else {
            output.push_skip(Provider::Revolut, row_number, "amount is missing".to_string());
            continue;
        };

        if row.description.trim().is_empty() {
            output.push_skip(
                Provider::Revolut,
                row_number,
                "description is missing".to_string(),
            );
            continue;
        }

        let Some(posted_on) = normalize::parse_provider_date(&row.completed_date, &DATE_FORMATS)
        else {
            output.push_skip(
                Provider::Revolut,
                row_number,
                format!("unparseable completed date `{}`", row.completed_date),
            );
            continue;
        };

        let Some(currency) = Currency::from_code(&row.currency) else {
            output.push_skip(
                Provider::Revolut,
                row_number,
                format!("unknown currency `{}`", row.currency),
            );
            continue;
        };

        output.push_candidate(
            row_number,
            normalize::finalize(TransactionDraft {
                external_id: None,
                posted_on,
                description: row.description.trim().to_string(),
                amount,
                currency,
                fee: row.fee.filter(|fee| *fee != 0.0),
                status: row.state.trim().to_lowercase(),
                category: category_for(&row.txn_type),
                reference: None,
            }),
        );
    }

    Ok(output)
}

fn category_for(revolut_type: &str) -> Option<String> {
    let category = match revolut_type.trim() {
        "Card Payment" => "card_payment",
        "Card Refund" => "card_refund",
        "Topup" => "topup",
        "Reward" => "reward",
        "Transfer" => "transfer",
        "Exchange" => "fx_exchange",
        _ => return None,
    };
    Some(category.to_string())
}

#[cfg(test)]
mod tests {
    use crate::model::SkipReason;

    use super::parse;

    const HEADER: &str = "Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance";

    #[test]
    fn well_formed_rows_become_candidates_in_input_order() {
        let statement = format!(
            "{HEADER}\n\
             Card Payment,Current,2024-01-05 11:32:10,2024-01-05 11:32:10,Tesco Stores,-50.00,0.00,GBP,COMPLETED,950.00\n\
             Topup,Current,2024-01-06 09:00:00,2024-01-06 09:00:01,Salary January,1200.00,0.00,GBP,COMPLETED,2150.00\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert_eq!(output.rows_read, 2);
            assert_eq!(output.transactions.len(), 2);
            assert!(output.skips.is_empty());
            assert_eq!(output.transactions[0].amount, -50.0);
            assert_eq!(output.transactions[0].status, "completed");
            assert_eq!(
                output.transactions[0].category.as_deref(),
                Some("card_payment")
            );
            assert_eq!(output.transactions[1].amount, 1200.0);
            assert!(output.transactions[1].external_id.is_none());
            assert_eq!(output.candidate_rows, vec![1, 2]);
        }
    }

    #[test]
    fn missing_amount_skips_the_row_and_keeps_the_batch() {
        let statement = format!(
            "{HEADER}\n\
             Card Payment,Current,2024-01-05 11:32:10,2024-01-05 11:32:10,Tesco Stores,-50.00,0.00,GBP,COMPLETED,950.00\n\
             Card Payment,Current,2024-01-07 08:15:00,2024-01-07 08:15:02,Broken Row,,0.00,GBP,COMPLETED,900.00\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert_eq!(output.rows_read, 2);
            assert_eq!(output.transactions.len(), 1);
            assert_eq!(output.skips.len(), 1);
            assert_eq!(output.skips[0].row, 2);
            assert_eq!(output.skips[0].reason, SkipReason::MalformedRow);
        }
    }

    #[test]
    fn bad_dates_and_unknown_currencies_are_row_level_failures() {
        let statement = format!(
            "{HEADER}\n\
             Card Payment,Current,x,not-a-date,Tesco Stores,-50.00,0.00,GBP,COMPLETED,950.00\n\
             Card Payment,Current,2024-01-05 11:32:10,2024-01-05 11:32:10,Tesco Stores,-50.00,0.00,ZZZ,COMPLETED,950.00\n"
        );

        let parsed = parse(&statement);
        assert!(parsed.is_ok());
        if let Ok(output) = parsed {
            assert!(output.transactions.is_empty());
            assert_eq!(output.skips.len(), 2);
        }
    }

    #[test]
    fn wrong_header_fails_fast() {
        let statement = "Date,Amount,Description\n2024-01-05,-50.00,Tesco Stores\n";
        let parsed = parse(statement);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code(), "parse");
        }
    }
}
