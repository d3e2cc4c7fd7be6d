mod revolut;
mod wise;
mod worldfirst;

use crate::error::{IngestError, IngestResult};
use crate::model::{RowSkip, SkipReason, UnifiedTransaction};
use crate::provider::Provider;

/// Parsed statement: transaction candidates in input order, the rows the
/// batch carried past, and how many data rows the file held.
///
/// `candidate_rows` runs parallel to `transactions` and maps each candidate
/// back to its 1-based data-row position in the source file, so duplicate
/// skips discovered later can be reported against the original row.
#[derive(Debug, Clone)]
pub(crate) struct ParseOutput {
    pub(crate) transactions: Vec<UnifiedTransaction>,
    pub(crate) candidate_rows: Vec<i64>,
    pub(crate) skips: Vec<RowSkip>,
    pub(crate) rows_read: i64,
}

impl ParseOutput {
    fn new() -> Self {
        Self {
            transactions: Vec::new(),
            candidate_rows: Vec::new(),
            skips: Vec::new(),
            rows_read: 0,
        }
    }

    fn push_candidate(&mut self, row: i64, transaction: UnifiedTransaction) {
        self.transactions.push(transaction);
        self.candidate_rows.push(row);
    }

    fn push_skip(&mut self, provider: Provider, row: i64, detail: String) {
        log::warn!("{provider} statement row {row} skipped: {detail}");
        self.skips.push(RowSkip {
            row,
            reason: SkipReason::MalformedRow,
            detail,
        });
    }
}

pub(crate) fn parse_statement(raw: &str, provider: Provider) -> IngestResult<ParseOutput> {
    let output = match provider {
        Provider::Revolut => revolut::parse(raw),
        Provider::Wise => wise::parse(raw),
        Provider::WorldFirst => worldfirst::parse(raw),
    }?;

    if output.rows_read == 0 {
        return Err(IngestError::statement_without_rows(provider));
    }

    Ok(output)
}

fn statement_reader(raw: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes())
}

/// Fails fast when the export's header row does not carry every column the
/// provider contract requires. Extra columns are tolerated; providers add
/// them without notice.
fn check_headers(
    provider: Provider,
    reader: &mut csv::Reader<&[u8]>,
    required: &[&str],
) -> IngestResult<()> {
    let headers = reader
        .headers()
        .map_err(|_| IngestError::unreadable_header(provider))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    let satisfied = required
        .iter()
        .all(|column| headers.iter().any(|header| header == column));
    if !satisfied {
        return Err(IngestError::header_mismatch(provider, required, &headers));
    }

    Ok(())
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
