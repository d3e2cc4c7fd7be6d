use thiserror::Error;

use crate::provider::Provider;
use crate::store::StoreError;

/// Failure taxonomy for one ingestion call.
///
/// `Validation` and `Parse` mean no ledger work was attempted. `Persistence`
/// means the storage layer failed mid-batch and the call was aborted; rows
/// inserted before the failure stay inserted and re-uploading the file is
/// safe because of hash deduplication.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("{message}")]
    Validation { message: String },
    #[error("{message}")]
    Parse { message: String },
    #[error("{message}")]
    Persistence { message: String },
}

impl IngestError {
    /// Stable machine-readable code for the surrounding application's error
    /// envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Parse { .. } => "parse",
            Self::Persistence { .. } => "persistence",
        }
    }

    pub(crate) fn missing_input(what: &str) -> Self {
        Self::Validation {
            message: format!("{what} must be present and non-empty."),
        }
    }

    pub(crate) fn unknown_provider(tag: &str) -> Self {
        Self::Validation {
            message: format!(
                "Unknown provider tag `{tag}`. Supported providers: revolut, wise, worldfirst."
            ),
        }
    }

    pub(crate) fn unreadable_header(provider: Provider) -> Self {
        Self::Parse {
            message: format!("{provider} statement header row is missing or unreadable."),
        }
    }

    pub(crate) fn header_mismatch(provider: Provider, required: &[&str], actual: &[String]) -> Self {
        Self::Parse {
            message: format!(
                "{provider} statement header does not match the expected layout. Required columns: {}. Got: {}.",
                required.join(", "),
                actual.join(", ")
            ),
        }
    }

    pub(crate) fn statement_without_rows(provider: Provider) -> Self {
        Self::Parse {
            message: format!("{provider} statement contains no transaction rows."),
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(error: StoreError) -> Self {
        Self::Persistence {
            message: error.to_string(),
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
