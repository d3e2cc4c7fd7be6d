use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::IngestError;

/// Banking platforms whose statement exports this pipeline understands.
///
/// The header layout of each provider's export is fixed by contract, not
/// auto-detected; an upload tagged with the wrong provider fails the header
/// check instead of producing garbage rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Revolut,
    Wise,
    WorldFirst,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revolut => "revolut",
            Self::Wise => "wise",
            Self::WorldFirst => "worldfirst",
        }
    }

    /// Case-insensitive parser for the provider tag the upload form submits.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "revolut" => Some(Self::Revolut),
            "wise" | "transferwise" => Some(Self::Wise),
            "worldfirst" | "world_first" | "world-first" => Some(Self::WorldFirst),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_tag(value).ok_or_else(|| IngestError::unknown_provider(value))
    }
}
