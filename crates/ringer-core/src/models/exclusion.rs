//! Provider and destination exclusions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a provider was excluded from routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionReason {
    Quality,
    Cost,
    Business,
    Temporary,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Quality => write!(f, "QUALITY"),
            ExclusionReason::Cost => write!(f, "COST"),
            ExclusionReason::Business => write!(f, "BUSINESS"),
            ExclusionReason::Temporary => write!(f, "TEMPORARY"),
        }
    }
}

impl ExclusionReason {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quality" => Some(ExclusionReason::Quality),
            "cost" => Some(ExclusionReason::Cost),
            "business" => Some(ExclusionReason::Business),
            "temporary" => Some(ExclusionReason::Temporary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderExclusion {
    pub provider_id: String,
    pub reason: ExclusionReason,
    pub effective_start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_end: Option<NaiveDate>,
}

impl ProviderExclusion {
    /// Inclusive on both ends; open-ended when there is no end date
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.effective_start <= date && self.effective_end.map_or(true, |end| date <= end)
    }
}

/// Destination rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DestinationExclusions {
    /// E.164 digit prefixes, country code included
    #[serde(default)]
    pub blocked_prefixes: Vec<String>,

    /// ISO-3166 alpha-2 codes
    #[serde(default)]
    pub blocked_countries: Vec<String>,

    /// Block NANP premium-rate numbers (900 / 976)
    #[serde(default)]
    pub block_premium: bool,
}

/// Exclusions block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrunkExclusions {
    #[serde(default)]
    pub providers: Vec<ProviderExclusion>,

    #[serde(default)]
    pub destinations: DestinationExclusions,
}
