//! Static and dynamic rate overrides

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a dynamic override pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Six-digit NANP area code + exchange
    #[serde(rename = "NPANxx")]
    NpaNxx,
    /// "OCN/LATA" from an LRN dip, `*` matches any part
    #[serde(rename = "OCN_LATA")]
    OcnLata,
    /// Leading E.164 digits
    #[serde(rename = "Prefix")]
    Prefix,
    /// Four-digit carrier identification code
    #[serde(rename = "CIC")]
    Cic,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::NpaNxx => write!(f, "NPANXX"),
            MatchType::OcnLata => write!(f, "OCN_LATA"),
            MatchType::Prefix => write!(f, "PREFIX"),
            MatchType::Cic => write!(f, "CIC"),
        }
    }
}

impl MatchType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NPANXX" => Some(MatchType::NpaNxx),
            "OCN_LATA" | "OCNLATA" => Some(MatchType::OcnLata),
            "PREFIX" => Some(MatchType::Prefix),
            "CIC" => Some(MatchType::Cic),
            _ => None,
        }
    }
}

/// Time-windowed override for matching numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicOverride {
    pub id: String,
    pub match_type: MatchType,
    pub match_pattern: String,
    pub override_rate: Decimal,
    /// Higher wins
    pub priority: i32,
    /// Cap on the override rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_override: Option<Decimal>,
    pub effective_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
}

impl DynamicOverride {
    /// New override with a generated id and no expiry
    pub fn new(
        match_type: MatchType,
        match_pattern: &str,
        override_rate: Decimal,
        priority: i32,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            id: format!("ovr-{}", uuid::Uuid::new_v4()),
            match_type,
            match_pattern: match_pattern.to_string(),
            override_rate,
            priority,
            max_override: None,
            effective_date,
            expiration_date: None,
        }
    }

    /// Inclusive on both ends
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.effective_date <= date && self.expiration_date.map_or(true, |end| date <= end)
    }

    /// Override rate after applying `max_override`
    pub fn capped_rate(&self) -> Decimal {
        match self.max_override {
            Some(cap) => self.override_rate.min(cap),
            None => self.override_rate,
        }
    }
}

/// Which static override applies to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideCategory {
    Domestic,
    International,
    Cic,
}

impl fmt::Display for OverrideCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideCategory::Domestic => write!(f, "DOMESTIC"),
            OverrideCategory::International => write!(f, "INTERNATIONAL"),
            OverrideCategory::Cic => write!(f, "CIC"),
        }
    }
}

/// Flat per-category overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StaticOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_override: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intl_override: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cic_override: Option<Decimal>,
}

impl StaticOverrides {
    pub fn for_category(&self, category: OverrideCategory) -> Option<Decimal> {
        match category {
            OverrideCategory::Domestic => self.dom_override,
            OverrideCategory::International => self.intl_override,
            OverrideCategory::Cic => self.cic_override,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dom_override.is_none() && self.intl_override.is_none() && self.cic_override.is_none()
    }
}

/// Overrides block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrunkOverrides {
    #[serde(default, rename = "static")]
    pub static_overrides: StaticOverrides,

    #[serde(default)]
    pub dynamic: Vec<DynamicOverride>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let mut ovr = DynamicOverride::new(
            MatchType::NpaNxx,
            "212555",
            dec!(0.012),
            10,
            date(2024, 1, 1),
        );
        ovr.expiration_date = Some(date(2024, 1, 31));

        assert!(ovr.is_active_on(date(2024, 1, 1)));
        assert!(ovr.is_active_on(date(2024, 1, 31)));
        assert!(!ovr.is_active_on(date(2023, 12, 31)));
        assert!(!ovr.is_active_on(date(2024, 2, 1)));
        assert!(ovr.id.starts_with("ovr-"));
    }

    #[test]
    fn test_capped_rate() {
        let mut ovr = DynamicOverride::new(MatchType::Prefix, "44", dec!(0.02), 5, date(2024, 1, 1));
        assert_eq!(ovr.capped_rate(), dec!(0.02));
        ovr.max_override = Some(dec!(0.015));
        assert_eq!(ovr.capped_rate(), dec!(0.015));
    }

    #[test]
    fn test_match_type_wire_names() {
        assert_eq!(serde_json::to_string(&MatchType::NpaNxx).unwrap(), "\"NPANxx\"");
        assert_eq!(serde_json::to_string(&MatchType::OcnLata).unwrap(), "\"OCN_LATA\"");
        assert_eq!(MatchType::from_str("npanxx"), Some(MatchType::NpaNxx));
    }
}
