//! Destination and provider exclusion checks

use chrono::NaiveDate;
use ringer_core::models::{DialedNumber, ProviderExclusion, SipTrunk};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Rule that blocked a destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum DestinationBlock {
    /// Listed prefix
    Prefix(String),
    /// Listed ISO country
    Country(String),
    /// NANP premium-rate number
    Premium,
}

impl fmt::Display for DestinationBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationBlock::Prefix(p) => write!(f, "blocked prefix {}", p),
            DestinationBlock::Country(c) => write!(f, "blocked country {}", c),
            DestinationBlock::Premium => write!(f, "premium-rate number"),
        }
    }
}

/// Which destination rule, if any, blocks the number
///
/// Rules are checked in order: listed prefixes, listed countries, then the
/// premium-rate flag. A number with no digits matches nothing.
pub fn exclusion_reason(trunk: &SipTrunk, called_number: &str) -> Option<DestinationBlock> {
    let number = DialedNumber::parse(called_number).ok()?;
    let rules = &trunk.exclusions.destinations;

    if let Some(prefix) = rules
        .blocked_prefixes
        .iter()
        .find(|p| number.has_prefix(p))
    {
        debug!(trunk_id = %trunk.basic.id, prefix = %prefix, "Number matches blocked prefix");
        return Some(DestinationBlock::Prefix(prefix.clone()));
    }

    if let Some(country) = number.country() {
        if rules
            .blocked_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
        {
            debug!(trunk_id = %trunk.basic.id, country, "Number is in a blocked country");
            return Some(DestinationBlock::Country(country.to_string()));
        }
    }

    if rules.block_premium && number.is_premium() {
        return Some(DestinationBlock::Premium);
    }

    None
}

/// Whether the trunk refuses calls to this number
pub fn is_number_excluded(trunk: &SipTrunk, called_number: &str) -> bool {
    exclusion_reason(trunk, called_number).is_some()
}

/// Exclusion in force for a provider on a date
pub fn provider_exclusion<'a>(
    trunk: &'a SipTrunk,
    provider_id: &str,
    as_of: NaiveDate,
) -> Option<&'a ProviderExclusion> {
    trunk
        .exclusions
        .providers
        .iter()
        .find(|e| e.provider_id == provider_id && e.is_active_on(as_of))
}

/// Whether a provider is excluded from this trunk's routing on a date
pub fn is_provider_excluded(trunk: &SipTrunk, provider_id: &str, as_of: NaiveDate) -> bool {
    provider_exclusion(trunk, provider_id, as_of).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringer_core::models::ExclusionReason;
    use ringer_core::samples;

    #[test]
    fn test_premium_blocked_without_listed_prefix() {
        let mut trunk = samples::acme_hq_customer();
        trunk.exclusions.destinations.blocked_prefixes.clear();

        assert!(is_number_excluded(&trunk, "19005551234"));
        assert_eq!(
            exclusion_reason(&trunk, "9005551234"),
            Some(DestinationBlock::Premium)
        );
        assert!(!is_number_excluded(&trunk, "2125551234"));

        trunk.exclusions.destinations.block_premium = false;
        assert!(!is_number_excluded(&trunk, "19005551234"));
    }

    #[test]
    fn test_listed_prefix_reported_first() {
        let trunk = samples::acme_hq_customer();
        assert_eq!(
            exclusion_reason(&trunk, "+1 (976) 555-0000"),
            Some(DestinationBlock::Prefix("1976".to_string()))
        );
    }

    #[test]
    fn test_prefix_does_not_match_nanp_area_code() {
        let mut trunk = samples::acme_hq_customer();
        trunk.exclusions.destinations.blocked_prefixes = vec!["44".to_string()];
        trunk.exclusions.destinations.block_premium = false;

        assert!(!is_number_excluded(&trunk, "+1 440 555 1234"));
        assert!(!is_number_excluded(&trunk, "4405551234"));
        assert_eq!(
            exclusion_reason(&trunk, "+44 20 7946 0958"),
            Some(DestinationBlock::Prefix("44".to_string()))
        );
    }

    #[test]
    fn test_blocked_countries() {
        let trunk = samples::telnyx_international_vendor();
        assert_eq!(
            exclusion_reason(&trunk, "011 53 7 123 4567"),
            Some(DestinationBlock::Country("CU".to_string()))
        );
        assert!(is_number_excluded(&trunk, "+98 21 1234 5678"));
        assert!(is_number_excluded(&trunk, "+850 2 123 4567"));
        assert!(!is_number_excluded(&trunk, "+44 20 7946 0958"));
    }

    #[test]
    fn test_unparseable_number_is_not_excluded() {
        let trunk = samples::acme_hq_customer();
        assert!(!is_number_excluded(&trunk, "anonymous"));
    }

    #[test]
    fn test_provider_exclusion_window() {
        let mut trunk = samples::acme_hq_customer();
        trunk.exclusions.providers.push(ProviderExclusion {
            provider_id: "PROV-002".to_string(),
            reason: ExclusionReason::Quality,
            effective_start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            effective_end: None,
        });

        let may = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let april = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        assert!(is_provider_excluded(&trunk, "PROV-002", may));
        assert!(!is_provider_excluded(&trunk, "PROV-002", april));
        assert!(!is_provider_excluded(&trunk, "PROV-001", may));
        assert_eq!(
            provider_exclusion(&trunk, "PROV-002", may).map(|e| e.reason),
            Some(ExclusionReason::Quality)
        );
    }
}
