//! Effective-rate resolution
//!
//! Decides the per-minute rate that applies to a call on a trunk:
//!
//! 1. the highest-priority active dynamic override matching the number
//!    (ties go to the first in list order),
//! 2. otherwise the static override for the call's category,
//! 3. otherwise the zone's base rate, if it is effective on the date.
//!
//! Dynamic overrides carry no zone. They are keyed on the number and dip
//! data alone, so a matching override applies whatever zone the call was
//! classified into; the zone only picks the static category and base rate.

use crate::constants::{CIC_LEN, MAX_E164_LEN, NPANXX_LEN};
use chrono::NaiveDate;
use ringer_core::models::{
    rate::{billable_seconds, cost_for, DEFAULT_BILLING_INCREMENT},
    DialedNumber, DynamicOverride, MatchType, OverrideCategory, SipTrunk, TrafficZone,
};
use ringer_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Wildcard accepted in either half of an OCN/LATA pattern
const WILDCARD: &str = "*";

/// A rating request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuery {
    pub zone: TrafficZone,
    pub called_number: String,
    pub as_of: NaiveDate,
    /// Operating company number from an LRN dip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocn: Option<String>,
    /// LATA from an LRN dip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lata: Option<String>,
    /// Carrier identification code from a CIC dip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cic: Option<String>,
}

impl RateQuery {
    pub fn new(zone: TrafficZone, called_number: &str, as_of: NaiveDate) -> Self {
        Self {
            zone,
            called_number: called_number.to_string(),
            as_of,
            ocn: None,
            lata: None,
            cic: None,
        }
    }

    /// Category used to pick a static override
    pub fn category(&self) -> OverrideCategory {
        if self.cic.is_some() {
            OverrideCategory::Cic
        } else if self.zone.is_international() {
            OverrideCategory::International
        } else {
            OverrideCategory::Domestic
        }
    }
}

/// Where a resolved rate came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateSource {
    DynamicOverride { id: String, priority: i32 },
    StaticOverride { category: OverrideCategory },
    BaseRate,
}

/// Outcome of rate resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResolution {
    pub zone: TrafficZone,
    pub rate: Decimal,
    pub source: RateSource,
    pub minimum_duration: u32,
    pub increment: u32,
    /// Vendor rate above the zone's LCR ceiling
    pub exceeds_lcr_ceiling: bool,
    /// Rate above the trunk's enabled rate limit
    pub exceeds_rate_limit: bool,
}

impl RateResolution {
    /// Cost of a call using the zone's billing increments
    pub fn billable_cost(&self, duration_secs: u32) -> Decimal {
        let secs = billable_seconds(duration_secs, self.minimum_duration, self.increment);
        cost_for(self.rate, secs)
    }
}

/// Check an override pattern against its match type
pub fn pattern_is_well_formed(match_type: MatchType, pattern: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match match_type {
        MatchType::NpaNxx => pattern.len() == NPANXX_LEN && all_digits(pattern),
        MatchType::Prefix => pattern.len() <= MAX_E164_LEN && all_digits(pattern),
        MatchType::Cic => pattern.len() == CIC_LEN && all_digits(pattern),
        MatchType::OcnLata => match pattern.split_once('/') {
            Some((ocn, lata)) => {
                let ocn_ok = ocn == WILDCARD
                    || (!ocn.is_empty() && ocn.chars().all(|c| c.is_ascii_alphanumeric()));
                let lata_ok = lata == WILDCARD || all_digits(lata);
                ocn_ok && lata_ok && !(ocn == WILDCARD && lata == WILDCARD)
            }
            None => false,
        },
    }
}

fn part_matches(pattern: &str, value: Option<&str>) -> bool {
    pattern == WILDCARD || value.is_some_and(|v| v.eq_ignore_ascii_case(pattern))
}

/// Whether a dynamic override applies to the number and dip data
fn override_matches(ovr: &DynamicOverride, number: &DialedNumber, query: &RateQuery) -> bool {
    let pattern = ovr.match_pattern.trim();
    match ovr.match_type {
        MatchType::NpaNxx => number.npanxx() == Some(pattern),
        MatchType::Prefix => number.has_prefix(pattern),
        MatchType::Cic => query.cic.as_deref() == Some(pattern),
        MatchType::OcnLata => match pattern.split_once('/') {
            Some((ocn, lata)) => {
                part_matches(ocn, query.ocn.as_deref()) && part_matches(lata, query.lata.as_deref())
            }
            None => false,
        },
    }
}

/// Highest-priority active override; the first wins a tie
fn best_override<'a>(
    trunk: &'a SipTrunk,
    number: &DialedNumber,
    query: &RateQuery,
) -> Option<&'a DynamicOverride> {
    trunk
        .overrides
        .dynamic
        .iter()
        .filter(|o| o.is_active_on(query.as_of) && override_matches(o, number, query))
        .fold(None, |best: Option<&DynamicOverride>, candidate| match best {
            Some(current) if current.priority >= candidate.priority => Some(current),
            _ => Some(candidate),
        })
}

/// Resolve the rate for a zone and called number on a date
pub fn resolve_effective_rate(
    trunk: &SipTrunk,
    zone: TrafficZone,
    called_number: &str,
    as_of: NaiveDate,
) -> AppResult<RateResolution> {
    resolve_rate(trunk, &RateQuery::new(zone, called_number, as_of))
}

/// Resolve the rate for a full query, including LRN/CIC dip results
#[instrument(skip(trunk), fields(trunk_id = %trunk.basic.id, zone = %query.zone))]
pub fn resolve_rate(trunk: &SipTrunk, query: &RateQuery) -> AppResult<RateResolution> {
    let number = DialedNumber::parse(&query.called_number)?;
    let zone_rate = trunk.rates.zone(query.zone);

    let (rate, source) = if let Some(ovr) = best_override(trunk, &number, query) {
        debug!(override_id = %ovr.id, priority = ovr.priority, "Dynamic override matched");
        (
            ovr.capped_rate(),
            RateSource::DynamicOverride {
                id: ovr.id.clone(),
                priority: ovr.priority,
            },
        )
    } else if let Some(rate) = trunk
        .overrides
        .static_overrides
        .for_category(query.category())
    {
        debug!(category = %query.category(), "Static override applied");
        (
            rate,
            RateSource::StaticOverride {
                category: query.category(),
            },
        )
    } else {
        match zone_rate.filter(|z| z.is_effective_on(query.as_of)) {
            Some(base) => (base.rate, RateSource::BaseRate),
            None => {
                debug!("No override or effective base rate");
                return Err(AppError::RateNotFound(query.zone.to_string()));
            }
        }
    };

    let exceeds_lcr_ceiling = trunk.is_vendor()
        && zone_rate
            .and_then(|z| z.max_acceptable_rate)
            .is_some_and(|ceiling| rate > ceiling);
    let exceeds_rate_limit = trunk
        .rates
        .rate_limiting
        .limit()
        .is_some_and(|max| rate > max);

    Ok(RateResolution {
        zone: query.zone,
        rate,
        source,
        minimum_duration: zone_rate
            .map(|z| z.minimum_duration)
            .unwrap_or(DEFAULT_BILLING_INCREMENT),
        increment: zone_rate
            .map(|z| z.increment)
            .unwrap_or(DEFAULT_BILLING_INCREMENT),
        exceeds_lcr_ceiling,
        exceeds_rate_limit,
    })
}
