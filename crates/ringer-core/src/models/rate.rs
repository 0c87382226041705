//! Zone rates and margin model
//!
//! On a vendor trunk a zone rate is what we pay; on a customer trunk it is
//! what we charge. Margin entries only exist on customer trunks and are
//! always derived from a (vendor cost, customer rate) pair.

use super::routing::TrafficZone;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default billing increment and minimum duration, in seconds
pub const DEFAULT_BILLING_INCREMENT: u32 = 6;

/// Per-minute rate for one traffic zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRate {
    /// Per-minute rate
    pub rate: Decimal,

    /// Date the rate takes effect
    pub effective_date: NaiveDate,

    /// Minimum billed seconds per call
    #[serde(default = "default_increment")]
    pub minimum_duration: u32,

    /// Billing increment after the minimum, in seconds
    #[serde(default = "default_increment")]
    pub increment: u32,

    /// LCR ceiling, vendor trunks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_acceptable_rate: Option<Decimal>,
}

fn default_increment() -> u32 {
    DEFAULT_BILLING_INCREMENT
}

impl ZoneRate {
    /// Rate with 6/6 billing and no ceiling
    pub fn new(rate: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            rate,
            effective_date,
            minimum_duration: DEFAULT_BILLING_INCREMENT,
            increment: DEFAULT_BILLING_INCREMENT,
            max_acceptable_rate: None,
        }
    }

    pub fn with_ceiling(mut self, max_acceptable_rate: Decimal) -> Self {
        self.max_acceptable_rate = Some(max_acceptable_rate);
        self
    }

    pub fn with_billing(mut self, minimum_duration: u32, increment: u32) -> Self {
        self.minimum_duration = minimum_duration;
        self.increment = increment;
        self
    }

    #[inline]
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_date <= date
    }

    /// Seconds billed for a call of `duration_secs`
    ///
    /// Applies the minimum duration, then rounds up to the increment.
    /// A zero-length call bills nothing.
    pub fn billable_seconds(&self, duration_secs: u32) -> u32 {
        billable_seconds(duration_secs, self.minimum_duration, self.increment)
    }

}

/// Billed seconds given a minimum duration and increment
///
/// Saturates at `u32::MAX` instead of wrapping.
pub fn billable_seconds(duration_secs: u32, minimum_duration: u32, increment: u32) -> u32 {
    if duration_secs == 0 {
        return 0;
    }
    let secs = duration_secs.max(minimum_duration);
    let increment = increment.max(1);
    secs.div_ceil(increment).saturating_mul(increment)
}

/// Cost of `billed_secs` at a per-minute rate
///
/// Saturates at the `Decimal` bounds.
pub fn cost_for(rate_per_minute: Decimal, billed_secs: u32) -> Decimal {
    (Decimal::from(billed_secs) / Decimal::from(60)).saturating_mul(rate_per_minute)
}

/// Bound matching the sign of a quotient that did not fit
fn saturated(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Margin between what we pay and what we charge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub margin_per_minute: Decimal,
    /// Percent of the customer rate; zero when the customer rate is zero
    pub margin_percent: Decimal,
}

/// Compute margin from vendor cost and customer rate
///
/// Pure; a negative result means the zone loses money. Results that do not
/// fit a `Decimal` saturate at its bounds.
pub fn compute_margin(vendor_cost: Decimal, customer_rate: Decimal) -> Margin {
    let margin_per_minute = customer_rate.saturating_sub(vendor_cost);
    let margin_percent = if customer_rate > Decimal::ZERO {
        margin_per_minute
            .checked_div(customer_rate)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| saturated(margin_per_minute.is_sign_negative()))
    } else {
        Decimal::ZERO
    };
    Margin {
        margin_per_minute,
        margin_percent,
    }
}

/// Derived margin view of one zone
///
/// Fields are private so an entry cannot be edited by hand; build a new one
/// from its inputs instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginEntry {
    vendor_cost: Decimal,
    customer_rate: Decimal,
    margin_per_minute: Decimal,
    margin_percent: Decimal,
}

impl MarginEntry {
    pub fn new(vendor_cost: Decimal, customer_rate: Decimal) -> Self {
        let margin = compute_margin(vendor_cost, customer_rate);
        Self {
            vendor_cost,
            customer_rate,
            margin_per_minute: margin.margin_per_minute,
            margin_percent: margin.margin_percent,
        }
    }

    #[inline]
    pub fn vendor_cost(&self) -> Decimal {
        self.vendor_cost
    }

    #[inline]
    pub fn customer_rate(&self) -> Decimal {
        self.customer_rate
    }

    #[inline]
    pub fn margin_per_minute(&self) -> Decimal {
        self.margin_per_minute
    }

    #[inline]
    pub fn margin_percent(&self) -> Decimal {
        self.margin_percent
    }

    pub fn margin(&self) -> Margin {
        Margin {
            margin_per_minute: self.margin_per_minute,
            margin_percent: self.margin_percent,
        }
    }

    /// Whether the stored figures still match the inputs
    ///
    /// Stored percents coming from the platform are often rounded to one
    /// decimal, so the percent is compared with a 0.05 tolerance.
    pub fn is_consistent(&self) -> bool {
        let expected = compute_margin(self.vendor_cost, self.customer_rate);
        let within = |a: Decimal, b: Decimal, tolerance: Decimal| {
            a.checked_sub(b).is_some_and(|diff| diff.abs() <= tolerance)
        };
        within(expected.margin_per_minute, self.margin_per_minute, Decimal::new(1, 9))
            && within(expected.margin_percent, self.margin_percent, Decimal::new(5, 2))
    }
}

/// Upper bound applied to every rated call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RateLimiting {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<Decimal>,
}

impl RateLimiting {
    /// Active limit, if any
    pub fn limit(&self) -> Option<Decimal> {
        if self.enabled {
            self.max_rate
        } else {
            None
        }
    }
}

/// Rates block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrunkRates {
    #[serde(default)]
    pub zones: BTreeMap<TrafficZone, ZoneRate>,

    #[serde(default)]
    pub rate_limiting: RateLimiting,

    /// Customer trunks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_analysis: Option<BTreeMap<TrafficZone, MarginEntry>>,
}

impl TrunkRates {
    pub fn zone(&self, zone: TrafficZone) -> Option<&ZoneRate> {
        self.zones.get(&zone)
    }
}
