//! Margin analysis
//!
//! Builds margin entries from a customer/vendor trunk pair and summarizes a
//! customer trunk's margins against the configured warning and critical
//! thresholds.

use ringer_core::config::MarginConfig;
use ringer_core::models::{MarginEntry, SipTrunk, TrafficZone};
use ringer_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

/// Health of one zone's margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginStatus {
    Healthy,
    Warning,
    Critical,
}

impl MarginStatus {
    /// Classify a margin percent
    pub fn classify(margin_percent: Decimal, thresholds: &MarginConfig) -> Self {
        if margin_percent < thresholds.critical_percent {
            MarginStatus::Critical
        } else if margin_percent < thresholds.warning_percent {
            MarginStatus::Warning
        } else {
            MarginStatus::Healthy
        }
    }
}

impl fmt::Display for MarginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginStatus::Healthy => write!(f, "HEALTHY"),
            MarginStatus::Warning => write!(f, "WARNING"),
            MarginStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One row of a margin report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneMargin {
    pub zone: TrafficZone,
    pub vendor_cost: Decimal,
    pub customer_rate: Decimal,
    pub margin_per_minute: Decimal,
    pub margin_percent: Decimal,
    pub status: MarginStatus,
}

/// Margin summary of a customer trunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginReport {
    pub trunk_id: String,
    pub zones: Vec<ZoneMargin>,
    /// Zones with a positive margin
    pub profitable_zones: usize,
    /// Zones in warning or critical
    pub risk_zones: Vec<TrafficZone>,
    /// Mean margin percent across zones, two decimals
    pub average_margin_percent: Decimal,
}

/// Margin entries for the zones both trunks rate
///
/// Vendor costs come from the vendor trunk's zone rates and customer rates
/// from the customer trunk's.
pub fn build_margin_analysis(
    customer: &SipTrunk,
    vendor: &SipTrunk,
) -> AppResult<BTreeMap<TrafficZone, MarginEntry>> {
    if !customer.is_customer() {
        return Err(AppError::InvalidInput(format!(
            "trunk {} is not a customer trunk",
            customer.basic.id
        )));
    }
    if !vendor.is_vendor() {
        return Err(AppError::InvalidInput(format!(
            "trunk {} is not a vendor trunk",
            vendor.basic.id
        )));
    }

    let analysis: BTreeMap<_, _> = customer
        .rates
        .zones
        .iter()
        .filter_map(|(zone, price)| {
            vendor
                .rates
                .zones
                .get(zone)
                .map(|cost| (*zone, MarginEntry::new(cost.rate, price.rate)))
        })
        .collect();

    debug!(
        customer = %customer.basic.id,
        vendor = %vendor.basic.id,
        zones = analysis.len(),
        "Built margin analysis"
    );
    Ok(analysis)
}

/// Summarize a customer trunk's margin analysis
///
/// A trunk without margin analysis yields an empty report.
#[instrument(skip(trunk, thresholds), fields(trunk_id = %trunk.basic.id))]
pub fn margin_report(trunk: &SipTrunk, thresholds: &MarginConfig) -> AppResult<MarginReport> {
    if !trunk.is_customer() {
        return Err(AppError::InvalidInput(
            "margin reports are only available for customer trunks".to_string(),
        ));
    }

    let zones: Vec<ZoneMargin> = trunk
        .rates
        .margin_analysis
        .iter()
        .flatten()
        .map(|(zone, entry)| ZoneMargin {
            zone: *zone,
            vendor_cost: entry.vendor_cost(),
            customer_rate: entry.customer_rate(),
            margin_per_minute: entry.margin_per_minute(),
            margin_percent: entry.margin_percent().round_dp(2),
            status: MarginStatus::classify(entry.margin_percent(), thresholds),
        })
        .collect();

    let profitable_zones = zones
        .iter()
        .filter(|z| z.margin_per_minute > Decimal::ZERO)
        .count();
    let risk_zones = zones
        .iter()
        .filter(|z| z.status != MarginStatus::Healthy)
        .map(|z| z.zone)
        .collect();
    let average_margin_percent = if zones.is_empty() {
        Decimal::ZERO
    } else {
        let total: Decimal = trunk
            .rates
            .margin_analysis
            .iter()
            .flatten()
            .map(|(_, e)| e.margin_percent())
            .fold(Decimal::ZERO, Decimal::saturating_add);
        (total / Decimal::from(zones.len())).round_dp(2)
    };

    Ok(MarginReport {
        trunk_id: trunk.basic.id.clone(),
        zones,
        profitable_zones,
        risk_zones,
        average_margin_percent,
    })
}
