//! Predefined rate templates
//!
//! A template fills a trunk's zone rates in one step. Customer templates may
//! also carry the vendor costs they were priced against, which become the
//! trunk's margin analysis.

use chrono::NaiveDate;
use ringer_core::models::{
    rate::DEFAULT_BILLING_INCREMENT, MarginEntry, SipTrunk, TrafficZone, TrunkType, ZoneRate,
};
use ringer_core::{AppError, AppResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::info;

/// One zone of a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateZone {
    pub zone: TrafficZone,
    pub rate: Decimal,
    /// Vendor cost the customer rate was priced against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_cost: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub trunk_type: TrunkType,
    pub zones: Vec<TemplateZone>,
    pub minimum_duration: u32,
    pub increment: u32,
}

fn priced(zone: TrafficZone, rate: Decimal, vendor_cost: Decimal) -> TemplateZone {
    TemplateZone {
        zone,
        rate,
        vendor_cost: Some(vendor_cost),
    }
}

fn flat(zone: TrafficZone, rate: Decimal) -> TemplateZone {
    TemplateZone {
        zone,
        rate,
        vendor_cost: None,
    }
}

impl RateTemplate {
    fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        trunk_type: TrunkType,
        zones: Vec<TemplateZone>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            trunk_type,
            zones,
            minimum_duration: DEFAULT_BILLING_INCREMENT,
            increment: DEFAULT_BILLING_INCREMENT,
        }
    }

    /// Every built-in template
    pub fn builtin() -> Vec<RateTemplate> {
        use TrafficZone::*;

        vec![
            Self::new(
                "template-customer-standard",
                "Customer Standard Revenue Rates",
                "Standard rates charged to customers for outbound calling",
                TrunkType::Customer,
                vec![
                    priced(Interstate, dec!(0.0095), dec!(0.0045)),
                    priced(Intrastate, dec!(0.0085), dec!(0.0040)),
                    priced(Local, dec!(0.0075), dec!(0.0035)),
                    priced(Tollfree, dec!(0.012), dec!(0.008)),
                ],
            ),
            Self::new(
                "template-customer-premium",
                "Customer Premium Revenue Rates",
                "Premium rates charged to high-value customers",
                TrunkType::Customer,
                vec![
                    priced(Interstate, dec!(0.012), dec!(0.0045)),
                    priced(Intrastate, dec!(0.011), dec!(0.0040)),
                    priced(Local, dec!(0.0095), dec!(0.0035)),
                    priced(Tollfree, dec!(0.015), dec!(0.008)),
                ],
            ),
            Self::new(
                "template-vendor-tier1",
                "Tier 1 Vendor Cost Rates",
                "Cost rates from Tier 1 carriers",
                TrunkType::Vendor,
                vec![
                    flat(Interstate, dec!(0.0045)),
                    flat(Intrastate, dec!(0.0040)),
                    flat(Local, dec!(0.0035)),
                    flat(International, dec!(0.018)),
                    flat(Tollfree, dec!(0.008)),
                ],
            ),
            Self::new(
                "template-vendor-wholesale",
                "Wholesale Vendor Cost Rates",
                "Competitive wholesale termination rates",
                TrunkType::Vendor,
                vec![
                    flat(Interstate, dec!(0.0038)),
                    flat(Intrastate, dec!(0.0033)),
                    flat(Local, dec!(0.0028)),
                    flat(International, dec!(0.015)),
                    flat(Tollfree, dec!(0.007)),
                ],
            ),
            Self::new(
                "template-customer-inbound-free",
                "Customer Inbound Delivery (Free)",
                "Free inbound DID delivery to customers",
                TrunkType::Customer,
                vec![
                    flat(Interstate, Decimal::ZERO),
                    flat(Intrastate, Decimal::ZERO),
                    flat(Local, Decimal::ZERO),
                    flat(Tollfree, Decimal::ZERO),
                ],
            ),
        ]
    }

    /// Look up a built-in template
    pub fn find(id: &str) -> Option<RateTemplate> {
        Self::builtin().into_iter().find(|t| t.id == id)
    }

    /// Write the template's rates into a trunk
    ///
    /// Template zones replace the trunk's rate for that zone, keeping any LCR
    /// ceiling already set. Other zones are left alone. Margin entries are
    /// re-derived afterwards so they follow the new prices.
    pub fn apply(&self, trunk: &mut SipTrunk, effective_date: NaiveDate) -> AppResult<()> {
        if trunk.trunk_type() != self.trunk_type {
            return Err(AppError::InvalidInput(format!(
                "template {} is for {} trunks, trunk {} is {}",
                self.id,
                self.trunk_type,
                trunk.basic.id,
                trunk.trunk_type()
            )));
        }

        for tz in &self.zones {
            let ceiling = trunk
                .rates
                .zones
                .get(&tz.zone)
                .and_then(|z| z.max_acceptable_rate);
            let mut rate = ZoneRate::new(tz.rate, effective_date)
                .with_billing(self.minimum_duration, self.increment);
            rate.max_acceptable_rate = ceiling;
            trunk.rates.zones.insert(tz.zone, rate);

            if let Some(vendor_cost) = tz.vendor_cost {
                trunk
                    .rates
                    .margin_analysis
                    .get_or_insert_with(Default::default)
                    .insert(tz.zone, MarginEntry::new(vendor_cost, tz.rate));
            }
        }

        if trunk.is_customer() {
            trunk.recompute_margin_analysis();
        }

        info!(
            trunk_id = %trunk.basic.id,
            template = self.id,
            zones = self.zones.len(),
            "Applied rate template"
        );
        Ok(())
    }
}
