//! SIP trunk model
//!
//! Represents a customer or vendor SIP trunk and its identity block.
//! A trunk is never physically deleted: it moves between statuses and its
//! stats keep accruing on the platform side.

use super::exclusion::TrunkExclusions;
use super::features::{DipIntegration, TrunkFeatures, TrunkMonitoring};
use super::overrides::TrunkOverrides;
use super::rate::{MarginEntry, TrunkRates};
use super::routing::{TrafficZone, TrunkRouting};
use super::security::{TrunkAuthentication, TrunkConnection};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trunk kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrunkType {
    /// Customer trunk - rates are prices charged to a billing account
    #[default]
    Customer,
    /// Vendor trunk - rates are costs paid to a provider
    Vendor,
}

impl fmt::Display for TrunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrunkType::Customer => write!(f, "CUSTOMER"),
            TrunkType::Vendor => write!(f, "VENDOR"),
        }
    }
}

impl TrunkType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "customer" => Some(TrunkType::Customer),
            "vendor" => Some(TrunkType::Vendor),
            _ => None,
        }
    }
}

/// Traffic direction
///
/// Carries both naming families seen on the platform: the generic
/// bidirectional/inbound/outbound values and the carrier-specific ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrunkDirection {
    #[default]
    Bidirectional,
    InboundOnly,
    OutboundOnly,
    /// Carrier sends DID traffic to the platform
    FromCarrier,
    /// Platform terminates traffic on a carrier
    ToCarrier,
    /// Platform delivers DID traffic to a customer PBX
    ToCustomer,
}

impl fmt::Display for TrunkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrunkDirection::Bidirectional => "BIDIRECTIONAL",
            TrunkDirection::InboundOnly => "INBOUND_ONLY",
            TrunkDirection::OutboundOnly => "OUTBOUND_ONLY",
            TrunkDirection::FromCarrier => "FROM_CARRIER",
            TrunkDirection::ToCarrier => "TO_CARRIER",
            TrunkDirection::ToCustomer => "TO_CUSTOMER",
        };
        f.write_str(s)
    }
}

impl TrunkDirection {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bidirectional" => Some(TrunkDirection::Bidirectional),
            "inbound_only" => Some(TrunkDirection::InboundOnly),
            "outbound_only" => Some(TrunkDirection::OutboundOnly),
            "from_carrier" => Some(TrunkDirection::FromCarrier),
            "to_carrier" => Some(TrunkDirection::ToCarrier),
            "to_customer" => Some(TrunkDirection::ToCustomer),
            _ => None,
        }
    }

    /// Whether the platform sends calls out over this trunk
    pub fn carries_outbound(&self) -> bool {
        matches!(
            self,
            TrunkDirection::Bidirectional
                | TrunkDirection::OutboundOnly
                | TrunkDirection::ToCarrier
                | TrunkDirection::ToCustomer
        )
    }
}

/// Role of the trunk within a trunk group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrunkPurpose {
    #[default]
    Primary,
    Backup,
    Geographic,
    Campaign,
    QualityTier,
    Failover,
    Test,
}

impl fmt::Display for TrunkPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrunkPurpose::Primary => "PRIMARY",
            TrunkPurpose::Backup => "BACKUP",
            TrunkPurpose::Geographic => "GEOGRAPHIC",
            TrunkPurpose::Campaign => "CAMPAIGN",
            TrunkPurpose::QualityTier => "QUALITY_TIER",
            TrunkPurpose::Failover => "FAILOVER",
            TrunkPurpose::Test => "TEST",
        };
        f.write_str(s)
    }
}

impl TrunkPurpose {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Some(TrunkPurpose::Primary),
            "backup" => Some(TrunkPurpose::Backup),
            "geographic" => Some(TrunkPurpose::Geographic),
            "campaign" => Some(TrunkPurpose::Campaign),
            "quality_tier" => Some(TrunkPurpose::QualityTier),
            "failover" => Some(TrunkPurpose::Failover),
            "test" => Some(TrunkPurpose::Test),
            _ => None,
        }
    }
}

/// Trunk status
///
/// There is no deleted state; deactivation is `Suspended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrunkStatus {
    Active,
    Suspended,
    /// New trunks start in testing until an operator activates them
    #[default]
    Testing,
}

impl fmt::Display for TrunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrunkStatus::Active => write!(f, "ACTIVE"),
            TrunkStatus::Suspended => write!(f, "SUSPENDED"),
            TrunkStatus::Testing => write!(f, "TESTING"),
        }
    }
}

impl TrunkStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(TrunkStatus::Active),
            "suspended" => Some(TrunkStatus::Suspended),
            "testing" => Some(TrunkStatus::Testing),
            _ => None,
        }
    }

    /// Check whether a transition to `next` is allowed
    ///
    /// Any move between two distinct statuses is allowed; staying put is not
    /// a transition.
    pub fn can_transition_to(&self, next: TrunkStatus) -> bool {
        *self != next
    }
}

/// Vendor quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Premium,
    Standard,
    Grey,
    Test,
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Premium => write!(f, "PREMIUM"),
            QualityTier::Standard => write!(f, "STANDARD"),
            QualityTier::Grey => write!(f, "GREY"),
            QualityTier::Test => write!(f, "TEST"),
        }
    }
}

impl QualityTier {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "premium" => Some(QualityTier::Premium),
            "standard" => Some(QualityTier::Standard),
            "grey" | "gray" => Some(QualityTier::Grey),
            "test" => Some(QualityTier::Test),
            _ => None,
        }
    }
}

/// How a vendor expects destinations to be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderType {
    Lrn,
    Ocnlata,
    Dnis,
    Tollfree,
    International,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderType::Lrn => "LRN",
            ProviderType::Ocnlata => "OCNLATA",
            ProviderType::Dnis => "DNIS",
            ProviderType::Tollfree => "TOLLFREE",
            ProviderType::International => "INTERNATIONAL",
        };
        f.write_str(s)
    }
}

impl ProviderType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LRN" => Some(ProviderType::Lrn),
            "OCNLATA" | "OCN_LATA" => Some(ProviderType::Ocnlata),
            "DNIS" => Some(ProviderType::Dnis),
            "TOLLFREE" => Some(ProviderType::Tollfree),
            "INTERNATIONAL" => Some(ProviderType::International),
            _ => None,
        }
    }
}

/// Identity block of a trunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrunkBasicInfo {
    /// Unique identifier
    pub id: String,

    /// Trunk kind, immutable after creation
    #[serde(rename = "type")]
    pub trunk_type: TrunkType,

    pub direction: TrunkDirection,

    pub purpose: TrunkPurpose,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Geographic location (HQ, branch, DR site)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    pub status: TrunkStatus,

    /// Owning machine / routing partition
    pub machine_id: String,

    /// Billing correlation code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,

    // Customer trunks only
    /// Billing Account Number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    // Vendor trunks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    /// Regions this vendor trunk specializes in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,
}

/// Live statistics supplied by the platform (read-only here)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrunkStats {
    pub active_calls: u32,
    pub today_minutes: u64,
    pub monthly_minutes: u64,
    /// Answer-seizure ratio, percent
    pub asr: Decimal,
    /// Average call duration, minutes
    pub acd: Decimal,
    /// Post-dial delay, milliseconds
    pub pdd: u32,
}

/// SIP trunk entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipTrunk {
    pub basic: TrunkBasicInfo,

    #[serde(default)]
    pub authentication: TrunkAuthentication,

    /// Carrier connection (vendor trunks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<TrunkConnection>,

    #[serde(default)]
    pub routing: TrunkRouting,

    #[serde(default)]
    pub rates: TrunkRates,

    #[serde(default)]
    pub overrides: TrunkOverrides,

    #[serde(default)]
    pub exclusions: TrunkExclusions,

    #[serde(default)]
    pub features: TrunkFeatures,

    #[serde(default)]
    pub monitoring: TrunkMonitoring,

    #[serde(default)]
    pub dip_integration: DipIntegration,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub last_modified_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrunkStats>,
}

impl SipTrunk {
    fn with_basic(basic: TrunkBasicInfo, operator: &str) -> Self {
        let now = Utc::now();
        Self {
            basic,
            authentication: TrunkAuthentication::default(),
            connection: None,
            routing: TrunkRouting::default(),
            rates: TrunkRates::default(),
            overrides: TrunkOverrides::default(),
            exclusions: TrunkExclusions::default(),
            features: TrunkFeatures::default(),
            monitoring: TrunkMonitoring::default(),
            dip_integration: DipIntegration::default(),
            created_at: now,
            updated_at: now,
            created_by: operator.to_string(),
            last_modified_by: operator.to_string(),
            stats: None,
        }
    }

    /// Create a customer trunk bound to a billing account
    ///
    /// Sub-structures start empty and are filled in by later edits.
    pub fn new_customer(id: &str, name: &str, ban: &str, machine_id: &str, operator: &str) -> Self {
        let basic = TrunkBasicInfo {
            id: id.to_string(),
            trunk_type: TrunkType::Customer,
            name: name.to_string(),
            machine_id: machine_id.to_string(),
            ban: Some(ban.to_string()),
            ..Default::default()
        };
        Self::with_basic(basic, operator)
    }

    /// Create a vendor trunk bound to a provider
    pub fn new_vendor(
        id: &str,
        name: &str,
        provider_id: &str,
        machine_id: &str,
        operator: &str,
    ) -> Self {
        let basic = TrunkBasicInfo {
            id: id.to_string(),
            trunk_type: TrunkType::Vendor,
            direction: TrunkDirection::OutboundOnly,
            name: name.to_string(),
            machine_id: machine_id.to_string(),
            provider_id: Some(provider_id.to_string()),
            ..Default::default()
        };
        let mut trunk = Self::with_basic(basic, operator);
        trunk.connection = Some(TrunkConnection::default());
        trunk
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.basic.id
    }

    #[inline]
    pub fn trunk_type(&self) -> TrunkType {
        self.basic.trunk_type
    }

    #[inline]
    pub fn is_customer(&self) -> bool {
        self.basic.trunk_type == TrunkType::Customer
    }

    #[inline]
    pub fn is_vendor(&self) -> bool {
        self.basic.trunk_type == TrunkType::Vendor
    }

    /// Move the trunk to a new status
    pub fn transition_to(&mut self, next: TrunkStatus, operator: &str) -> Result<(), AppError> {
        if !self.basic.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.basic.status.to_string(),
                to: next.to_string(),
            });
        }
        self.basic.status = next;
        self.touch(operator);
        Ok(())
    }

    /// Record a modification
    pub fn touch(&mut self, operator: &str) {
        self.updated_at = Utc::now();
        self.last_modified_by = operator.to_string();
    }

    /// Set the vendor cost for a zone and re-derive its margin entry
    ///
    /// The customer rate is taken from the zone's configured rate. Only
    /// customer trunks carry margin analysis.
    pub fn set_vendor_cost(&mut self, zone: TrafficZone, vendor_cost: Decimal) -> Result<(), AppError> {
        if !self.is_customer() {
            return Err(AppError::InvalidInput(
                "margin analysis is only kept on customer trunks".to_string(),
            ));
        }
        let customer_rate = self
            .rates
            .zones
            .get(&zone)
            .map(|z| z.rate)
            .ok_or_else(|| AppError::RateNotFound(zone.to_string()))?;

        self.rates
            .margin_analysis
            .get_or_insert_with(Default::default)
            .insert(zone, MarginEntry::new(vendor_cost, customer_rate));
        Ok(())
    }

    /// Re-derive every margin entry from the current zone rates
    ///
    /// Entries whose zone no longer has a rate are dropped.
    pub fn recompute_margin_analysis(&mut self) {
        let zones = &self.rates.zones;
        if let Some(analysis) = self.rates.margin_analysis.as_mut() {
            analysis.retain(|zone, _| zones.contains_key(zone));
            for (zone, entry) in analysis.iter_mut() {
                if let Some(rate) = zones.get(zone) {
                    *entry = MarginEntry::new(entry.vendor_cost(), rate.rate);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rate::ZoneRate;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!(TrunkType::from_str("VENDOR"), Some(TrunkType::Vendor));
        assert_eq!(TrunkStatus::from_str("Active"), Some(TrunkStatus::Active));
        assert_eq!(
            TrunkDirection::from_str("TO_CARRIER"),
            Some(TrunkDirection::ToCarrier)
        );
        assert_eq!(TrunkPurpose::from_str("QUALITY_TIER"), Some(TrunkPurpose::QualityTier));
        assert_eq!(ProviderType::from_str("ocn_lata"), Some(ProviderType::Ocnlata));
        assert_eq!(TrunkStatus::from_str("deleted"), None);
    }

    #[test]
    fn test_display_is_wire_casing() {
        assert_eq!(TrunkStatus::Active.to_string(), "ACTIVE");
        assert_eq!(TrunkType::Customer.to_string(), "CUSTOMER");
        assert_eq!(TrunkDirection::InboundOnly.to_string(), "INBOUND_ONLY");
    }

    #[test]
    fn test_new_customer_defaults() {
        let trunk = SipTrunk::new_customer("t-1", "Acme HQ", "BAN-1", "machine-01", "ops@ringer.tel");
        assert!(trunk.is_customer());
        assert_eq!(trunk.basic.status, TrunkStatus::Testing);
        assert_eq!(trunk.basic.ban.as_deref(), Some("BAN-1"));
        assert!(trunk.connection.is_none());
        assert!(trunk.rates.zones.is_empty());

        let vendor = SipTrunk::new_vendor("v-1", "Carrier", "PROV-1", "machine-01", "ops@ringer.tel");
        assert!(vendor.is_vendor());
        assert!(vendor.connection.is_some());
        assert!(vendor.basic.ban.is_none());
    }

    #[test]
    fn test_status_transitions() {
        let mut trunk = SipTrunk::new_customer("t-1", "Acme", "BAN-1", "machine-01", "ops");
        trunk.transition_to(TrunkStatus::Active, "ops").unwrap();
        trunk.transition_to(TrunkStatus::Suspended, "noc").unwrap();
        assert_eq!(trunk.last_modified_by, "noc");
        trunk.transition_to(TrunkStatus::Testing, "noc").unwrap();

        let err = trunk.transition_to(TrunkStatus::Testing, "noc").unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_set_vendor_cost_derives_margin() {
        let mut trunk = SipTrunk::new_customer("t-1", "Acme", "BAN-1", "machine-01", "ops");
        trunk.rates.zones.insert(
            TrafficZone::Interstate,
            ZoneRate::new(dec!(0.0095), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        );

        trunk
            .set_vendor_cost(TrafficZone::Interstate, dec!(0.0045))
            .unwrap();
        let entry = trunk.rates.margin_analysis.as_ref().unwrap()[&TrafficZone::Interstate];
        assert_eq!(entry.margin_per_minute(), dec!(0.0050));

        // Price change is reflected after recompute
        trunk
            .rates
            .zones
            .get_mut(&TrafficZone::Interstate)
            .unwrap()
            .rate = dec!(0.0100);
        trunk.recompute_margin_analysis();
        let entry = trunk.rates.margin_analysis.as_ref().unwrap()[&TrafficZone::Interstate];
        assert_eq!(entry.customer_rate(), dec!(0.0100));
        assert_eq!(entry.margin_per_minute(), dec!(0.0055));

        assert!(matches!(
            trunk.set_vendor_cost(TrafficZone::International, dec!(0.01)),
            Err(AppError::RateNotFound(_))
        ));
    }

    #[test]
    fn test_vendor_trunk_rejects_margin() {
        let mut vendor = SipTrunk::new_vendor("v-1", "Carrier", "PROV-1", "machine-01", "ops");
        assert!(vendor
            .set_vendor_cost(TrafficZone::Interstate, dec!(0.004))
            .is_err());
    }
}
