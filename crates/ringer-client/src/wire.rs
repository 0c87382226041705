//! Platform wire format
//!
//! The platform stores a trunk as one flat record: the identity fields sit at
//! the top level next to the configuration blocks, enums travel upper-cased
//! and the IP whitelist is a list of `{ip_address, netmask, description}`
//! rows. Decoding accepts any letter case.

use chrono::{DateTime, Utc};
use ringer_core::models::{
    AuthType, DipIntegration, IpWhitelistEntry, ProviderType, QualityTier, SipCredentials,
    SipTrunk, TrunkAuthentication, TrunkBasicInfo, TrunkConnection, TrunkDirection,
    TrunkExclusions, TrunkFeatures, TrunkMonitoring, TrunkOverrides, TrunkPurpose, TrunkRates,
    TrunkRouting, TrunkStats, TrunkStatus, TrunkType,
};
use ringer_core::traits::PaginationMeta;
use ringer_core::AppError;
use serde::{Deserialize, Serialize};

/// Netmask as the platform sends it: a prefix length, or a dotted mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNetmask {
    Bits(u8),
    Mask(String),
}

impl WireNetmask {
    fn from_subnet(subnet: &str) -> Self {
        match subnet.parse::<u8>() {
            Ok(bits) if bits.to_string() == subnet => WireNetmask::Bits(bits),
            _ => WireNetmask::Mask(subnet.to_string()),
        }
    }

    fn into_subnet(self) -> String {
        match self {
            WireNetmask::Bits(bits) => bits.to_string(),
            WireNetmask::Mask(mask) => mask,
        }
    }
}

/// One whitelist row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireIp {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<WireNetmask>,
    #[serde(default)]
    pub description: String,
}

impl From<&IpWhitelistEntry> for WireIp {
    fn from(entry: &IpWhitelistEntry) -> Self {
        Self {
            ip_address: entry.ip.clone(),
            netmask: entry.subnet.as_deref().map(WireNetmask::from_subnet),
            description: entry.label.clone(),
        }
    }
}

impl From<WireIp> for IpWhitelistEntry {
    fn from(row: WireIp) -> Self {
        Self {
            ip: row.ip_address,
            subnet: row.netmask.map(WireNetmask::into_subnet),
            label: row.description,
        }
    }
}

/// Trunk record as exchanged with the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTrunk {
    pub id: String,
    #[serde(rename = "type")]
    pub trunk_type: String,
    pub direction: String,
    pub purpose: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: String,
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,

    pub auth_type: String,
    #[serde(default)]
    pub ips: Vec<WireIp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SipCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_prefix: Option<String>,

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

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub last_modified_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrunkStats>,
}

/// Paged list as returned by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct WirePage {
    #[serde(default)]
    pub items: Vec<WireTrunk>,
    #[serde(default)]
    pub pagination: Option<PaginationMeta>,
}

/// Body of a status change
#[derive(Debug, Clone, Serialize)]
pub struct WireStatusChange {
    pub status: String,
}

impl From<TrunkStatus> for WireStatusChange {
    fn from(status: TrunkStatus) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

impl From<&SipTrunk> for WireTrunk {
    fn from(trunk: &SipTrunk) -> Self {
        let basic = &trunk.basic;
        let auth = &trunk.authentication;

        Self {
            id: basic.id.clone(),
            trunk_type: basic.trunk_type.to_string(),
            direction: basic.direction.to_string(),
            purpose: basic.purpose.to_string(),
            name: basic.name.clone(),
            description: basic.description.clone(),
            location: basic.location.clone(),
            status: basic.status.to_string(),
            machine_id: basic.machine_id.clone(),
            account_code: basic.account_code.clone(),
            ban: basic.ban.clone(),
            customer_id: basic.customer_id.clone(),
            provider_id: basic.provider_id.clone(),
            vendor_id: basic.vendor_id.clone(),
            regions: basic.regions.clone(),
            quality_tier: basic.quality_tier.map(|t| t.to_string()),
            provider_type: basic.provider_type.map(|t| t.to_string()),
            auth_type: auth.auth_type.to_string(),
            ips: auth.ip_whitelist.iter().map(WireIp::from).collect(),
            credentials: auth.credentials.clone(),
            tech_prefix: auth.tech_prefix.clone(),
            connection: trunk.connection.clone(),
            routing: trunk.routing.clone(),
            rates: trunk.rates.clone(),
            overrides: trunk.overrides.clone(),
            exclusions: trunk.exclusions.clone(),
            features: trunk.features.clone(),
            monitoring: trunk.monitoring.clone(),
            dip_integration: trunk.dip_integration.clone(),
            created_at: trunk.created_at,
            updated_at: trunk.updated_at,
            created_by: trunk.created_by.clone(),
            last_modified_by: trunk.last_modified_by.clone(),
            stats: trunk.stats.clone(),
        }
    }
}

fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, AppError> {
    parse(value.trim())
        .ok_or_else(|| AppError::Serialization(format!("unknown {} '{}'", field, value)))
}

fn parse_optional<T>(
    field: &str,
    value: Option<String>,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, AppError> {
    value.map(|v| parse_enum(field, &v, parse)).transpose()
}

impl TryFrom<WireTrunk> for SipTrunk {
    type Error = AppError;

    fn try_from(wire: WireTrunk) -> Result<Self, Self::Error> {
        let basic = TrunkBasicInfo {
            trunk_type: parse_enum("type", &wire.trunk_type, TrunkType::from_str)?,
            direction: parse_enum("direction", &wire.direction, TrunkDirection::from_str)?,
            purpose: parse_enum("purpose", &wire.purpose, TrunkPurpose::from_str)?,
            status: parse_enum("status", &wire.status, TrunkStatus::from_str)?,
            quality_tier: parse_optional("quality_tier", wire.quality_tier, QualityTier::from_str)?,
            provider_type: parse_optional(
                "provider_type",
                wire.provider_type,
                ProviderType::from_str,
            )?,
            id: wire.id,
            name: wire.name,
            description: wire.description,
            location: wire.location,
            machine_id: wire.machine_id,
            account_code: wire.account_code,
            ban: wire.ban,
            customer_id: wire.customer_id,
            provider_id: wire.provider_id,
            vendor_id: wire.vendor_id,
            regions: wire.regions,
        };

        let authentication = TrunkAuthentication {
            auth_type: parse_enum("auth_type", &wire.auth_type, AuthType::from_str)?,
            ip_whitelist: wire.ips.into_iter().map(IpWhitelistEntry::from).collect(),
            credentials: wire.credentials,
            tech_prefix: wire.tech_prefix,
        };

        Ok(SipTrunk {
            basic,
            authentication,
            connection: wire.connection,
            routing: wire.routing,
            rates: wire.rates,
            overrides: wire.overrides,
            exclusions: wire.exclusions,
            features: wire.features,
            monitoring: wire.monitoring,
            dip_integration: wire.dip_integration,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            created_by: wire.created_by,
            last_modified_by: wire.last_modified_by,
            stats: wire.stats,
        })
    }
}
