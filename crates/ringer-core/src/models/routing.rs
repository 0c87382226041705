//! Routing partitions, traffic zones and jurisdiction policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic zone a call is rated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrafficZone {
    Interstate,
    Intrastate,
    Local,
    International,
    Zone1,
    Tollfree,
}

impl TrafficZone {
    pub const ALL: [TrafficZone; 6] = [
        TrafficZone::Interstate,
        TrafficZone::Intrastate,
        TrafficZone::Local,
        TrafficZone::International,
        TrafficZone::Zone1,
        TrafficZone::Tollfree,
    ];

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INTERSTATE" => Some(TrafficZone::Interstate),
            "INTRASTATE" => Some(TrafficZone::Intrastate),
            "LOCAL" => Some(TrafficZone::Local),
            "INTERNATIONAL" => Some(TrafficZone::International),
            "ZONE1" => Some(TrafficZone::Zone1),
            "TOLLFREE" => Some(TrafficZone::Tollfree),
            _ => None,
        }
    }

    pub fn is_international(&self) -> bool {
        matches!(self, TrafficZone::International)
    }
}

impl fmt::Display for TrafficZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrafficZone::Interstate => "INTERSTATE",
            TrafficZone::Intrastate => "INTRASTATE",
            TrafficZone::Local => "LOCAL",
            TrafficZone::International => "INTERNATIONAL",
            TrafficZone::Zone1 => "ZONE1",
            TrafficZone::Tollfree => "TOLLFREE",
        };
        f.write_str(s)
    }
}

/// Weekly window during which a partition is preferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSchedule {
    /// Days of week, 0 = Sunday
    #[serde(default)]
    pub days: Vec<u8>,
    /// "HH:MM"
    pub start_time: String,
    /// "HH:MM"
    pub end_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Machine/partition a trunk may be served from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionAssignment {
    pub machine_id: String,
    /// Lower wins
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_schedule: Option<TimeSchedule>,
}

/// How the jurisdiction of a call is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JurisdictionBehavior {
    Intrastate,
    #[default]
    Interstate,
    /// Point of interconnect decides
    Poi,
    Mixed,
}

/// Which ANIs are accepted on the trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AniClassification {
    Dom,
    Domtf,
    Intl,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JurisdictionPolicy {
    pub behavior: JurisdictionBehavior,

    /// Required when behavior is POI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poi_state: Option<String>,

    pub ani_classification: AniClassification,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ani_prefix: Option<String>,

    #[serde(default)]
    pub normalize_ani: bool,
}

/// Routing block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrunkRouting {
    #[serde(default)]
    pub partitions: Vec<PartitionAssignment>,

    #[serde(default)]
    pub supported_zones: Vec<TrafficZone>,

    #[serde(default)]
    pub jurisdiction: JurisdictionPolicy,
}

impl TrunkRouting {
    /// Partitions in preference order
    ///
    /// Lower priority number first; equal priorities keep list order.
    pub fn ordered_partitions(&self) -> Vec<&PartitionAssignment> {
        let mut ordered: Vec<&PartitionAssignment> = self.partitions.iter().collect();
        // sort_by_key is stable
        ordered.sort_by_key(|p| p.priority);
        ordered
    }

    pub fn supports(&self, zone: TrafficZone) -> bool {
        self.supported_zones.contains(&zone)
    }
}
