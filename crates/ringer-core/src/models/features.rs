//! Media, call-limit, monitoring and dip settings

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Codec {
    Pcmu,
    Pcma,
    G729,
    G722,
    Opus,
}

impl Codec {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PCMU" => Some(Codec::Pcmu),
            "PCMA" => Some(Codec::Pcma),
            "G729" => Some(Codec::G729),
            "G722" => Some(Codec::G722),
            "OPUS" => Some(Codec::Opus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DtmfMode {
    #[default]
    #[serde(rename = "RFC2833")]
    Rfc2833,
    #[serde(rename = "SIP_INFO")]
    SipInfo,
    #[serde(rename = "Inband")]
    Inband,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FaxSupport {
    #[default]
    #[serde(rename = "T38")]
    T38,
    #[serde(rename = "G711_Passthrough")]
    G711Passthrough,
    #[serde(rename = "None")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RtpProxyMode {
    Always,
    Never,
    #[default]
    #[serde(rename = "NAT_Only")]
    NatOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSettings {
    /// Preference order
    #[serde(default)]
    pub codecs: Vec<Codec>,
    #[serde(default)]
    pub transcoding: bool,
    #[serde(default)]
    pub dtmf_mode: DtmfMode,
    #[serde(default)]
    pub fax_support: FaxSupport,
    #[serde(default)]
    pub rtp_proxy: RtpProxyMode,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            codecs: vec![Codec::Pcmu, Codec::Pcma],
            transcoding: false,
            dtmf_mode: DtmfMode::default(),
            fax_support: FaxSupport::default(),
            rtp_proxy: RtpProxyMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLimits {
    pub max_concurrent_calls: u32,
    pub calls_per_second_limit: u32,
    #[serde(default)]
    pub session_timers: bool,
    /// Seconds
    pub session_timeout: u32,
}

impl Default for CallLimits {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 100,
            calls_per_second_limit: 10,
            session_timers: true,
            session_timeout: 1800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrunkFeatures {
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub calls: CallLimits,
}

/// Minimum acceptable call quality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Percent
    pub min_asr: Decimal,
    /// Minutes
    pub min_acd: Decimal,
    /// Milliseconds
    pub max_pdd: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_asr: dec!(95.0),
            min_acd: dec!(2.5),
            max_pdd: 3000,
        }
    }
}

/// SIP capture settings for the HOMER collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HomerCapture {
    #[serde(default)]
    pub capture_sip: bool,
    #[serde(default)]
    pub capture_rtp_headers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hep_node_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrunkMonitoring {
    #[serde(default)]
    pub quality_thresholds: QualityThresholds,
    #[serde(default)]
    pub homer: HomerCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LrnProvider {
    #[default]
    Telique,
    Custom,
}

/// Local Routing Number lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LrnDip {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: LrnProvider,
    /// Required when provider is Custom
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    /// Hours
    pub cache_duration: u32,
    #[serde(default)]
    pub fallback_on_failure: bool,
}

impl Default for LrnDip {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LrnProvider::Telique,
            custom_url: None,
            cache_duration: 24,
            fallback_on_failure: true,
        }
    }
}

/// Carrier Identification Code lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CicDip {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    /// Milliseconds
    pub dip_timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cic: Option<String>,
}

impl Default for CicDip {
    fn default() -> Self {
        Self {
            enabled: false,
            provider_url: None,
            dip_timeout: 5000,
            default_cic: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DipIntegration {
    #[serde(default)]
    pub lrn: LrnDip,
    #[serde(default)]
    pub cic: CicDip,
}
