//! Reference trunks
//!
//! Fully configured trunks mirroring the platform's demo tenants. Used by the
//! service tests, the HTTP tests and as fixtures for local development.

use crate::models::*;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

const OPERATOR: &str = "admin@ringer.tel";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn timestamp(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    date(y, m, d)
        .and_hms_opt(h, min, 0)
        .unwrap_or_default()
        .and_utc()
}

fn partitions(machines: &[(&str, u32)]) -> Vec<PartitionAssignment> {
    machines
        .iter()
        .map(|(machine_id, priority)| PartitionAssignment {
            machine_id: machine_id.to_string(),
            priority: *priority,
            time_schedule: None,
        })
        .collect()
}

fn dialstrings(hosts: &[&str]) -> Vec<String> {
    hosts
        .iter()
        .map(|host| format!("sip:+{}@{}", TrunkConnection::NUMBER_PLACEHOLDER, host))
        .collect()
}

/// Acme Corp headquarters: bidirectional customer trunk with margin analysis
pub fn acme_hq_customer() -> SipTrunk {
    let mut trunk = SipTrunk::new_customer(
        "cust-trunk-001",
        "Acme HQ - Main Office",
        "BAN-12345678",
        "machine-01",
        OPERATOR,
    );

    trunk.basic.customer_id = Some("cust-001".to_string());
    trunk.basic.description =
        Some("Primary bidirectional trunk for Acme Corp headquarters".to_string());
    trunk.basic.location = Some("New York HQ".to_string());
    trunk.basic.account_code = Some("ACME001".to_string());
    trunk.basic.status = TrunkStatus::Active;

    trunk.authentication = TrunkAuthentication {
        auth_type: AuthType::Both,
        ip_whitelist: vec![
            IpWhitelistEntry::new("192.168.1.100", Some("24"), "Acme PBX Primary"),
            IpWhitelistEntry::new("192.168.1.101", Some("24"), "Acme PBX Backup"),
        ],
        credentials: Some(SipCredentials {
            username: "acme_trunk_01".to_string(),
            password: "secure_password_123".to_string(),
            realm: Some("sip.ringer.tel".to_string()),
        }),
        tech_prefix: None,
    };

    trunk.routing = TrunkRouting {
        partitions: partitions(&[("machine-01", 1), ("machine-02", 2)]),
        supported_zones: vec![
            TrafficZone::Interstate,
            TrafficZone::Intrastate,
            TrafficZone::Local,
            TrafficZone::Tollfree,
        ],
        jurisdiction: JurisdictionPolicy {
            behavior: JurisdictionBehavior::Mixed,
            poi_state: None,
            ani_classification: AniClassification::Dom,
            ani_prefix: None,
            normalize_ani: true,
        },
    };

    let effective = date(2024, 1, 1);
    let priced = [
        (TrafficZone::Interstate, dec!(0.0095), dec!(0.0045)),
        (TrafficZone::Intrastate, dec!(0.0085), dec!(0.0040)),
        (TrafficZone::Local, dec!(0.0075), dec!(0.0035)),
        (TrafficZone::Tollfree, dec!(0.0120), dec!(0.0080)),
    ];
    let mut zones = BTreeMap::new();
    let mut margins = BTreeMap::new();
    for (zone, rate, vendor_cost) in priced {
        zones.insert(zone, ZoneRate::new(rate, effective));
        margins.insert(zone, MarginEntry::new(vendor_cost, rate));
    }
    trunk.rates = TrunkRates {
        zones,
        rate_limiting: RateLimiting {
            enabled: true,
            max_rate: Some(dec!(0.15)),
        },
        margin_analysis: Some(margins),
    };

    trunk.overrides = TrunkOverrides {
        static_overrides: StaticOverrides {
            dom_override: Some(dec!(0.008)),
            ..Default::default()
        },
        dynamic: vec![DynamicOverride {
            id: "override-001".to_string(),
            match_type: MatchType::NpaNxx,
            match_pattern: "212555".to_string(),
            override_rate: dec!(0.012),
            priority: 10,
            max_override: None,
            effective_date: effective,
            expiration_date: None,
        }],
    };

    trunk.exclusions.destinations = DestinationExclusions {
        blocked_prefixes: vec!["1900".to_string(), "1976".to_string()],
        blocked_countries: Vec::new(),
        block_premium: true,
    };

    trunk.features.media = MediaSettings {
        codecs: vec![Codec::Pcmu, Codec::Pcma, Codec::G729],
        transcoding: true,
        dtmf_mode: DtmfMode::Rfc2833,
        fax_support: FaxSupport::T38,
        rtp_proxy: RtpProxyMode::NatOnly,
    };

    trunk.monitoring.homer = HomerCapture {
        capture_sip: true,
        capture_rtp_headers: false,
        hep_node_id: Some(101),
    };

    trunk.dip_integration.lrn.enabled = true;
    trunk.dip_integration.cic = CicDip {
        enabled: true,
        provider_url: None,
        dip_timeout: 5000,
        default_cic: Some("0288".to_string()),
    };

    trunk.created_at = timestamp(2024, 1, 15, 10, 30);
    trunk.updated_at = timestamp(2024, 9, 15, 14, 22);
    trunk.stats = Some(TrunkStats {
        active_calls: 23,
        today_minutes: 1247,
        monthly_minutes: 45230,
        asr: dec!(96.2),
        acd: dec!(3.1),
        pdd: 2100,
    });

    trunk
}

/// AT&T premium termination for US interstate traffic
pub fn att_interstate_vendor() -> SipTrunk {
    let mut trunk = SipTrunk::new_vendor(
        "vendor-trunk-001",
        "AT&T Interstate Premium",
        "PROV-001",
        "machine-01",
        OPERATOR,
    );

    trunk.basic.vendor_id = Some("vendor-001".to_string());
    trunk.basic.description =
        Some("Premium quality AT&T termination for US Interstate traffic".to_string());
    trunk.basic.purpose = TrunkPurpose::QualityTier;
    trunk.basic.quality_tier = Some(QualityTier::Premium);
    trunk.basic.regions = vec!["US_INTERSTATE".to_string()];
    trunk.basic.provider_type = Some(ProviderType::Lrn);
    trunk.basic.status = TrunkStatus::Active;

    trunk.authentication = TrunkAuthentication {
        auth_type: AuthType::SipDigest,
        ip_whitelist: Vec::new(),
        credentials: Some(SipCredentials {
            username: "ringer_client".to_string(),
            password: "vendor_auth_456".to_string(),
            realm: Some("sip.voicestream.com".to_string()),
        }),
        tech_prefix: None,
    };

    trunk.connection = Some(TrunkConnection {
        dialstrings: dialstrings(&[
            "gateway1.voicestream.com:5060",
            "gateway2.voicestream.com:5060",
        ]),
        transport: Transport::Udp,
        port: Some(5060),
        credentials: Some(CarrierCredentials {
            username: "ringer_client".to_string(),
            password: "vendor_auth_456".to_string(),
        }),
    });

    trunk.routing = TrunkRouting {
        partitions: partitions(&[("machine-01", 1), ("machine-02", 2)]),
        supported_zones: vec![
            TrafficZone::Interstate,
            TrafficZone::Intrastate,
            TrafficZone::Local,
        ],
        jurisdiction: JurisdictionPolicy {
            behavior: JurisdictionBehavior::Mixed,
            poi_state: None,
            ani_classification: AniClassification::Dom,
            ani_prefix: None,
            normalize_ani: true,
        },
    };

    let effective = date(2024, 1, 1);
    trunk.rates = TrunkRates {
        zones: BTreeMap::from([
            (
                TrafficZone::Interstate,
                ZoneRate::new(dec!(0.0045), effective).with_ceiling(dec!(0.008)),
            ),
            (
                TrafficZone::Intrastate,
                ZoneRate::new(dec!(0.0040), effective).with_ceiling(dec!(0.007)),
            ),
            (
                TrafficZone::Local,
                ZoneRate::new(dec!(0.0035), effective).with_ceiling(dec!(0.006)),
            ),
        ]),
        rate_limiting: RateLimiting {
            enabled: true,
            max_rate: Some(dec!(0.01)),
        },
        margin_analysis: None,
    };

    trunk.features = TrunkFeatures {
        media: MediaSettings {
            codecs: vec![Codec::Pcmu, Codec::Pcma, Codec::G729],
            transcoding: true,
            dtmf_mode: DtmfMode::Rfc2833,
            fax_support: FaxSupport::G711Passthrough,
            rtp_proxy: RtpProxyMode::Always,
        },
        calls: CallLimits {
            max_concurrent_calls: 1000,
            calls_per_second_limit: 50,
            session_timers: true,
            session_timeout: 1800,
        },
    };

    trunk.monitoring = TrunkMonitoring {
        quality_thresholds: QualityThresholds {
            min_asr: dec!(98.0),
            min_acd: dec!(3.0),
            max_pdd: 2000,
        },
        homer: HomerCapture {
            capture_sip: true,
            capture_rtp_headers: true,
            hep_node_id: Some(201),
        },
    };

    trunk.dip_integration.lrn.enabled = true;
    trunk.dip_integration.lrn.cache_duration = 48;
    trunk.dip_integration.cic.dip_timeout = 3000;

    trunk.created_at = timestamp(2024, 1, 5, 8, 0);
    trunk.updated_at = timestamp(2024, 9, 12, 16, 30);
    trunk.stats = Some(TrunkStats {
        active_calls: 156,
        today_minutes: 8934,
        monthly_minutes: 234567,
        asr: dec!(98.7),
        acd: dec!(3.4),
        pdd: 1800,
    });

    trunk
}

/// Telnyx termination for international and Zone 1 traffic
pub fn telnyx_international_vendor() -> SipTrunk {
    let mut trunk = SipTrunk::new_vendor(
        "vendor-trunk-004",
        "Telnyx International",
        "PROV-003",
        "machine-04",
        OPERATOR,
    );

    trunk.basic.vendor_id = Some("vendor-003".to_string());
    trunk.basic.description =
        Some("Telnyx termination for international and Zone 1 traffic".to_string());
    trunk.basic.purpose = TrunkPurpose::Geographic;
    trunk.basic.quality_tier = Some(QualityTier::Standard);
    trunk.basic.regions = vec!["INTERNATIONAL".to_string(), "ZONE1".to_string()];
    trunk.basic.provider_type = Some(ProviderType::International);
    trunk.basic.status = TrunkStatus::Active;

    trunk.authentication = TrunkAuthentication {
        auth_type: AuthType::Both,
        ip_whitelist: vec![
            IpWhitelistEntry::new("203.0.113.10", Some("32"), "IGP Gateway 1"),
            IpWhitelistEntry::new("203.0.113.11", Some("32"), "IGP Gateway 2"),
        ],
        credentials: Some(SipCredentials {
            username: "ringer_intl".to_string(),
            password: "intl_secure_789".to_string(),
            realm: Some("international.gateway.pro".to_string()),
        }),
        tech_prefix: None,
    };

    trunk.connection = Some(TrunkConnection {
        dialstrings: dialstrings(&["intl1.gateway.pro:5060", "intl2.gateway.pro:5060"]),
        transport: Transport::Tls,
        port: Some(5061),
        credentials: Some(CarrierCredentials {
            username: "ringer_intl".to_string(),
            password: "intl_secure_789".to_string(),
        }),
    });

    trunk.routing = TrunkRouting {
        partitions: partitions(&[("machine-04", 1)]),
        supported_zones: vec![TrafficZone::International, TrafficZone::Zone1],
        jurisdiction: JurisdictionPolicy {
            behavior: JurisdictionBehavior::Interstate,
            poi_state: None,
            ani_classification: AniClassification::Intl,
            ani_prefix: None,
            normalize_ani: false,
        },
    };

    let effective = date(2024, 1, 1);
    trunk.rates = TrunkRates {
        zones: BTreeMap::from([
            (
                TrafficZone::International,
                ZoneRate::new(dec!(0.018), effective).with_ceiling(dec!(0.05)),
            ),
            (
                TrafficZone::Zone1,
                ZoneRate::new(dec!(0.015), effective).with_ceiling(dec!(0.03)),
            ),
        ]),
        rate_limiting: RateLimiting {
            enabled: true,
            max_rate: Some(dec!(0.1)),
        },
        margin_analysis: None,
    };

    trunk.overrides = TrunkOverrides {
        static_overrides: StaticOverrides {
            intl_override: Some(dec!(0.022)),
            ..Default::default()
        },
        dynamic: vec![DynamicOverride {
            id: "override-002".to_string(),
            match_type: MatchType::Prefix,
            match_pattern: "44".to_string(),
            override_rate: dec!(0.015),
            priority: 5,
            max_override: None,
            effective_date: effective,
            expiration_date: None,
        }],
    };

    trunk.exclusions.destinations = DestinationExclusions {
        blocked_prefixes: Vec::new(),
        blocked_countries: vec!["CU".to_string(), "IR".to_string(), "KP".to_string()],
        block_premium: true,
    };

    trunk.features = TrunkFeatures {
        media: MediaSettings {
            codecs: vec![Codec::Pcmu, Codec::Pcma, Codec::G729, Codec::G722],
            transcoding: true,
            dtmf_mode: DtmfMode::Rfc2833,
            fax_support: FaxSupport::None,
            rtp_proxy: RtpProxyMode::Always,
        },
        calls: CallLimits {
            max_concurrent_calls: 500,
            calls_per_second_limit: 25,
            session_timers: true,
            session_timeout: 1800,
        },
    };

    trunk.monitoring = TrunkMonitoring {
        quality_thresholds: QualityThresholds {
            min_asr: dec!(92.0),
            min_acd: dec!(2.0),
            max_pdd: 5000,
        },
        homer: HomerCapture {
            capture_sip: true,
            capture_rtp_headers: false,
            hep_node_id: Some(202),
        },
    };

    trunk
}

/// Every reference trunk
pub fn all() -> Vec<SipTrunk> {
    vec![
        acme_hq_customer(),
        att_interstate_vendor(),
        telnyx_international_vendor(),
    ]
}
