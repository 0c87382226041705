//! Trunk validation
//!
//! Problems are returned as data: a list of field-level issues, each an
//! error (blocks submission) or a warning (shown, does not block). Every rule
//! evaluated counts toward the score, so a trunk's score is the share of
//! rules it passes.

use crate::constants::{MAX_PLAUSIBLE_RATE, MIN_DESCRIPTION_LEN, MIN_NAME_LEN, MIN_PLAUSIBLE_RATE};
use crate::rating::pattern_is_well_formed;
use ringer_core::models::{
    IpWhitelistEntry, JurisdictionBehavior, LrnProvider, SipTrunk, TrunkConnection, TrunkType,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use ipnetwork::{ipv4_mask_to_prefix, IpNetwork};
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `rates.zones.INTERSTATE.rate`
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Passed,
    Warnings,
    Failed,
}

/// Outcome of validating a trunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub rules_checked: u32,
    pub rules_passed: u32,
}

impl ValidationResult {
    /// Record the outcome of one rule
    fn check(&mut self, ok: bool, severity: Severity, field: impl Into<String>, message: impl Into<String>) {
        self.rules_checked += 1;
        if ok {
            self.rules_passed += 1;
        } else {
            self.issues.push(ValidationIssue {
                field: field.into(),
                message: message.into(),
                severity,
            });
        }
    }

    fn require(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        self.check(ok, Severity::Error, field, message);
    }

    fn advise(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        self.check(ok, Severity::Warning, field, message);
    }

    /// No errors; warnings are allowed
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn overall(&self) -> OverallStatus {
        if !self.is_valid() {
            OverallStatus::Failed
        } else if self.warnings().next().is_some() {
            OverallStatus::Warnings
        } else {
            OverallStatus::Passed
        }
    }

    /// Percent of rules passed, rounded
    pub fn score(&self) -> u32 {
        if self.rules_checked == 0 {
            return 100;
        }
        (self.rules_passed * 100 + self.rules_checked / 2) / self.rules_checked
    }

    /// Issues reported for a field or any field below it
    pub fn issues_for<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.field.starts_with(prefix))
    }

    /// One-line summary of the errors, for error responses
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Prefix length of a subnet given as a bit count or a dotted IPv4 netmask
fn subnet_prefix(ip: &IpAddr, subnet: &str) -> Option<u8> {
    let prefix = match subnet.parse::<u8>() {
        Ok(bits) => bits,
        Err(_) => match (ip, subnet.parse::<Ipv4Addr>()) {
            (IpAddr::V4(_), Ok(mask)) => ipv4_mask_to_prefix(mask).ok()?,
            _ => return None,
        },
    };
    IpNetwork::new(*ip, prefix).ok().map(|net| net.prefix())
}

fn subnet_is_valid(ip: &IpAddr, subnet: &str) -> bool {
    subnet_prefix(ip, subnet).is_some()
}

/// Identity used for duplicate detection
///
/// Parsed addresses compare in canonical form and subnets by prefix length,
/// so `2001:DB8::1/64` and `2001:db8:0::1/64` collide.
fn whitelist_key(entry: &IpWhitelistEntry) -> (String, Option<String>) {
    let raw_ip = entry.ip.trim();
    let subnet = entry
        .subnet
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match raw_ip.parse::<IpAddr>() {
        Ok(ip) => {
            let prefix = subnet.map(|s| {
                subnet_prefix(&ip, s).map_or_else(|| s.to_string(), |p| p.to_string())
            });
            (ip.to_string(), prefix)
        }
        Err(_) => (raw_ip.to_string(), subnet.map(str::to_string)),
    }
}

fn validate_basic(trunk: &SipTrunk, result: &mut ValidationResult) {
    let basic = &trunk.basic;

    result.require(!basic.id.trim().is_empty(), "basic.id", "Trunk id is required");

    let name = basic.name.trim();
    result.require(!name.is_empty(), "basic.name", "Trunk name is required");
    if !name.is_empty() {
        result.advise(
            name.chars().count() >= MIN_NAME_LEN,
            "basic.name",
            format!("Trunk name should be at least {} characters", MIN_NAME_LEN),
        );
    }

    let description = basic.description.as_deref().map(str::trim).unwrap_or("");
    result.advise(
        description.chars().count() >= MIN_DESCRIPTION_LEN,
        "basic.description",
        format!(
            "A description of at least {} characters helps operators",
            MIN_DESCRIPTION_LEN
        ),
    );

    result.require(
        !basic.machine_id.trim().is_empty(),
        "basic.machine_id",
        "Machine assignment is required",
    );

    match basic.trunk_type {
        TrunkType::Customer => {
            result.require(
                !is_blank(&basic.ban),
                "basic.ban",
                "Customer trunks require a billing account (BAN)",
            );
            result.require(
                basic.provider_id.is_none(),
                "basic.provider_id",
                "Customer trunks cannot have a provider",
            );
            result.require(
                basic.vendor_id.is_none(),
                "basic.vendor_id",
                "Customer trunks cannot have a vendor id",
            );
            result.require(
                trunk.connection.is_none(),
                "connection",
                "Carrier connection is only valid on vendor trunks",
            );
        }
        TrunkType::Vendor => {
            result.require(
                !is_blank(&basic.provider_id),
                "basic.provider_id",
                "Vendor trunks require a provider",
            );
            result.require(
                is_blank(&basic.ban),
                "basic.ban",
                "Vendor trunks cannot have a billing account (BAN)",
            );
            result.require(
                basic.customer_id.is_none(),
                "basic.customer_id",
                "Vendor trunks cannot have a customer id",
            );
            result.require(
                trunk.rates.margin_analysis.is_none(),
                "rates.margin_analysis",
                "Margin analysis is only kept on customer trunks",
            );
        }
    }
}

fn validate_authentication(trunk: &SipTrunk, result: &mut ValidationResult) {
    let auth = &trunk.authentication;

    if auth.auth_type.requires_whitelist() {
        result.require(
            !auth.ip_whitelist.is_empty(),
            "authentication.ip_whitelist",
            format!("{} authentication requires at least one IP address", auth.auth_type),
        );
    }
    if auth.auth_type.requires_credentials() {
        let complete = auth
            .credentials
            .as_ref()
            .is_some_and(|c| !c.username.trim().is_empty() && !c.password.is_empty());
        result.require(
            complete,
            "authentication.credentials",
            "SIP digest authentication requires a username and password",
        );
    }

    let mut seen = HashSet::new();
    for (i, entry) in auth.ip_whitelist.iter().enumerate() {
        validate_ip_entry(i, entry, result);
        result.require(
            seen.insert(whitelist_key(entry)),
            format!("authentication.ip_whitelist[{}]", i),
            format!("Duplicate whitelist entry {}", entry.ip),
        );
    }
}

fn validate_ip_entry(i: usize, entry: &IpWhitelistEntry, result: &mut ValidationResult) {
    let field = format!("authentication.ip_whitelist[{}].ip", i);
    match entry.ip.trim().parse::<IpAddr>() {
        Ok(ip) => {
            result.require(true, field, "");
            if let Some(subnet) = entry.subnet.as_deref() {
                result.require(
                    subnet_is_valid(&ip, subnet.trim()),
                    format!("authentication.ip_whitelist[{}].subnet", i),
                    format!("'{}' is not a valid subnet for {}", subnet, entry.ip),
                );
            }
        }
        Err(_) => result.require(false, field, format!("'{}' is not a valid IP address", entry.ip)),
    }
}

fn validate_connection(trunk: &SipTrunk, result: &mut ValidationResult) {
    if !trunk.is_vendor() {
        return;
    }

    match trunk.connection.as_ref() {
        Some(connection) => {
            if trunk.basic.direction.carries_outbound() {
                result.require(
                    !connection.dialstrings.is_empty(),
                    "connection.dialstrings",
                    "At least one dial string is required",
                );
            }
            for (i, dialstring) in connection.dialstrings.iter().enumerate() {
                result.require(
                    dialstring.contains(TrunkConnection::NUMBER_PLACEHOLDER),
                    format!("connection.dialstrings[{}]", i),
                    format!(
                        "Dial string must contain the {} placeholder",
                        TrunkConnection::NUMBER_PLACEHOLDER
                    ),
                );
            }
            if let Some(port) = connection.port {
                result.require(port != 0, "connection.port", "Port must be between 1 and 65535");
            }
        }
        None => result.require(
            !trunk.basic.direction.carries_outbound(),
            "connection",
            "Vendor trunks that carry outbound traffic need a carrier connection",
        ),
    }
}

fn validate_routing(trunk: &SipTrunk, result: &mut ValidationResult) {
    let routing = &trunk.routing;

    let mut machines = HashSet::new();
    for (i, partition) in routing.partitions.iter().enumerate() {
        result.require(
            machines.insert(partition.machine_id.as_str()),
            format!("routing.partitions[{}]", i),
            format!("Machine {} is assigned more than once", partition.machine_id),
        );
    }

    if routing.jurisdiction.behavior == JurisdictionBehavior::Poi {
        result.require(
            !is_blank(&routing.jurisdiction.poi_state),
            "routing.jurisdiction.poi_state",
            "POI jurisdiction requires a POI state",
        );
    }
}

fn validate_rates(trunk: &SipTrunk, result: &mut ValidationResult) {
    let rates = &trunk.rates;

    for (zone, zone_rate) in &rates.zones {
        let field = format!("rates.zones.{}", zone);

        result.require(
            zone_rate.rate >= Decimal::ZERO,
            format!("{}.rate", field),
            "Rate cannot be negative",
        );
        if zone_rate.rate > Decimal::ZERO {
            result.advise(
                zone_rate.rate >= MIN_PLAUSIBLE_RATE && zone_rate.rate <= MAX_PLAUSIBLE_RATE,
                format!("{}.rate", field),
                format!(
                    "Rate {} is outside the usual range {} - {}",
                    zone_rate.rate, MIN_PLAUSIBLE_RATE, MAX_PLAUSIBLE_RATE
                ),
            );
        }
        result.require(
            zone_rate.increment > 0,
            format!("{}.increment", field),
            "Billing increment must be at least one second",
        );

        if let Some(ceiling) = zone_rate.max_acceptable_rate {
            result.require(
                trunk.is_vendor(),
                format!("{}.max_acceptable_rate", field),
                "LCR ceiling only applies to vendor trunks",
            );
            result.require(
                ceiling >= zone_rate.rate,
                format!("{}.max_acceptable_rate", field),
                format!("LCR ceiling {} is below the rate {}", ceiling, zone_rate.rate),
            );
        }

        if !trunk.routing.supported_zones.is_empty() {
            result.advise(
                trunk.routing.supports(*zone),
                field,
                format!("{} is rated but not in the supported zones", zone),
            );
        }
    }

    if rates.rate_limiting.enabled {
        match rates.rate_limiting.max_rate {
            Some(max_rate) => {
                for (zone, zone_rate) in &rates.zones {
                    result.require(
                        zone_rate.rate <= max_rate,
                        "rates.rate_limiting.max_rate",
                        format!("Rate limit {} is below the {} rate {}", max_rate, zone, zone_rate.rate),
                    );
                }
            }
            None => result.require(
                false,
                "rates.rate_limiting.max_rate",
                "Rate limiting is enabled without a maximum rate",
            ),
        }
    }

    for (zone, entry) in rates.margin_analysis.iter().flatten() {
        let field = format!("rates.margin_analysis.{}", zone);
        match rates.zones.get(zone) {
            Some(zone_rate) => {
                result.require(
                    entry.customer_rate() == zone_rate.rate,
                    field.clone(),
                    "Margin entry is stale: customer rate differs from the zone rate",
                );
            }
            None => result.require(false, field.clone(), format!("{} has no zone rate", zone)),
        }
        result.require(
            entry.is_consistent(),
            field,
            "Margin figures do not match vendor cost and customer rate",
        );
    }
}

fn validate_overrides(trunk: &SipTrunk, result: &mut ValidationResult) {
    let overrides = &trunk.overrides;

    let statics = [
        ("dom_override", overrides.static_overrides.dom_override),
        ("intl_override", overrides.static_overrides.intl_override),
        ("cic_override", overrides.static_overrides.cic_override),
    ];
    for (name, value) in statics {
        if let Some(rate) = value {
            result.require(
                rate >= Decimal::ZERO,
                format!("overrides.static.{}", name),
                "Override rate cannot be negative",
            );
        }
    }

    let mut ids = HashSet::new();
    for (i, ovr) in overrides.dynamic.iter().enumerate() {
        let field = format!("overrides.dynamic[{}]", i);

        result.require(
            ids.insert(ovr.id.as_str()),
            format!("{}.id", field),
            format!("Duplicate override id {}", ovr.id),
        );
        result.require(
            pattern_is_well_formed(ovr.match_type, ovr.match_pattern.trim()),
            format!("{}.match_pattern", field),
            format!("'{}' is not a valid {} pattern", ovr.match_pattern, ovr.match_type),
        );
        result.require(
            ovr.override_rate >= Decimal::ZERO,
            format!("{}.override_rate", field),
            "Override rate cannot be negative",
        );
        if let Some(cap) = ovr.max_override {
            result.require(
                ovr.override_rate <= cap,
                format!("{}.override_rate", field),
                format!("Override rate {} exceeds its maximum {}", ovr.override_rate, cap),
            );
        }
        if let Some(expiration) = ovr.expiration_date {
            result.require(
                expiration >= ovr.effective_date,
                format!("{}.expiration_date", field),
                "Expiration date is before the effective date",
            );
        }
    }
}

fn validate_exclusions(trunk: &SipTrunk, result: &mut ValidationResult) {
    let exclusions = &trunk.exclusions;

    for (i, provider) in exclusions.providers.iter().enumerate() {
        if let Some(end) = provider.effective_end {
            result.require(
                end >= provider.effective_start,
                format!("exclusions.providers[{}].effective_end", i),
                "Exclusion ends before it starts",
            );
        }
    }

    for (i, prefix) in exclusions.destinations.blocked_prefixes.iter().enumerate() {
        result.require(
            !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()),
            format!("exclusions.destinations.blocked_prefixes[{}]", i),
            format!("'{}' is not a digit prefix", prefix),
        );
    }

    for (i, country) in exclusions.destinations.blocked_countries.iter().enumerate() {
        result.require(
            country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()),
            format!("exclusions.destinations.blocked_countries[{}]", i),
            format!("'{}' is not an ISO-3166 alpha-2 country code", country),
        );
    }
}

fn validate_features(trunk: &SipTrunk, result: &mut ValidationResult) {
    let features = &trunk.features;

    result.advise(
        !features.media.codecs.is_empty(),
        "features.media.codecs",
        "No codecs selected",
    );
    result.require(
        features.calls.max_concurrent_calls > 0,
        "features.calls.max_concurrent_calls",
        "Concurrent call limit must be positive",
    );
    result.require(
        features.calls.calls_per_second_limit > 0,
        "features.calls.calls_per_second_limit",
        "Calls-per-second limit must be positive",
    );
    if features.calls.session_timers {
        result.require(
            features.calls.session_timeout > 0,
            "features.calls.session_timeout",
            "Session timers need a positive timeout",
        );
    }
}

fn validate_monitoring(trunk: &SipTrunk, result: &mut ValidationResult) {
    let thresholds = &trunk.monitoring.quality_thresholds;

    result.require(
        thresholds.min_asr >= Decimal::ZERO && thresholds.min_asr <= Decimal::ONE_HUNDRED,
        "monitoring.quality_thresholds.min_asr",
        "Minimum ASR must be between 0 and 100",
    );
    result.require(
        thresholds.min_acd >= Decimal::ZERO,
        "monitoring.quality_thresholds.min_acd",
        "Minimum ACD cannot be negative",
    );

    let dips = &trunk.dip_integration;
    if dips.lrn.enabled && dips.lrn.provider == LrnProvider::Custom {
        result.require(
            !is_blank(&dips.lrn.custom_url),
            "dip_integration.lrn.custom_url",
            "Custom LRN provider requires a URL",
        );
    }
    if let Some(cic) = dips.cic.default_cic.as_deref() {
        result.require(
            pattern_is_well_formed(ringer_core::models::MatchType::Cic, cic),
            "dip_integration.cic.default_cic",
            format!("'{}' is not a four-digit CIC", cic),
        );
    }
}

/// Validate a trunk document
#[instrument(skip(trunk), fields(trunk_id = %trunk.basic.id))]
pub fn validate_trunk(trunk: &SipTrunk) -> ValidationResult {
    let mut result = ValidationResult::default();

    validate_basic(trunk, &mut result);
    validate_authentication(trunk, &mut result);
    validate_connection(trunk, &mut result);
    validate_routing(trunk, &mut result);
    validate_rates(trunk, &mut result);
    validate_overrides(trunk, &mut result);
    validate_exclusions(trunk, &mut result);
    validate_features(trunk, &mut result);
    validate_monitoring(trunk, &mut result);

    debug!(
        checked = result.rules_checked,
        passed = result.rules_passed,
        issues = result.issues.len(),
        "Trunk validated"
    );
    result
}

/// Validate an edit of an existing trunk
///
/// Adds identity rules on top of [`validate_trunk`]: the id and the trunk
/// type cannot change.
pub fn validate_trunk_update(existing: &SipTrunk, updated: &SipTrunk) -> ValidationResult {
    let mut result = validate_trunk(updated);

    result.require(
        existing.basic.id == updated.basic.id,
        "basic.id",
        format!("Trunk id cannot change from {}", existing.basic.id),
    );
    result.require(
        existing.basic.trunk_type == updated.basic.trunk_type,
        "basic.type",
        format!(
            "Trunk type is fixed at creation ({})",
            existing.basic.trunk_type
        ),
    );

    result
}
