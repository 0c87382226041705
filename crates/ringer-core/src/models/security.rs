//! Trunk authentication and carrier connection settings

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the platform authenticates traffic on a trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    IpAcl,
    SipDigest,
    /// IP whitelist and SIP digest together
    Both,
    None,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::IpAcl => write!(f, "IP_ACL"),
            AuthType::SipDigest => write!(f, "DIGEST"),
            AuthType::Both => write!(f, "BOTH"),
            AuthType::None => write!(f, "NONE"),
        }
    }
}

impl AuthType {
    /// Parse from string (case-insensitive, accepts the backend spelling)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ip_acl" | "ip" => Some(AuthType::IpAcl),
            "sip_digest" | "digest" => Some(AuthType::SipDigest),
            "both" => Some(AuthType::Both),
            "none" => Some(AuthType::None),
            _ => None,
        }
    }

    pub fn requires_whitelist(&self) -> bool {
        matches!(self, AuthType::IpAcl | AuthType::Both)
    }

    pub fn requires_credentials(&self) -> bool {
        matches!(self, AuthType::SipDigest | AuthType::Both)
    }
}

/// Whitelisted source address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpWhitelistEntry {
    pub ip: String,

    /// Prefix length or dotted netmask
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,

    #[serde(default)]
    pub label: String,
}

impl IpWhitelistEntry {
    pub fn new(ip: &str, subnet: Option<&str>, label: &str) -> Self {
        Self {
            ip: ip.to_string(),
            subnet: subnet.map(str::to_string),
            label: label.to_string(),
        }
    }
}

/// SIP digest credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipCredentials {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

/// Authentication block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrunkAuthentication {
    #[serde(rename = "type")]
    pub auth_type: AuthType,

    #[serde(default)]
    pub ip_whitelist: Vec<IpWhitelistEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SipCredentials>,

    /// Digits the customer prepends to route through this trunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_prefix: Option<String>,
}

/// SIP transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
    Tls,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => write!(f, "UDP"),
            Transport::Tcp => write!(f, "TCP"),
            Transport::Tls => write!(f, "TLS"),
        }
    }
}

impl Transport {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UDP" => Some(Transport::Udp),
            "TCP" => Some(Transport::Tcp),
            "TLS" => Some(Transport::Tls),
            _ => None,
        }
    }

    /// Conventional SIP port for the transport
    pub fn default_port(&self) -> u16 {
        match self {
            Transport::Tls => 5061,
            _ => 5060,
        }
    }
}

/// Credentials presented to a carrier when we originate toward it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierCredentials {
    pub username: String,
    pub password: String,
}

/// Carrier connection block (vendor trunks only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrunkConnection {
    /// Tried in order; each must contain the number placeholder
    #[serde(default)]
    pub dialstrings: Vec<String>,

    #[serde(default)]
    pub transport: Transport,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CarrierCredentials>,
}

impl TrunkConnection {
    /// Placeholder substituted with the dialed number
    pub const NUMBER_PLACEHOLDER: &'static str = "${number}";

    /// Effective port, falling back to the transport default
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_requirements() {
        assert!(AuthType::Both.requires_whitelist());
        assert!(AuthType::Both.requires_credentials());
        assert!(!AuthType::IpAcl.requires_credentials());
        assert!(!AuthType::None.requires_whitelist());
        assert_eq!(AuthType::from_str("DIGEST"), Some(AuthType::SipDigest));
        assert_eq!(AuthType::SipDigest.to_string(), "DIGEST");
    }

    #[test]
    fn test_effective_port() {
        let mut conn = TrunkConnection {
            transport: Transport::Tls,
            ..Default::default()
        };
        assert_eq!(conn.effective_port(), 5061);
        conn.transport = Transport::Udp;
        assert_eq!(conn.effective_port(), 5060);
        conn.port = Some(5080);
        assert_eq!(conn.effective_port(), 5080);
    }
}
