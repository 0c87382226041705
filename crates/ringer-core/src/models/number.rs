//! Dialed number parsing
//!
//! Normalizes what a caller dialed into E.164 digits and exposes the NANP
//! pieces (NPA, NXX) and the destination country that rate resolution and
//! exclusion checks match against.

use crate::error::AppError;
use serde::Serialize;

/// International dialing prefix used from NANP
const NANP_INTERNATIONAL_PREFIX: &str = "011";

/// NANP area codes that are not in the United States
const NANP_NON_US: &[(&str, &str)] = &[
    ("204", "CA"), ("226", "CA"), ("236", "CA"), ("249", "CA"), ("250", "CA"),
    ("263", "CA"), ("289", "CA"), ("306", "CA"), ("343", "CA"), ("354", "CA"),
    ("365", "CA"), ("367", "CA"), ("368", "CA"), ("382", "CA"), ("403", "CA"),
    ("416", "CA"), ("418", "CA"), ("428", "CA"), ("431", "CA"), ("437", "CA"),
    ("438", "CA"), ("450", "CA"), ("468", "CA"), ("474", "CA"), ("506", "CA"),
    ("514", "CA"), ("519", "CA"), ("548", "CA"), ("579", "CA"), ("581", "CA"),
    ("584", "CA"), ("587", "CA"), ("604", "CA"), ("613", "CA"), ("639", "CA"),
    ("647", "CA"), ("672", "CA"), ("683", "CA"), ("705", "CA"), ("709", "CA"),
    ("742", "CA"), ("753", "CA"), ("778", "CA"), ("780", "CA"), ("782", "CA"),
    ("807", "CA"), ("819", "CA"), ("825", "CA"), ("867", "CA"), ("873", "CA"),
    ("879", "CA"), ("902", "CA"), ("905", "CA"),
    ("242", "BS"), ("246", "BB"), ("264", "AI"), ("268", "AG"), ("284", "VG"),
    ("340", "VI"), ("345", "KY"), ("441", "BM"), ("473", "GD"), ("649", "TC"),
    ("658", "JM"), ("876", "JM"), ("664", "MS"), ("670", "MP"), ("671", "GU"),
    ("684", "AS"), ("721", "SX"), ("758", "LC"), ("767", "DM"), ("784", "VC"),
    ("787", "PR"), ("939", "PR"), ("809", "DO"), ("829", "DO"), ("849", "DO"),
    ("868", "TT"), ("869", "KN"),
];

/// Country calling codes outside NANP, matched by longest code
const CALLING_CODES: &[(&str, &str)] = &[
    ("7", "RU"), ("20", "EG"), ("27", "ZA"), ("30", "GR"), ("31", "NL"),
    ("32", "BE"), ("33", "FR"), ("34", "ES"), ("36", "HU"), ("39", "IT"),
    ("40", "RO"), ("41", "CH"), ("43", "AT"), ("44", "GB"), ("45", "DK"),
    ("46", "SE"), ("47", "NO"), ("48", "PL"), ("49", "DE"), ("51", "PE"),
    ("52", "MX"), ("53", "CU"), ("54", "AR"), ("55", "BR"), ("56", "CL"),
    ("57", "CO"), ("58", "VE"), ("60", "MY"), ("61", "AU"), ("62", "ID"),
    ("63", "PH"), ("64", "NZ"), ("65", "SG"), ("66", "TH"), ("81", "JP"),
    ("82", "KR"), ("84", "VN"), ("86", "CN"), ("90", "TR"), ("91", "IN"),
    ("92", "PK"), ("93", "AF"), ("94", "LK"), ("95", "MM"), ("98", "IR"),
    ("211", "SS"), ("212", "MA"), ("213", "DZ"), ("216", "TN"), ("218", "LY"),
    ("220", "GM"), ("221", "SN"), ("225", "CI"), ("233", "GH"), ("234", "NG"),
    ("249", "SD"), ("251", "ET"), ("252", "SO"), ("254", "KE"), ("255", "TZ"),
    ("256", "UG"), ("260", "ZM"), ("263", "ZW"), ("351", "PT"), ("352", "LU"),
    ("353", "IE"), ("354", "IS"), ("355", "AL"), ("356", "MT"), ("357", "CY"),
    ("358", "FI"), ("359", "BG"), ("370", "LT"), ("371", "LV"), ("372", "EE"),
    ("373", "MD"), ("374", "AM"), ("375", "BY"), ("380", "UA"), ("381", "RS"),
    ("385", "HR"), ("386", "SI"), ("420", "CZ"), ("421", "SK"), ("502", "GT"),
    ("503", "SV"), ("504", "HN"), ("505", "NI"), ("506", "CR"), ("507", "PA"),
    ("509", "HT"), ("591", "BO"), ("593", "EC"), ("595", "PY"), ("598", "UY"),
    ("850", "KP"), ("852", "HK"), ("853", "MO"), ("855", "KH"), ("856", "LA"),
    ("880", "BD"), ("886", "TW"), ("960", "MV"), ("961", "LB"), ("962", "JO"),
    ("963", "SY"), ("964", "IQ"), ("965", "KW"), ("966", "SA"), ("967", "YE"),
    ("968", "OM"), ("970", "PS"), ("971", "AE"), ("972", "IL"), ("973", "BH"),
    ("974", "QA"), ("975", "BT"), ("976", "MN"), ("977", "NP"), ("992", "TJ"),
    ("993", "TM"), ("994", "AZ"), ("995", "GE"), ("996", "KG"), ("998", "UZ"),
];

/// NANP premium-rate area codes
const PREMIUM_NPAS: [&str; 2] = ["900", "976"];

/// Premium exchange usable under any NPA
const PREMIUM_NXX: &str = "976";

/// A dialed number normalized to E.164 digits (no leading `+`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialedNumber {
    e164: String,
}

impl DialedNumber {
    /// Parse a dialed number
    ///
    /// Non-digits are dropped, a leading `011` is treated as the
    /// international prefix and a bare 10-digit number is taken as NANP.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        let e164 = if let Some(rest) = digits.strip_prefix(NANP_INTERNATIONAL_PREFIX) {
            rest.to_string()
        } else if digits.len() == 10 {
            format!("1{}", digits)
        } else {
            digits
        };

        if e164.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "'{}' is not a dialable number",
                raw
            )));
        }

        Ok(Self { e164 })
    }

    /// E.164 digits without `+`
    #[inline]
    pub fn e164(&self) -> &str {
        &self.e164
    }

    /// North American Numbering Plan number (+1 and ten digits)
    pub fn is_nanp(&self) -> bool {
        self.e164.len() == 11 && self.e164.starts_with('1')
    }

    /// Ten-digit national number for NANP
    pub fn national(&self) -> Option<&str> {
        self.is_nanp().then(|| &self.e164[1..])
    }

    pub fn npa(&self) -> Option<&str> {
        self.national().map(|n| &n[..3])
    }

    pub fn nxx(&self) -> Option<&str> {
        self.national().map(|n| &n[3..6])
    }

    /// NPA followed by NXX
    pub fn npanxx(&self) -> Option<&str> {
        self.national().map(|n| &n[..6])
    }

    /// Whether the E.164 digits start with a digit prefix
    ///
    /// Prefixes always include the country code, so NANP area codes are
    /// written with their leading 1.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix: String = prefix.chars().filter(|c| c.is_ascii_digit()).collect();
        !prefix.is_empty() && self.e164.starts_with(&prefix)
    }

    /// NANP premium-rate number (900/976 area codes or the 976 exchange)
    pub fn is_premium(&self) -> bool {
        match (self.npa(), self.nxx()) {
            (Some(npa), Some(nxx)) => PREMIUM_NPAS.contains(&npa) || nxx == PREMIUM_NXX,
            _ => false,
        }
    }

    /// ISO-3166 alpha-2 code of the destination
    pub fn country(&self) -> Option<&'static str> {
        if let Some(npa) = self.npa() {
            let country = NANP_NON_US
                .iter()
                .find(|(code, _)| *code == npa)
                .map(|(_, iso)| *iso);
            return Some(country.unwrap_or("US"));
        }

        CALLING_CODES
            .iter()
            .filter(|(code, _)| self.e164.starts_with(code))
            .max_by_key(|(code, _)| code.len())
            .map(|(_, iso)| *iso)
    }
}
