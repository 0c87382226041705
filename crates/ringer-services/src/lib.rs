//! Business logic services for the Ringer trunk platform
//!
//! Everything here is pure: functions take a trunk (and sometimes a date or
//! a dialed number) and return data. Nothing performs I/O, so the same code
//! backs the HTTP endpoints, the API client's pre-submit checks and tests.
//!
//! # Services
//!
//! - `validation` - Field-level trunk validation and update checks
//! - `margin` - Margin analysis construction and reporting
//! - `rating` - Effective-rate resolution with overrides
//! - `exclusion` - Destination and provider exclusion checks
//! - `health` - Monitoring thresholds against observed stats
//! - `templates` - Predefined rate templates
//! - `bulk` - Trunk export and import validation

pub mod bulk;
pub mod exclusion;
pub mod health;
pub mod margin;
pub mod rating;
pub mod templates;
pub mod validation;

pub use bulk::{
    export_csv, export_json, export_trunks, validate_import, ExportFormat, ExportOptions,
    ImportIssue, ImportResult,
};
pub use exclusion::{
    exclusion_reason, is_number_excluded, is_provider_excluded, provider_exclusion,
    DestinationBlock,
};
pub use health::{evaluate_health, HealthBreach, HealthReport, HealthStatus, QualityMetric};
pub use margin::{build_margin_analysis, margin_report, MarginReport, MarginStatus, ZoneMargin};
pub use rating::{resolve_effective_rate, resolve_rate, RateQuery, RateResolution, RateSource};
pub use templates::{RateTemplate, TemplateZone};
pub use validation::{
    validate_trunk, validate_trunk_update, OverallStatus, Severity, ValidationIssue,
    ValidationResult,
};

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Lowest per-minute rate considered plausible
    pub const MIN_PLAUSIBLE_RATE: Decimal = dec!(0.001);

    /// Highest per-minute rate considered plausible
    pub const MAX_PLAUSIBLE_RATE: Decimal = dec!(10.0);

    /// Names shorter than this draw a warning
    pub const MIN_NAME_LEN: usize = 3;

    /// Descriptions shorter than this draw a warning
    pub const MIN_DESCRIPTION_LEN: usize = 10;

    /// Digits in a carrier identification code
    pub const CIC_LEN: usize = 4;

    /// Digits in an NPA-NXX
    pub const NPANXX_LEN: usize = 6;

    /// Longest E.164 number
    pub const MAX_E164_LEN: usize = 15;
}
