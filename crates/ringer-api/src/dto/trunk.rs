//! Trunk tooling DTOs
//!
//! Request and response types for the validation, rating, exclusion,
//! margin and health endpoints. Every request carries the trunk document it
//! is evaluated against, so these endpoints need no platform session.

use chrono::{NaiveDate, Utc};
use ringer_core::models::{SipTrunk, TrafficZone, TrunkStatus};
use ringer_core::AppError;
use ringer_services::{
    exclusion::DestinationBlock, ExportFormat, ExportOptions, OverallStatus, RateQuery,
    RateResolution, ValidationResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A trunk document to evaluate
#[derive(Debug, Clone, Deserialize)]
pub struct TrunkDocument {
    pub trunk: SipTrunk,
}

/// Validation outcome with the panel summary
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub overall: OverallStatus,
    /// Percentage of rules passed
    pub score: u32,
    #[serde(flatten)]
    pub result: ValidationResult,
}

impl From<ValidationResult> for ValidationResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            valid: result.is_valid(),
            overall: result.overall(),
            score: result.score(),
            result,
        }
    }
}

/// Rate resolution request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveRateRequest {
    pub trunk: SipTrunk,

    pub zone: TrafficZone,

    #[validate(length(min = 1, max = 32, message = "Called number is required"))]
    pub called_number: String,

    /// Rating date, today when omitted
    #[serde(default)]
    pub as_of: Option<NaiveDate>,

    #[serde(default)]
    pub ocn: Option<String>,

    #[serde(default)]
    pub lata: Option<String>,

    #[serde(default)]
    #[validate(length(equal = 4, message = "CIC must be four digits"))]
    pub cic: Option<String>,

    /// Call duration to price, in seconds
    #[serde(default)]
    #[validate(range(max = 86400))]
    pub duration_secs: Option<u32>,
}

impl ResolveRateRequest {
    pub fn to_query(&self) -> RateQuery {
        let mut query = RateQuery::new(
            self.zone,
            &self.called_number,
            self.as_of.unwrap_or_else(|| Utc::now().date_naive()),
        );
        query.ocn = self.ocn.clone();
        query.lata = self.lata.clone();
        query.cic = self.cic.clone();
        query
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveRateResponse {
    #[serde(flatten)]
    pub resolution: RateResolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// Cost of `duration_secs` after minimum duration and increment rounding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billable_cost: Option<Decimal>,
}

/// Exclusion check request
///
/// `provider_id` additionally checks the trunk's provider exclusions on
/// `as_of`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExclusionCheckRequest {
    pub trunk: SipTrunk,

    #[validate(length(min = 1, max = 32, message = "Called number is required"))]
    pub called_number: String,

    #[serde(default)]
    pub provider_id: Option<String>,

    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExclusionCheckResponse {
    pub excluded: bool,
    /// Rule that blocked the destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<DestinationBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_excluded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reason: Option<String>,
}

/// Margin computation request
#[derive(Debug, Clone, Deserialize)]
pub struct MarginRequest {
    pub vendor_cost: Decimal,
    pub customer_rate: Decimal,
}

impl MarginRequest {
    pub fn validate_business_rules(&self) -> Result<(), AppError> {
        if self.vendor_cost.is_sign_negative() || self.customer_rate.is_sign_negative() {
            return Err(AppError::Validation(
                "Vendor cost and customer rate cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Margin analysis built from a customer/vendor pair
#[derive(Debug, Clone, Deserialize)]
pub struct MarginAnalysisRequest {
    pub customer: SipTrunk,
    pub vendor: SipTrunk,
}

/// Apply a built-in rate template
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyTemplateRequest {
    pub trunk: SipTrunk,

    #[validate(length(min = 1, message = "Template id is required"))]
    pub template_id: String,

    /// Effective date of the new rates, today when omitted
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

/// Export a set of trunk documents
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExportRequest {
    #[validate(length(min = 1, message = "At least one trunk is required"))]
    pub trunks: Vec<SipTrunk>,

    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default)]
    pub options: ExportOptions,
}

/// Check a CSV or JSON import before submitting it
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImportValidateRequest {
    #[validate(length(min = 1, message = "Import data is required"))]
    pub data: String,
}

/// Status change request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusChangeRequest {
    /// `active`, `suspended` or `testing`, any letter case
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

impl StatusChangeRequest {
    pub fn parse(&self) -> Result<TrunkStatus, AppError> {
        TrunkStatus::from_str(self.status.trim()).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown trunk status '{}'", self.status))
        })
    }
}
