//! Trunk tooling handlers
//!
//! Stateless endpoints that evaluate a posted trunk document. None of them
//! talk to the platform.

use crate::dto::{
    ApiResponse, ApplyTemplateRequest, ExclusionCheckRequest, ExclusionCheckResponse,
    ExportRequest, ImportValidateRequest, MarginAnalysisRequest, MarginRequest,
    ResolveRateRequest, ResolveRateResponse, TrunkDocument, ValidationResponse,
};
use crate::state::AppState;
use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use ringer_core::models::compute_margin;
use ringer_core::AppError;
use ringer_services::{
    build_margin_analysis, evaluate_health, exclusion_reason, export_trunks, margin_report,
    provider_exclusion, resolve_rate, validate_import, validate_trunk, RateTemplate,
};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Health check endpoint
///
/// GET /api/v1/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "ringer-trunks",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Validate a trunk document
///
/// POST /api/v1/trunks/validate
///
/// Responds 200 with the issues even when the trunk is invalid.
#[instrument(skip(req), fields(trunk_id = %req.trunk.basic.id))]
pub async fn validate(req: web::Json<TrunkDocument>) -> Result<HttpResponse, AppError> {
    let result = validate_trunk(&req.trunk);
    debug!(issues = result.issues.len(), "Trunk validated");

    Ok(HttpResponse::Ok().json(ApiResponse::success(ValidationResponse::from(result))))
}

/// Margin report of a customer trunk
///
/// POST /api/v1/trunks/margin-report
#[instrument(skip(state, req), fields(trunk_id = %req.trunk.basic.id))]
pub async fn margin_report_handler(
    state: web::Data<AppState>,
    req: web::Json<TrunkDocument>,
) -> Result<HttpResponse, AppError> {
    let report = margin_report(&req.trunk, &state.margin)?;
    if !report.risk_zones.is_empty() {
        info!(risk_zones = ?report.risk_zones, "Trunk has zones at margin risk");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// Margin entries for a customer/vendor trunk pair
///
/// POST /api/v1/trunks/margin-analysis
#[instrument(skip(req), fields(customer = %req.customer.basic.id, vendor = %req.vendor.basic.id))]
pub async fn margin_analysis(req: web::Json<MarginAnalysisRequest>) -> Result<HttpResponse, AppError> {
    let analysis = build_margin_analysis(&req.customer, &req.vendor)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(analysis)))
}

/// Resolve the effective rate of a call
///
/// POST /api/v1/trunks/resolve-rate
#[instrument(skip(req), fields(trunk_id = %req.trunk.basic.id, zone = %req.zone))]
pub async fn resolve_rate_handler(
    req: web::Json<ResolveRateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Rate resolution request validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let resolution = resolve_rate(&req.trunk, &req.to_query())?;
    let billable_cost = req.duration_secs.map(|secs| resolution.billable_cost(secs));

    Ok(HttpResponse::Ok().json(ApiResponse::success(ResolveRateResponse {
        resolution,
        duration_secs: req.duration_secs,
        billable_cost,
    })))
}

/// Check a destination (and optionally a provider) against exclusions
///
/// POST /api/v1/trunks/exclusion-check
#[instrument(skip(req), fields(trunk_id = %req.trunk.basic.id))]
pub async fn exclusion_check(
    req: web::Json<ExclusionCheckRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Exclusion check validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let rule = exclusion_reason(&req.trunk, &req.called_number);

    let as_of = req.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let provider = req
        .provider_id
        .as_deref()
        .map(|id| provider_exclusion(&req.trunk, id, as_of));

    let response = ExclusionCheckResponse {
        excluded: rule.is_some(),
        reason: rule.as_ref().map(ToString::to_string),
        rule,
        provider_excluded: provider.map(|p| p.is_some()),
        provider_reason: provider.flatten().map(|p| p.reason.to_string()),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Monitoring health of a trunk
///
/// POST /api/v1/trunks/health
#[instrument(skip(req), fields(trunk_id = %req.trunk.basic.id))]
pub async fn trunk_health(req: web::Json<TrunkDocument>) -> Result<HttpResponse, AppError> {
    let report = evaluate_health(&req.trunk);
    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// Margin between a vendor cost and a customer rate
///
/// POST /api/v1/margin
#[instrument(skip(req))]
pub async fn margin(req: web::Json<MarginRequest>) -> Result<HttpResponse, AppError> {
    req.validate_business_rules()?;
    let margin = compute_margin(req.vendor_cost, req.customer_rate);
    Ok(HttpResponse::Ok().json(ApiResponse::success(margin)))
}

/// List built-in rate templates
///
/// GET /api/v1/templates
pub async fn list_templates() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(RateTemplate::builtin()))
}

/// Apply a rate template and return the updated trunk
///
/// POST /api/v1/trunks/apply-template
#[instrument(skip(req), fields(trunk_id = %req.trunk.basic.id, template = %req.template_id))]
pub async fn apply_template(
    req: web::Json<ApplyTemplateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let req = req.into_inner();
    let template = RateTemplate::find(&req.template_id)
        .ok_or_else(|| AppError::NotFound(format!("Rate template {}", req.template_id)))?;

    let mut trunk = req.trunk;
    template.apply(
        &mut trunk,
        req.effective_date.unwrap_or_else(|| Utc::now().date_naive()),
    )?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(trunk)))
}

/// Export trunks as a CSV or JSON attachment
///
/// POST /api/v1/trunks/export
#[instrument(skip(req), fields(count = req.trunks.len(), format = ?req.format))]
pub async fn export(req: web::Json<ExportRequest>) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let body = export_trunks(&req.trunks, req.format, &req.options)?;
    info!(secrets = req.options.include_secrets, "Trunks exported");

    let filename = format!(
        "trunks-export-{}.{}",
        Utc::now().format("%Y-%m-%d"),
        req.format.extension()
    );
    Ok(HttpResponse::Ok()
        .content_type(req.format.content_type())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body))
}

/// Check an import document row by row
///
/// POST /api/v1/trunks/import/validate
///
/// Responds 200 with the row issues even when the import would fail.
#[instrument(skip(req), fields(bytes = req.data.len()))]
pub async fn validate_import_handler(
    req: web::Json<ImportValidateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let result = validate_import(&req.data);
    if !result.success {
        debug!(errors = result.errors.len(), "Import rejected");
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

/// Configure tooling routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/margin", web::post().to(margin))
        .route("/templates", web::get().to(list_templates))
        .service(
            web::scope("/trunks")
                .route("/validate", web::post().to(validate))
                .route("/margin-report", web::post().to(margin_report_handler))
                .route("/margin-analysis", web::post().to(margin_analysis))
                .route("/resolve-rate", web::post().to(resolve_rate_handler))
                .route("/exclusion-check", web::post().to(exclusion_check))
                .route("/health", web::post().to(trunk_health))
                .route("/apply-template", web::post().to(apply_template))
                .route("/export", web::post().to(export))
                .route("/import/validate", web::post().to(validate_import_handler)),
        );
}
