//! Integration tests for the API handlers
//!
//! The trunk resource endpoints run against an in-memory repository; the
//! tooling endpoints need no repository at all.

use actix_web::{test, web, App};
use async_trait::async_trait;
use parking_lot::Mutex;
use ringer_api::{configure, AppState};
use ringer_auth::{Session, SessionStore};
use ringer_core::config::MarginConfig;
use ringer_core::models::{SipTrunk, TrunkStatus};
use ringer_core::samples;
use ringer_core::traits::{Page, PaginationMeta, TrunkListQuery, TrunkRepository, TrunkScope};
use ringer_core::{AppError, AppResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;

/// Token the fake platform treats as revoked
const REVOKED: &str = "revoked-token";

struct InMemoryTrunks {
    trunks: Mutex<Vec<SipTrunk>>,
}

impl InMemoryTrunks {
    fn seeded() -> Self {
        Self {
            trunks: Mutex::new(samples::all()),
        }
    }
}

fn authorize(session: &mut Session) -> AppResult<()> {
    if session.access_token()? == REVOKED {
        session.end();
        return Err(AppError::SessionExpired);
    }
    Ok(())
}

#[async_trait]
impl TrunkRepository for InMemoryTrunks {
    type Session = Session;

    async fn list(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        query: &TrunkListQuery,
    ) -> AppResult<Page<SipTrunk>> {
        authorize(session)?;
        let items: Vec<SipTrunk> = self
            .trunks
            .lock()
            .iter()
            .filter(|t| TrunkScope::of(t).as_ref() == Some(scope))
            .filter(|t| query.status.map_or(true, |s| t.basic.status == s))
            .cloned()
            .collect();
        Ok(Page {
            pagination: PaginationMeta::new(items.len() as i64, query.page, query.per_page),
            items,
        })
    }

    async fn get(&self, session: &mut Session, scope: &TrunkScope, id: &str) -> AppResult<SipTrunk> {
        authorize(session)?;
        self.trunks
            .lock()
            .iter()
            .find(|t| t.basic.id == id && TrunkScope::of(t).as_ref() == Some(scope))
            .cloned()
            .ok_or_else(|| AppError::TrunkNotFound(id.to_string()))
    }

    async fn create(
        &self,
        session: &mut Session,
        _scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> AppResult<SipTrunk> {
        authorize(session)?;
        self.trunks.lock().push(trunk.clone());
        Ok(trunk.clone())
    }

    async fn update(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> AppResult<SipTrunk> {
        authorize(session)?;
        let mut trunks = self.trunks.lock();
        let slot = trunks
            .iter_mut()
            .find(|t| t.basic.id == trunk.basic.id && TrunkScope::of(t).as_ref() == Some(scope))
            .ok_or_else(|| AppError::TrunkNotFound(trunk.basic.id.clone()))?;
        *slot = trunk.clone();
        Ok(trunk.clone())
    }

    async fn set_status(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        id: &str,
        status: TrunkStatus,
    ) -> AppResult<SipTrunk> {
        authorize(session)?;
        let mut trunks = self.trunks.lock();
        let trunk = trunks
            .iter_mut()
            .find(|t| t.basic.id == id && TrunkScope::of(t).as_ref() == Some(scope))
            .ok_or_else(|| AppError::TrunkNotFound(id.to_string()))?;
        trunk.transition_to(status, "ops@ringer.tel")?;
        Ok(trunk.clone())
    }
}

fn state() -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(InMemoryTrunks::seeded()),
        MarginConfig::default(),
    ))
}

fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).unwrap()
}

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(
        App::new()
            .app_data(state())
            .app_data(web::Data::new(SessionStore::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_validate_reports_issues_as_data() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/validate")
        .set_json(json!({ "trunk": samples::acme_hq_customer() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["valid"], true);

    let mut vendor = samples::att_interstate_vendor();
    vendor.basic.ban = Some("BAN-12345678".to_string());
    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/validate")
        .set_json(json!({ "trunk": vendor }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["valid"], false);
    assert_eq!(body["data"]["overall"], "failed");
    let issues = body["data"]["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|i| i["field"] == "basic.ban" && i["severity"] == "error"));
}

#[actix_web::test]
async fn test_resolve_rate_with_billing() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/resolve-rate")
        .set_json(json!({
            "trunk": samples::acme_hq_customer(),
            "zone": "INTERSTATE",
            "called_number": "+12125551234",
            "as_of": "2024-06-01",
            "duration_secs": 61
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let data = &body["data"];
    assert_eq!(decimal(&data["rate"]), dec!(0.012));
    assert_eq!(data["source"]["kind"], "dynamic_override");
    assert_eq!(data["source"]["id"], "override-001");
    // 61s bills as 66s on 6/6 increments
    assert_eq!(decimal(&data["billable_cost"]), dec!(0.0132));
}

#[actix_web::test]
async fn test_resolve_rate_rejects_bad_input() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/resolve-rate")
        .set_json(json!({
            "trunk": samples::acme_hq_customer(),
            "zone": "INTERSTATE",
            "called_number": ""
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Zone the trunk does not rate and no override covers
    let mut trunk = samples::telnyx_international_vendor();
    trunk.overrides = Default::default();
    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/resolve-rate")
        .set_json(json!({
            "trunk": trunk,
            "zone": "LOCAL",
            "called_number": "+12125551234",
            "as_of": "2024-06-01"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_exclusion_check() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/exclusion-check")
        .set_json(json!({
            "trunk": samples::telnyx_international_vendor(),
            "called_number": "011 53 7234 5678"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["excluded"], true);
    assert_eq!(body["data"]["rule"]["rule"], "country");
    assert_eq!(body["data"]["rule"]["value"], "CU");

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/exclusion-check")
        .set_json(json!({
            "trunk": samples::telnyx_international_vendor(),
            "called_number": "+442071234567"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["excluded"], false);
    assert!(body["data"].get("reason").is_none());
}

#[actix_web::test]
async fn test_margin_endpoints() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/margin")
        .set_json(json!({ "vendor_cost": "0.0045", "customer_rate": "0.0095" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(decimal(&body["data"]["margin_per_minute"]), dec!(0.0050));

    let req = test::TestRequest::post()
        .uri("/api/v1/margin")
        .set_json(json!({ "vendor_cost": "-1", "customer_rate": "0.0095" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/margin-report")
        .set_json(json!({ "trunk": samples::acme_hq_customer() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["trunk_id"], "cust-trunk-001");
    assert_eq!(body["data"]["zones"].as_array().unwrap().len(), 4);

    // Vendor trunks carry no margin analysis
    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/margin-report")
        .set_json(json!({ "trunk": samples::att_interstate_vendor() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_templates() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/api/v1/templates").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/apply-template")
        .set_json(json!({
            "trunk": samples::acme_hq_customer(),
            "template_id": "no-such-template"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_export_formats() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/export")
        .set_json(json!({ "trunks": [samples::acme_hq_customer()] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/csv")
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.ends_with(".csv\""));
    let body = test::read_body(resp).await;
    let csv = std::str::from_utf8(&body).unwrap();
    assert!(csv.starts_with("Name,Type,Status"));

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/export")
        .set_json(json!({
            "trunks": [samples::acme_hq_customer()],
            "format": "json",
            "options": { "include_stats": false }
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["version"], "1.0");
    assert_eq!(
        body["trunks"][0]["authentication"]["credentials"]["password"],
        "[REDACTED]"
    );
    assert!(body["trunks"][0].get("stats").is_none());
    assert!(body["trunks"][0].get("rates").is_some());

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/export")
        .set_json(json!({ "trunks": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_import_validation_reports_rows() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/import/validate")
        .set_json(json!({ "data": "Name,Type\nAcme Backup,customer\nab,carrier\n" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["imported"], 1);
    assert_eq!(body["data"]["errors"][0]["row"], 3);
    assert_eq!(body["data"]["errors"][0]["field"], "Name");

    let document = json!({ "trunks": [samples::att_interstate_vendor()] }).to_string();
    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/import/validate")
        .set_json(json!({ "data": document }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["imported"], 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/trunks/import/validate")
        .set_json(json!({ "data": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_trunk_routes_require_token() {
    let app = test::init_service(
        App::new()
            .app_data(state())
            .app_data(web::Data::new(SessionStore::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/customers/BAN-12345678/trunks")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_list_and_get_trunks() {
    let app = test::init_service(
        App::new()
            .app_data(state())
            .app_data(web::Data::new(SessionStore::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/vendors/PROV-003/trunks?page=1&per_page=10&status=ACTIVE")
        .insert_header(("Authorization", "Bearer token-a"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["basic"]["id"], "vendor-trunk-004");
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/customers/BAN-12345678/trunks/cust-trunk-001")
        .insert_header(("Authorization", "Bearer token-a"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["basic"]["name"], "Acme HQ - Main Office");

    let req = test::TestRequest::get()
        .uri("/api/v1/customers/BAN-12345678/trunks/missing")
        .insert_header(("Authorization", "Bearer token-a"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri("/api/v1/partners/P-1/trunks")
        .insert_header(("Authorization", "Bearer token-a"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri("/api/v1/customers/BAN-12345678/trunks?status=deleted")
        .insert_header(("Authorization", "Bearer token-a"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_create_and_change_status() {
    let app = test::init_service(
        App::new()
            .app_data(state())
            .app_data(web::Data::new(SessionStore::default()))
            .configure(configure),
    )
    .await;

    let mut trunk = SipTrunk::new_customer(
        "cust-trunk-009",
        "Acme Branch Office",
        "BAN-12345678",
        "machine-02",
        "ops@ringer.tel",
    );
    trunk.basic.description = Some("Branch office overflow trunk".to_string());

    let req = test::TestRequest::post()
        .uri("/api/v1/customers/BAN-12345678/trunks")
        .insert_header(("Authorization", "Bearer token-a"))
        .set_json(&trunk)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::put()
        .uri("/api/v1/customers/BAN-12345678/trunks/cust-trunk-009/status")
        .insert_header(("Authorization", "Bearer token-a"))
        .set_json(json!({ "status": "active" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["basic"]["status"], "active");

    // Already active
    let req = test::TestRequest::put()
        .uri("/api/v1/customers/BAN-12345678/trunks/cust-trunk-009/status")
        .insert_header(("Authorization", "Bearer token-a"))
        .set_json(json!({ "status": "ACTIVE" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    // Body id must match the path
    let req = test::TestRequest::put()
        .uri("/api/v1/customers/BAN-12345678/trunks/cust-trunk-001")
        .insert_header(("Authorization", "Bearer token-a"))
        .set_json(&trunk)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_ended_session_is_discarded() {
    let store = web::Data::new(SessionStore::default());
    let app = test::init_service(
        App::new()
            .app_data(state())
            .app_data(store.clone())
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/customers/BAN-12345678/trunks")
        .insert_header(("Authorization", format!("Bearer {}", REVOKED)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "session_expired");
    assert!(store.is_empty());
}
