//! Trunk repository against a mock platform
//!
//! Covers envelope decoding, the session cache, token refresh and the local
//! checks that run before a mutation is sent.

use ringer_auth::Session;
use ringer_client::wire::WireTrunk;
use ringer_client::{ApiClient, TrunkApi};
use ringer_core::config::{AuthConfig, PlatformApiConfig};
use ringer_core::models::{SipTrunk, TrunkStatus, TrunkType};
use ringer_core::samples;
use ringer_core::traits::{TrunkListQuery, TrunkRepository, TrunkScope};
use ringer_core::AppError;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRUNK_PATH: &str = "/v1/admin/customers/BAN-12345678/trunks/cust-trunk-001";
const LIST_PATH: &str = "/v1/admin/customers/BAN-12345678/trunks";

fn repository(server: &MockServer) -> TrunkApi {
    let api = PlatformApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        read_retries: 1,
    };
    TrunkApi::new(ApiClient::new(&api, &AuthConfig::default()).unwrap())
}

fn session() -> Session {
    Session::new("access-1", Some("refresh-1".to_string()))
}

fn acme_scope() -> TrunkScope {
    TrunkScope::Customer("BAN-12345678".to_string())
}

fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

fn wire(trunk: &SipTrunk) -> Value {
    serde_json::to_value(WireTrunk::from(trunk)).unwrap()
}

#[tokio::test]
async fn test_get_decodes_platform_record() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&trunk))))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();

    let fetched = repo.get(&mut session, &acme_scope(), "cust-trunk-001").await.unwrap();
    assert_eq!(fetched, trunk);

    // Second read is served from the session cache
    let again = repo.get(&mut session, &acme_scope(), "cust-trunk-001").await.unwrap();
    assert_eq!(again, trunk);
}

#[tokio::test]
async fn test_list_sends_filters_and_caches_pages() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "20"))
        .and(query_param("status", "ACTIVE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "items": [wire(&trunk)],
            // Zero-valued fields are omitted by the platform
            "pagination": { "total": 1, "page": 1, "per_page": 20 }
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();
    let mut query = TrunkListQuery::new(1, 20);
    query.status = Some(TrunkStatus::Active);

    let page = repo.list(&mut session, &acme_scope(), &query).await.unwrap();
    assert_eq!(page.items, vec![trunk]);
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.pagination.total_pages, 1);

    let cached = repo.list(&mut session, &acme_scope(), &query).await.unwrap();
    assert_eq!(cached, page);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        }))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&trunk))))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();

    let fetched = repo.get(&mut session, &acme_scope(), "cust-trunk-001").await.unwrap();
    assert_eq!(fetched.basic.id, "cust-trunk-001");
    assert_eq!(session.access_token().unwrap(), "access-2");
    assert_eq!(session.refresh_token(), Some("refresh-2"));
}

#[tokio::test]
async fn test_failed_refresh_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": { "code": "INVALID_REFRESH_TOKEN", "message": "Refresh token revoked" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();

    let err = repo
        .get(&mut session, &acme_scope(), "cust-trunk-001")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SessionExpired));
    assert!(!session.is_active());
    assert!(session.cache().is_empty());
}

#[tokio::test]
async fn test_unavailable_platform_read_is_retried() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&trunk))))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let fetched = repo
        .get(&mut session(), &acme_scope(), "cust-trunk-001")
        .await
        .unwrap();
    assert_eq!(fetched, trunk);
}

#[tokio::test]
async fn test_missing_trunk_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/admin/customers/BAN-12345678/trunks/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": { "code": "NOT_FOUND", "message": "trunk not found" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let err = repo
        .get(&mut session(), &acme_scope(), "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TrunkNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_invalid_trunk_is_not_sent() {
    let server = MockServer::start().await;
    let repo = repository(&server);

    let mut trunk = samples::acme_hq_customer();
    trunk.basic.name = "  ".to_string();

    let err = repo
        .create(&mut session(), &acme_scope(), &trunk)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::Validation(summary) if summary.contains("basic.name")));

    // Wrong owner scope
    let trunk = samples::acme_hq_customer();
    let other = TrunkScope::Customer("BAN-99999999".to_string());
    let err = repo.create(&mut session(), &other, &trunk).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    // Customer trunk resubmitted as a vendor trunk
    let mut retyped = samples::acme_hq_customer();
    retyped.basic.trunk_type = TrunkType::Vendor;
    let err = repo
        .update(&mut session(), &acme_scope(), &retyped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImmutableTrunkType(_)));

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_refusal_inside_ok_response_is_not_a_success() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": { "code": "TRUNK_LIMIT_REACHED", "message": "BAN has too many trunks" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let repo = repository(&server);

    let err = repo
        .create(&mut session(), &acme_scope(), &trunk)
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        AppError::Api { status: 422, code, message }
            if code == "TRUNK_LIMIT_REACHED" && message == "BAN has too many trunks"
    ));
    assert_eq!(err.status_code().as_u16(), 422);

    let err = repo
        .get(&mut session(), &acme_scope(), "cust-trunk-001")
        .await
        .unwrap_err();
    assert_eq!(err.status_code().as_u16(), 502);
}

#[tokio::test]
async fn test_create_invalidates_owner_queries() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "items": [],
            "pagination": { "page": 1, "per_page": 20 }
        }))))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(body_json(wire(&trunk)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(json!({ "id": "cust-trunk-001" }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&trunk))))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();
    let query = TrunkListQuery::new(1, 20);

    let empty = repo.list(&mut session, &acme_scope(), &query).await.unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.pagination.total, 0);

    let created = repo.create(&mut session, &acme_scope(), &trunk).await.unwrap();
    assert_eq!(created, trunk);

    // The cached page was dropped, so this goes back to the platform
    repo.list(&mut session, &acme_scope(), &query).await.unwrap();
}

#[tokio::test]
async fn test_status_change() {
    let server = MockServer::start().await;
    let trunk = samples::acme_hq_customer();
    let mut suspended = trunk.clone();
    suspended.basic.status = TrunkStatus::Suspended;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&trunk))))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/status", TRUNK_PATH)))
        .and(body_json(json!({ "status": "SUSPENDED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TRUNK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(wire(&suspended))))
        .mount(&server)
        .await;

    let repo = repository(&server);
    let mut session = session();

    let updated = repo
        .set_status(&mut session, &acme_scope(), "cust-trunk-001", TrunkStatus::Suspended)
        .await
        .unwrap();
    assert_eq!(updated.basic.status, TrunkStatus::Suspended);

    // Staying put is not a transition and is refused before any write
    let err = repo
        .set_status(&mut session, &acme_scope(), "cust-trunk-001", TrunkStatus::Suspended)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}
