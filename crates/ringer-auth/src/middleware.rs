//! Actix-web request extractors for platform credentials
//!
//! Callers authenticate with their platform access token. The token is not
//! verified here; it is forwarded to the platform, which accepts or rejects
//! it.

use crate::session::{SessionHandle, SessionStore};
use actix_web::{dev::Payload, error::ErrorUnauthorized, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use ringer_core::error::AppError;
use tracing::{debug, warn};

/// Header carrying the refresh token alongside the bearer token
pub const REFRESH_TOKEN_HEADER: &str = "X-Refresh-Token";

/// Extract the access token from a request
///
/// Checks for token in the following order:
/// 1. Authorization header (Bearer token)
/// 2. Cookie named "token"
fn extract_token_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(auth_header) = req.headers().get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    req.cookie("token").map(|cookie| cookie.value().to_string())
}

fn extract_refresh_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Platform credentials presented with a request
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use ringer_auth::middleware::BearerToken;
///
/// async fn handler(token: BearerToken) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({
///         "has_refresh": token.refresh_token.is_some()
///     }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl FromRequest for BearerToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match extract_token_from_request(req) {
            Some(access_token) => ready(Ok(BearerToken {
                access_token,
                refresh_token: extract_refresh_token(req),
            })),
            None => {
                debug!("No authentication token found in request");
                ready(Err(ErrorUnauthorized(AppError::Unauthorized(
                    "No authentication token provided".to_string(),
                ))))
            }
        }
    }
}

/// Session bound to the presented token
///
/// Requires a `web::Data<SessionStore>` in app data.
#[derive(Clone)]
pub struct PlatformSession {
    /// Token the caller presented, the key of the session in the store
    pub token: String,
    pub handle: SessionHandle,
}

impl PlatformSession {
    /// Forget the session after it ended
    pub fn discard(&self, store: &SessionStore) {
        store.remove(&self.token);
    }
}

impl FromRequest for PlatformSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let store = match req.app_data::<web::Data<SessionStore>>() {
            Some(store) => store.clone(),
            None => {
                warn!("SessionStore not found in app data");
                return ready(Err(ErrorUnauthorized(AppError::Unauthorized(
                    "Session handling not configured".to_string(),
                ))));
            }
        };

        let bearer = match BearerToken::from_request(req, payload).into_inner() {
            Ok(bearer) => bearer,
            Err(e) => return ready(Err(e)),
        };

        let handle = store.get_or_create(&bearer.access_token, bearer.refresh_token);
        ready(Ok(PlatformSession {
            token: bearer.access_token,
            handle,
        }))
    }
}
