//! HTTP client for the platform REST API
//!
//! Every request carries the session's bearer token. A 401 triggers one
//! refresh and one retry of the request; if the refresh fails, the session
//! ends. Reads are retried on transport failures and 5xx responses, writes
//! are sent once.

use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use ringer_auth::Session;
use ringer_core::config::{AuthConfig, PlatformApiConfig};
use ringer_core::{AppError, AppResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// First retry waits this long; later retries double it
const RETRY_BASE_DELAY_MS: u64 = 200;

/// Ceiling on a single retry delay
const RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Backoff before retry number `attempt` (zero-based)
fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(factor).min(RETRY_MAX_DELAY_MS))
}

/// Response envelope: `{success, data}` or `{success: false, error}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

/// Error body, structured or a bare message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
    Plain(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access_token: String,
    refresh_token: Option<String>,
}

fn api_error(status: StatusCode, code: String, message: String) -> AppError {
    let code = if code.is_empty() {
        status
            .canonical_reason()
            .map(|r| r.to_lowercase().replace(' ', "_"))
            .unwrap_or_else(|| format!("http_{}", status.as_u16()))
    } else {
        code
    };
    AppError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Map a non-2xx response body to `AppError::Api`
fn error_from_body(status: StatusCode, body: &str) -> AppError {
    let parsed: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let (code, message) = match parsed.error {
        Some(ErrorBody::Detailed { code, message }) => (code, message),
        Some(ErrorBody::Plain(message)) => (String::new(), message),
        None => (String::new(), parsed.message.unwrap_or_default()),
    };
    api_error(status, code, message)
}

/// Failure reported inside a 2xx envelope
///
/// A coded refusal is the platform rejecting the request (422); anything else
/// is a malformed upstream answer (502).
fn refused(error: Option<ErrorBody>) -> AppError {
    match error {
        Some(ErrorBody::Detailed { code, message }) if !code.is_empty() => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, code, message)
        }
        Some(ErrorBody::Detailed { message, .. }) | Some(ErrorBody::Plain(message)) => {
            api_error(StatusCode::BAD_GATEWAY, "request_failed".to_string(), message)
        }
        None => api_error(StatusCode::BAD_GATEWAY, "request_failed".to_string(), String::new()),
    }
}

/// Decode an envelope, returning its data when present
async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<Option<T>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }
    if body.trim().is_empty() {
        return Ok(None);
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)?;
    if !envelope.success {
        return Err(refused(envelope.error));
    }
    Ok(envelope.data)
}

/// Platform API client
///
/// Stateless apart from the connection pool; the session passed to each call
/// carries credentials and cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    timeout_secs: u64,
    read_retries: u32,
    refresh_path: Vec<String>,
}

impl ApiClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the base URL is invalid or the HTTP
    /// client cannot be built
    pub fn new(api: &PlatformApiConfig, auth: &AuthConfig) -> AppResult<Self> {
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| AppError::Config(format!("Invalid api.base_url '{}': {}", api.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "api.base_url '{}' cannot carry a path",
                api.base_url
            )));
        }

        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90));
        if api.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(api.timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeout_secs: api.timeout_secs,
            read_retries: api.read_retries,
            refresh_path: auth
                .refresh_path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for path segments, each percent-encoded
    pub fn url<S: AsRef<str>>(&self, segments: &[S]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config("api.base_url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments.iter().map(AsRef::as_ref));
        Ok(url)
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else {
            AppError::from(err)
        }
    }

    async fn dispatch(
        &self,
        session: &Session,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
    ) -> AppResult<Response> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(session.access_token()?);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|e| self.transport_error(e))
    }

    /// Send with the session's token, refreshing once on 401
    async fn send(
        &self,
        session: &mut Session,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> AppResult<Response> {
        if session.needs_refresh() {
            debug!("Access token near expiry, refreshing first");
            self.refresh(session).await?;
        }

        let response = self.dispatch(session, &method, &url, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(%method, path = url.path(), "Access token rejected, refreshing");
        self.refresh(session).await?;

        let response = self.dispatch(session, &method, &url, body).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, path = url.path(), "Access token rejected after refresh");
            session.end();
            return Err(AppError::SessionExpired);
        }
        Ok(response)
    }

    /// Exchange the refresh token for new tokens
    ///
    /// Any failure ends the session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionExpired` when there is no refresh token or
    /// the platform refuses it
    #[instrument(skip(self, session))]
    pub async fn refresh(&self, session: &mut Session) -> AppResult<()> {
        let Some(refresh_token) = session.refresh_token().map(str::to_string) else {
            session.end();
            return Err(AppError::SessionExpired);
        };

        let url = self.url(&self.refresh_path)?;
        let result = match self
            .http
            .post(url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
        {
            Ok(response) => decode::<TokenPair>(response).await,
            Err(e) => Err(self.transport_error(e)),
        };

        match result {
            Ok(Some(tokens)) => {
                session.rotate(tokens.access_token, tokens.refresh_token);
                info!(user = ?session.user_id(), "Access token refreshed");
                Ok(())
            }
            Ok(None) => {
                warn!("Refresh response carried no tokens");
                session.end();
                Err(AppError::SessionExpired)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                session.end();
                Err(AppError::SessionExpired)
            }
        }
    }

    /// GET and decode the envelope's data
    ///
    /// Retried up to the configured count on transport errors and 5xx.
    #[instrument(skip(self, session, query), fields(path = %url.path()))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        session: &mut Session,
        url: Url,
        query: &[(&'static str, String)],
    ) -> AppResult<T> {
        let mut url = url;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut attempt = 0;
        loop {
            let result = match self.send(session, Method::GET, url.clone(), None).await {
                Ok(response) => decode::<T>(response).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(Some(data)) => return Ok(data),
                Ok(None) => {
                    return Err(AppError::Serialization(
                        "response carried no data".to_string(),
                    ))
                }
                Err(e) if e.is_retryable() && attempt < self.read_retries => {
                    let delay = retry_delay(attempt);
                    warn!(error = %e, attempt = attempt + 1, ?delay, "Retrying read");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// POST a JSON body once
    #[instrument(skip(self, session, body), fields(path = %url.path()))]
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &mut Session,
        url: Url,
        body: &B,
    ) -> AppResult<Option<T>> {
        let body = serde_json::to_value(body)?;
        let response = self.send(session, Method::POST, url, Some(&body)).await?;
        decode(response).await
    }

    /// PUT a JSON body once
    #[instrument(skip(self, session, body), fields(path = %url.path()))]
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &mut Session,
        url: Url,
        body: &B,
    ) -> AppResult<Option<T>> {
        let body = serde_json::to_value(body)?;
        let response = self.send(session, Method::PUT, url, Some(&body)).await?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> AppResult<ApiClient> {
        let api = PlatformApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        ApiClient::new(&api, &AuthConfig::default())
    }

    #[test]
    fn test_url_building() {
        let api_client = client("https://api.ringer.tel/").unwrap();
        let url = api_client
            .url(&["v1", "admin", "customers", "BAN 1/2", "trunks"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.ringer.tel/v1/admin/customers/BAN%201%2F2/trunks"
        );

        let prefixed = client("https://gateway.ringer.tel/api").unwrap();
        assert_eq!(
            prefixed.url(&["v1", "auth", "refresh"]).unwrap().as_str(),
            "https://gateway.ringer.tel/api/v1/auth/refresh"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(client("not a url"), Err(AppError::Config(_))));
        assert!(matches!(client("mailto:ops@ringer.tel"), Err(AppError::Config(_))));
    }

    #[test]
    fn test_error_from_body() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"error":{"code":"INVALID_BAN","message":"BAN is not active"}}"#,
        );
        assert!(matches!(
            &err,
            AppError::Api { status: 400, code, message } if code == "INVALID_BAN" && message == "BAN is not active"
        ));

        let err = error_from_body(StatusCode::NOT_FOUND, r#"{"error":"trunk not found"}"#);
        assert!(matches!(
            &err,
            AppError::Api { status: 404, code, message } if code == "not_found" && message == "trunk not found"
        ));
        assert!(err.is_not_found());

        let err = error_from_body(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), ringer_core::error::GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_refusal_in_success_response() {
        let err = refused(Some(ErrorBody::Detailed {
            code: "TRUNK_LOCKED".to_string(),
            message: "Trunk is locked".to_string(),
        }));
        assert!(matches!(&err, AppError::Api { status: 422, code, .. } if code == "TRUNK_LOCKED"));
        assert_eq!(err.status_code().as_u16(), 422);

        let err = refused(Some(ErrorBody::Plain("nope".to_string())));
        assert_eq!(err.status_code().as_u16(), 502);
        assert_eq!(err.user_message(), "nope");

        let err = refused(None);
        assert!(matches!(&err, AppError::Api { status: 502, code, .. } if code == "request_failed"));
    }

    #[test]
    fn test_retry_delay_is_bounded() {
        assert_eq!(retry_delay(0), Duration::from_millis(200));
        assert_eq!(retry_delay(1), Duration::from_millis(400));
        assert_eq!(retry_delay(4), Duration::from_millis(3_200));
        assert_eq!(retry_delay(5), Duration::from_millis(RETRY_MAX_DELAY_MS));
        assert_eq!(retry_delay(64), Duration::from_millis(RETRY_MAX_DELAY_MS));
        assert_eq!(retry_delay(u32::MAX), Duration::from_millis(RETRY_MAX_DELAY_MS));
    }
}
