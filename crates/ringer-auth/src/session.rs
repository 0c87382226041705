//! Platform sessions
//!
//! A session holds the caller's platform tokens and its query cache. It is
//! created when a caller first presents a token, rotated in place when the
//! access token is refreshed, and ended on logout or when refresh fails.
//! Ending a session drops its tokens and everything it cached. The store
//! forgets sessions left idle past `auth.session_idle_secs` and holds at most
//! `auth.max_sessions`.

use crate::claims::Claims;
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use ringer_cache::QueryCache;
use ringer_core::config::{AuthConfig, CacheConfig};
use ringer_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Claims of the current access token, when it is a readable JWT
    claims: Option<Claims>,
    cache: QueryCache,
    expiry_skew_secs: i64,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self::with_cache(access_token, refresh_token, QueryCache::default())
    }

    pub fn with_cache(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        cache: QueryCache,
    ) -> Self {
        let access_token = access_token.into();
        let claims = Claims::inspect(&access_token).ok();
        Self {
            access_token: Some(access_token),
            refresh_token,
            claims,
            cache,
            expiry_skew_secs: AuthConfig::default().expiry_skew_secs,
        }
    }

    pub fn with_expiry_skew(mut self, skew_secs: i64) -> Self {
        self.expiry_skew_secs = skew_secs;
        self
    }

    /// Access token for the `Authorization` header
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionExpired` once the session has ended
    pub fn access_token(&self) -> Result<&str, AppError> {
        self.access_token
            .as_deref()
            .ok_or(AppError::SessionExpired)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.as_ref().and_then(Claims::expires_at)
    }

    pub fn is_active(&self) -> bool {
        self.access_token.is_some()
    }

    /// Whether the access token is known to be at or near expiry
    ///
    /// Opaque tokens carry no expiry and never need a proactive refresh.
    pub fn needs_refresh(&self) -> bool {
        self.is_active()
            && self.refresh_token.is_some()
            && self
                .claims
                .as_ref()
                .is_some_and(|c| c.is_expired(self.expiry_skew_secs))
    }

    /// Install tokens returned by a refresh
    ///
    /// The platform may omit the refresh token, in which case the current one
    /// is kept.
    pub fn rotate(&mut self, access_token: String, refresh_token: Option<String>) {
        self.claims = Claims::inspect(&access_token).ok();
        self.access_token = Some(access_token);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        debug!(user = ?self.user_id(), "Session tokens rotated");
    }

    /// End the session and drop its cache
    pub fn end(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.claims = None;
        self.cache.clear();
        info!("Session ended");
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

/// Shared handle to a session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by the token the caller presented
///
/// A caller keeps presenting its original token after a refresh; the store
/// still resolves it to the rotated session.
pub struct SessionStore {
    sessions: Cache<String, SessionHandle>,
    cache: CacheConfig,
    auth: AuthConfig,
}

impl SessionStore {
    pub fn new(cache: CacheConfig, auth: AuthConfig) -> Self {
        let idle = Duration::from_secs(auth.session_idle_secs);
        let capacity = auth.max_sessions;
        Self::with_limits(cache, auth, idle, capacity)
    }

    fn with_limits(cache: CacheConfig, auth: AuthConfig, idle: Duration, capacity: u64) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity.max(1))
            .time_to_idle(idle)
            .build();

        Self {
            sessions,
            cache,
            auth,
        }
    }

    /// Session for a presented token, created on first sight
    pub fn get_or_create(&self, token: &str, refresh_token: Option<String>) -> SessionHandle {
        self.sessions.get_with(token.to_string(), || {
            debug!("Creating session");
            let session = Session::with_cache(
                token,
                refresh_token,
                QueryCache::from_config(&self.cache),
            )
            .with_expiry_skew(self.auth.expiry_skew_secs);
            Arc::new(Mutex::new(session))
        })
    }

    /// Forget a session, e.g. on logout or after it expired
    pub fn remove(&self, token: &str) -> Option<SessionHandle> {
        self.sessions.remove(token)
    }

    /// Live sessions, after pending evictions have run
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.iter().next().is_none()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(CacheConfig::default(), AuthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::tests::platform_token;
    use chrono::Duration;

    #[test]
    fn test_new_session_reads_expiry() {
        let token = platform_token("user-42", Duration::hours(1));
        let session = Session::new(token.clone(), Some("refresh-1".to_string()));

        assert!(session.is_active());
        assert_eq!(session.access_token().unwrap(), token);
        assert_eq!(session.user_id(), Some("user-42"));
        assert!(session.expires_at().is_some());
        assert!(!session.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let token = platform_token("user-42", Duration::seconds(5));
        let session = Session::new(token.clone(), Some("refresh-1".to_string()));
        assert!(session.needs_refresh());

        // Nothing to refresh with
        let session = Session::new(token, None);
        assert!(!session.needs_refresh());
    }

    #[test]
    fn test_opaque_token_session() {
        let session = Session::new("opaque-token", Some("refresh-1".to_string()));
        assert!(session.is_active());
        assert!(session.claims().is_none());
        assert!(!session.needs_refresh());
    }

    #[test]
    fn test_rotate_keeps_refresh_token_when_omitted() {
        let mut session = Session::new("old-access", Some("refresh-1".to_string()));
        session.rotate("new-access".to_string(), None);
        assert_eq!(session.access_token().unwrap(), "new-access");
        assert_eq!(session.refresh_token(), Some("refresh-1"));

        session.rotate("newer-access".to_string(), Some("refresh-2".to_string()));
        assert_eq!(session.refresh_token(), Some("refresh-2"));
    }

    #[test]
    fn test_end_clears_tokens_and_cache() {
        let mut session = Session::new("access", Some("refresh".to_string()));
        session.cache().set("trunks:vendors/PROV-001:list?page=1", &1).unwrap();

        session.end();
        assert!(!session.is_active());
        assert!(matches!(session.access_token(), Err(AppError::SessionExpired)));
        assert!(session.refresh_token().is_none());
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn test_store_reuses_sessions() {
        let store = SessionStore::default();
        let first = store.get_or_create("token-a", None);
        let again = store.get_or_create("token-a", Some("ignored".to_string()));
        assert!(Arc::ptr_eq(&first, &again));
        assert!(again.lock().await.refresh_token().is_none());

        store.get_or_create("token-b", None);
        assert_eq!(store.len(), 2);

        assert!(store.remove("token-a").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_drops_idle_sessions() {
        let store = SessionStore::with_limits(
            CacheConfig::default(),
            AuthConfig::default(),
            std::time::Duration::from_millis(30),
            16,
        );
        let first = store.get_or_create("token-a", None);
        std::thread::sleep(std::time::Duration::from_millis(80));

        assert!(store.is_empty());
        let second = store.get_or_create("token-a", None);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_store_is_bounded() {
        let store = SessionStore::with_limits(
            CacheConfig::default(),
            AuthConfig::default(),
            std::time::Duration::from_secs(60),
            4,
        );
        for i in 0..32 {
            store.get_or_create(&format!("token-{}", i), None);
        }
        assert!(store.len() <= 4);
    }
}
