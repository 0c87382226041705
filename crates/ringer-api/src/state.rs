//! Shared application state

use ringer_auth::Session;
use ringer_core::config::MarginConfig;
use ringer_core::traits::TrunkRepository;
use std::sync::Arc;

/// Repository for the proxied trunk endpoints
pub type SharedTrunkRepository = Arc<dyn TrunkRepository<Session = Session>>;

/// State shared by every handler
///
/// Registered as `web::Data<AppState>`; the `SessionStore` is registered
/// alongside it.
#[derive(Clone)]
pub struct AppState {
    pub trunks: SharedTrunkRepository,
    pub margin: MarginConfig,
}

impl AppState {
    pub fn new(trunks: SharedTrunkRepository, margin: MarginConfig) -> Self {
        Self { trunks, margin }
    }
}
