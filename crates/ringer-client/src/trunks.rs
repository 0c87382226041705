//! Trunk repository over the platform admin API
//!
//! Paths:
//! - `GET  /v1/admin/{customers|vendors}/{owner}/trunks` - list
//! - `GET  /v1/admin/{customers|vendors}/{owner}/trunks/{id}` - fetch
//! - `POST /v1/admin/{customers|vendors}/{owner}/trunks` - create
//! - `PUT  /v1/admin/{customers|vendors}/{owner}/trunks/{id}` - update
//! - `PUT  /v1/admin/{customers|vendors}/{owner}/trunks/{id}/status` - status
//!
//! Reads go through the session's query cache. Mutations are validated
//! locally before they are sent, drop everything cached for the owner, and
//! return the trunk as stored by the platform.

use crate::client::ApiClient;
use crate::wire::{WirePage, WireStatusChange, WireTrunk};
use async_trait::async_trait;
use ringer_auth::Session;
use ringer_cache::keys;
use ringer_core::models::{SipTrunk, TrunkStatus, TrunkType};
use ringer_core::traits::{Page, PaginationMeta, TrunkListQuery, TrunkRepository, TrunkScope};
use ringer_core::{AppError, AppResult};
use ringer_services::validation::{validate_trunk, validate_trunk_update};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Read from the session cache; unreadable entries count as a miss
fn cached<T: DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    match session.cache().get(key) {
        Ok(hit) => hit,
        Err(e) => {
            warn!(key = %key, error = %e, "Dropping unreadable cache entry");
            session.cache().delete(key);
            None
        }
    }
}

fn remember<T: Serialize>(session: &Session, key: &str, value: &T) {
    if let Err(e) = session.cache().set(key, value) {
        warn!(key = %key, error = %e, "Failed to cache response");
    }
}

/// Identity echoed back by a create
#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    id: String,
}

/// Map a platform 404 on a single trunk to `TrunkNotFound`
fn not_found_as_trunk(id: &str) -> impl FnOnce(AppError) -> AppError + '_ {
    move |err| {
        if err.is_not_found() {
            AppError::TrunkNotFound(id.to_string())
        } else {
            err
        }
    }
}

/// Trunks under a scope all carry the scope's type, so a body of the other
/// type is an attempt to change it
fn ensure_type_kept(scope: &TrunkScope, existing: TrunkType, trunk: &SipTrunk) -> AppResult<()> {
    if trunk.basic.trunk_type != existing || existing != scope.trunk_type() {
        return Err(AppError::ImmutableTrunkType(format!(
            "{} is a {} trunk",
            trunk.basic.id, existing
        )));
    }
    Ok(())
}

/// The trunk must belong to the scope it is written under
fn ensure_scope(scope: &TrunkScope, trunk: &SipTrunk) -> AppResult<()> {
    match TrunkScope::of(trunk) {
        Some(owner) if &owner == scope => Ok(()),
        Some(owner) => Err(AppError::InvalidInput(format!(
            "Trunk {} belongs to {}, not {}",
            trunk.basic.id, owner, scope
        ))),
        None => Err(AppError::InvalidInput(format!(
            "Trunk {} has no {} owner",
            trunk.basic.id,
            scope.trunk_type()
        ))),
    }
}

/// Trunk repository backed by the platform REST API
#[derive(Debug, Clone)]
pub struct TrunkApi {
    client: ApiClient,
}

impl TrunkApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn collection_url(&self, scope: &TrunkScope) -> AppResult<Url> {
        self.client
            .url(&["v1", "admin", scope.segment(), scope.owner(), "trunks"])
    }

    fn trunk_url(&self, scope: &TrunkScope, id: &str) -> AppResult<Url> {
        self.client
            .url(&["v1", "admin", scope.segment(), scope.owner(), "trunks", id])
    }

    fn status_url(&self, scope: &TrunkScope, id: &str) -> AppResult<Url> {
        self.client.url(&[
            "v1",
            "admin",
            scope.segment(),
            scope.owner(),
            "trunks",
            id,
            "status",
        ])
    }

    /// Fetch a trunk from the platform, bypassing and then refilling the cache
    async fn fetch(&self, session: &mut Session, scope: &TrunkScope, id: &str) -> AppResult<SipTrunk> {
        let wire: WireTrunk = self
            .client
            .get(session, self.trunk_url(scope, id)?, &[])
            .await
            .map_err(not_found_as_trunk(id))?;
        let trunk = SipTrunk::try_from(wire)?;

        remember(session, &keys::trunk_key(scope, id), &trunk);
        Ok(trunk)
    }

    /// Drop the owner's cached reads and load the stored document
    async fn reload(&self, session: &mut Session, scope: &TrunkScope, id: &str) -> AppResult<SipTrunk> {
        let dropped = session.cache().invalidate_prefix(&keys::scope_prefix(scope));
        debug!(%scope, dropped, "Invalidated cached trunk queries");
        self.fetch(session, scope, id).await
    }
}

#[async_trait]
impl TrunkRepository for TrunkApi {
    type Session = Session;

    #[instrument(skip(self, session), fields(scope = %scope))]
    async fn list(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        query: &TrunkListQuery,
    ) -> AppResult<Page<SipTrunk>> {
        let key = keys::trunk_list_key(scope, query);
        if let Some(page) = cached::<Page<SipTrunk>>(session, &key) {
            debug!(key = %key, "Trunk list served from cache");
            return Ok(page);
        }

        let wire: WirePage = self
            .client
            .get(session, self.collection_url(scope)?, &query.to_pairs())
            .await?;

        let items = wire
            .items
            .into_iter()
            .map(SipTrunk::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let meta = wire.pagination.unwrap_or_else(|| PaginationMeta {
            total: items.len() as i64,
            ..Default::default()
        });
        let page = Page {
            pagination: PaginationMeta::new(
                meta.total,
                if meta.page > 0 { meta.page } else { query.page },
                if meta.per_page > 0 {
                    meta.per_page
                } else {
                    query.per_page
                },
            ),
            items,
        };

        remember(session, &key, &page);
        Ok(page)
    }

    #[instrument(skip(self, session), fields(scope = %scope))]
    async fn get(&self, session: &mut Session, scope: &TrunkScope, id: &str) -> AppResult<SipTrunk> {
        if let Some(trunk) = cached::<SipTrunk>(session, &keys::trunk_key(scope, id)) {
            debug!(trunk_id = id, "Trunk served from cache");
            return Ok(trunk);
        }
        self.fetch(session, scope, id).await
    }

    #[instrument(skip(self, session, trunk), fields(scope = %scope, trunk_id = %trunk.basic.id))]
    async fn create(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> AppResult<SipTrunk> {
        ensure_scope(scope, trunk)?;

        let result = validate_trunk(trunk);
        if !result.is_valid() {
            warn!(errors = result.errors().count(), "Refusing to create invalid trunk");
            return Err(AppError::Validation(result.error_summary()));
        }

        let created: Option<Created> = self
            .client
            .post(session, self.collection_url(scope)?, &WireTrunk::from(trunk))
            .await?;

        // The platform may assign its own id
        let id = created
            .map(|wire| wire.id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| trunk.basic.id.clone());

        info!(trunk_id = %id, "Trunk created");
        self.reload(session, scope, &id).await
    }

    #[instrument(skip(self, session, trunk), fields(scope = %scope, trunk_id = %trunk.basic.id))]
    async fn update(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> AppResult<SipTrunk> {
        ensure_type_kept(scope, scope.trunk_type(), trunk)?;
        ensure_scope(scope, trunk)?;

        let existing = self.fetch(session, scope, &trunk.basic.id).await?;
        ensure_type_kept(scope, existing.basic.trunk_type, trunk)?;
        let result = validate_trunk_update(&existing, trunk);
        if !result.is_valid() {
            warn!(errors = result.errors().count(), "Refusing invalid trunk update");
            return Err(AppError::Validation(result.error_summary()));
        }

        let _: Option<Value> = self
            .client
            .put(
                session,
                self.trunk_url(scope, &trunk.basic.id)?,
                &WireTrunk::from(trunk),
            )
            .await
            .map_err(not_found_as_trunk(&trunk.basic.id))?;

        info!("Trunk updated");
        self.reload(session, scope, &trunk.basic.id).await
    }

    #[instrument(skip(self, session), fields(scope = %scope))]
    async fn set_status(
        &self,
        session: &mut Session,
        scope: &TrunkScope,
        id: &str,
        status: TrunkStatus,
    ) -> AppResult<SipTrunk> {
        let existing = self.fetch(session, scope, id).await?;
        let current = existing.basic.status;
        if !current.can_transition_to(status) {
            return Err(AppError::InvalidTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let _: Option<Value> = self
            .client
            .put(
                session,
                self.status_url(scope, id)?,
                &WireStatusChange::from(status),
            )
            .await
            .map_err(not_found_as_trunk(id))?;

        info!(from = %current, to = %status, "Trunk status changed");
        self.reload(session, scope, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringer_core::samples;

    #[test]
    fn test_ensure_scope() {
        let trunk = samples::acme_hq_customer();
        let ban = trunk.basic.ban.clone().unwrap();

        assert!(ensure_scope(&TrunkScope::Customer(ban.clone()), &trunk).is_ok());
        assert!(matches!(
            ensure_scope(&TrunkScope::Customer("BAN-OTHER".to_string()), &trunk),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            ensure_scope(&TrunkScope::Vendor(ban), &trunk),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_type_is_kept() {
        let trunk = samples::acme_hq_customer();
        let scope = TrunkScope::Customer("BAN-12345678".to_string());
        assert!(ensure_type_kept(&scope, TrunkType::Customer, &trunk).is_ok());

        let mut vendor_body = trunk.clone();
        vendor_body.basic.trunk_type = TrunkType::Vendor;
        assert!(matches!(
            ensure_type_kept(&scope, TrunkType::Customer, &vendor_body),
            Err(AppError::ImmutableTrunkType(_))
        ));

        // Platform record of the other type under this scope
        assert!(matches!(
            ensure_type_kept(&scope, TrunkType::Vendor, &trunk),
            Err(AppError::ImmutableTrunkType(_))
        ));
    }

    #[test]
    fn test_not_found_mapping() {
        let map = not_found_as_trunk("cust-trunk-001");
        let err = map(AppError::Api {
            status: 404,
            code: "not_found".to_string(),
            message: String::new(),
        });
        assert!(matches!(err, AppError::TrunkNotFound(id) if id == "cust-trunk-001"));

        let map = not_found_as_trunk("cust-trunk-001");
        assert!(matches!(map(AppError::Timeout(30)), AppError::Timeout(30)));
    }
}
