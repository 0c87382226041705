//! Trunk resource handlers
//!
//! Proxies the platform's trunk resources with the caller's session. When the
//! platform ends the session (refresh failed), it is dropped from the store
//! and the caller gets a 401.

use crate::dto::{ApiResponse, StatusChangeRequest, TrunkListParams};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use ringer_auth::{PlatformSession, SessionStore};
use ringer_core::models::SipTrunk;
use ringer_core::traits::TrunkScope;
use ringer_core::{AppError, AppResult};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

fn scope_from_path(segment: &str, owner: &str) -> AppResult<TrunkScope> {
    TrunkScope::from_segment(segment, owner)
        .ok_or_else(|| AppError::NotFound(format!("Unknown trunk owner {}/{}", segment, owner)))
}

/// Drop a session the platform has ended
fn settle<T>(result: AppResult<T>, session: &PlatformSession, store: &SessionStore) -> AppResult<T> {
    if let Err(AppError::SessionExpired) = &result {
        warn!("Platform session ended, discarding");
        session.discard(store);
    }
    result
}

/// List trunks of a customer or vendor
///
/// GET /api/v1/{scope}/{owner}/trunks
#[instrument(skip(state, store, session, query))]
pub async fn list_trunks(
    state: web::Data<AppState>,
    store: web::Data<SessionStore>,
    session: PlatformSession,
    path: web::Path<(String, String)>,
    query: web::Query<TrunkListParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("List query validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let (segment, owner) = path.into_inner();
    let scope = scope_from_path(&segment, &owner)?;
    let list_query = query.to_query()?;

    debug!(%scope, page = list_query.page, per_page = list_query.per_page, "Listing trunks");

    let result = {
        let mut guard = session.handle.lock().await;
        state.trunks.list(&mut guard, &scope, &list_query).await
    };
    let page = settle(result, &session, &store)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

/// Fetch one trunk
///
/// GET /api/v1/{scope}/{owner}/trunks/{id}
#[instrument(skip(state, store, session))]
pub async fn get_trunk(
    state: web::Data<AppState>,
    store: web::Data<SessionStore>,
    session: PlatformSession,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, AppError> {
    let (segment, owner, id) = path.into_inner();
    let scope = scope_from_path(&segment, &owner)?;

    let result = {
        let mut guard = session.handle.lock().await;
        state.trunks.get(&mut guard, &scope, &id).await
    };
    let trunk = settle(result, &session, &store)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(trunk)))
}

/// Create a trunk
///
/// POST /api/v1/{scope}/{owner}/trunks
#[instrument(skip(state, store, session, req))]
pub async fn create_trunk(
    state: web::Data<AppState>,
    store: web::Data<SessionStore>,
    session: PlatformSession,
    path: web::Path<(String, String)>,
    req: web::Json<SipTrunk>,
) -> Result<HttpResponse, AppError> {
    let (segment, owner) = path.into_inner();
    let scope = scope_from_path(&segment, &owner)?;

    let result = {
        let mut guard = session.handle.lock().await;
        state.trunks.create(&mut guard, &scope, &req).await
    };
    let created = settle(result, &session, &store)?;

    info!(%scope, trunk_id = %created.basic.id, "Trunk created");
    Ok(HttpResponse::Created().json(ApiResponse::with_message(created, "Trunk created")))
}

/// Replace a trunk's configuration
///
/// PUT /api/v1/{scope}/{owner}/trunks/{id}
#[instrument(skip(state, store, session, req))]
pub async fn update_trunk(
    state: web::Data<AppState>,
    store: web::Data<SessionStore>,
    session: PlatformSession,
    path: web::Path<(String, String, String)>,
    req: web::Json<SipTrunk>,
) -> Result<HttpResponse, AppError> {
    let (segment, owner, id) = path.into_inner();
    let scope = scope_from_path(&segment, &owner)?;

    if req.basic.id != id {
        return Err(AppError::InvalidInput(format!(
            "Trunk id {} does not match path id {}",
            req.basic.id, id
        )));
    }

    let result = {
        let mut guard = session.handle.lock().await;
        state.trunks.update(&mut guard, &scope, &req).await
    };
    let updated = settle(result, &session, &store)?;

    info!(%scope, trunk_id = %id, "Trunk updated");
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Trunk updated")))
}

/// Change a trunk's status
///
/// PUT /api/v1/{scope}/{owner}/trunks/{id}/status
#[instrument(skip(state, store, session, req))]
pub async fn change_status(
    state: web::Data<AppState>,
    store: web::Data<SessionStore>,
    session: PlatformSession,
    path: web::Path<(String, String, String)>,
    req: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let (segment, owner, id) = path.into_inner();
    let scope = scope_from_path(&segment, &owner)?;
    let status = req.parse()?;

    let result = {
        let mut guard = session.handle.lock().await;
        state.trunks.set_status(&mut guard, &scope, &id, status).await
    };
    let updated = settle(result, &session, &store)?;

    info!(%scope, trunk_id = %id, status = %status, "Trunk status changed");
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

/// Configure trunk resource routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/{scope}/{owner}/trunks")
            .route("", web::get().to(list_trunks))
            .route("", web::post().to(create_trunk))
            .route("/{id}", web::get().to(get_trunk))
            .route("/{id}", web::put().to(update_trunk))
            .route("/{id}/status", web::put().to(change_status)),
    );
}
