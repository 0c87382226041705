//! HTTP request handlers

pub mod tooling;
pub mod trunks;

use actix_web::web;

pub use tooling::configure as configure_tooling;
pub use trunks::configure as configure_trunks;

/// Mount every API route under `/api/v1`
///
/// Tooling routes are registered first so `/trunks/...` is never read as a
/// trunk owner path.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(configure_tooling)
            .configure(configure_trunks),
    );
}
