//! Platform sessions for the Ringer trunk platform
//!
//! The platform issues the tokens; this crate keeps track of them.
//!
//! # Features
//!
//! - Token claim inspection (subject and expiry) without the signing key
//! - Sessions that own a query cache and rotate tokens on refresh
//! - Actix-web extractors for bearer tokens and per-caller sessions
//!
//! # Examples
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use ringer_auth::middleware::PlatformSession;
//!
//! async fn whoami(session: PlatformSession) -> HttpResponse {
//!     let session = session.handle.lock().await;
//!     HttpResponse::Ok().json(serde_json::json!({ "user": session.user_id() }))
//! }
//! ```

pub mod claims;
pub mod middleware;
pub mod session;

pub use claims::Claims;
pub use middleware::{BearerToken, PlatformSession};
pub use session::{Session, SessionHandle, SessionStore};
