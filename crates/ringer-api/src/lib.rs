//! API layer for the Ringer trunk tooling
//!
//! Two groups of endpoints under `/api/v1`:
//!
//! - stateless tooling over a posted trunk document (validation, rate
//!   resolution, exclusion checks, margin and health reports, templates)
//! - the platform's trunk resources, proxied with the caller's session

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;
pub mod state;

pub use dto::{ApiResponse, PaginationParams, TrunkListParams};
pub use handlers::{configure, configure_tooling, configure_trunks};
pub use state::{AppState, SharedTrunkRepository};
