//! Client for the platform trunk REST API
//!
//! - [`ApiClient`]: bearer auth, refresh-on-401, retried reads
//! - [`TrunkApi`]: the [`TrunkRepository`](ringer_core::traits::TrunkRepository)
//!   over the platform's admin endpoints, cached per session
//! - [`wire`]: mapping between the platform's flat records and [`SipTrunk`](ringer_core::models::SipTrunk)
//!
//! # Example
//!
//! ```no_run
//! use ringer_auth::Session;
//! use ringer_client::{ApiClient, TrunkApi};
//! use ringer_core::config::{AuthConfig, PlatformApiConfig};
//! use ringer_core::traits::{TrunkListQuery, TrunkRepository, TrunkScope};
//!
//! # async fn run() -> ringer_core::AppResult<()> {
//! let client = ApiClient::new(&PlatformApiConfig::default(), &AuthConfig::default())?;
//! let trunks = TrunkApi::new(client);
//!
//! let mut session = Session::new("access-token", Some("refresh-token".to_string()));
//! let scope = TrunkScope::Vendor("PROV-ATT-001".to_string());
//! let page = trunks.list(&mut session, &scope, &TrunkListQuery::new(1, 20)).await?;
//! println!("{} trunks", page.pagination.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod trunks;
pub mod wire;

pub use client::ApiClient;
pub use trunks::TrunkApi;
