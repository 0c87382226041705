//! Cache key constants and builders
//!
//! Keys are namespaced by resource and owner scope so that a mutation can
//! drop everything cached for one customer or vendor in a single call.
//!
//! # Key Patterns
//!
//! - `trunks:{scope}:list?{params}` - One page of a trunk listing
//! - `trunks:{scope}:trunk:{id}` - A single trunk document
//!
//! `{scope}` renders as `customers/{ban}` or `vendors/{provider_id}`.
//!
//! # Example
//!
//! ```
//! use ringer_cache::keys;
//! use ringer_core::traits::TrunkScope;
//!
//! let scope = TrunkScope::Customer("BAN-12345678".to_string());
//! assert_eq!(
//!     keys::trunk_key(&scope, "cust-trunk-001"),
//!     "trunks:customers/BAN-12345678:trunk:cust-trunk-001"
//! );
//! ```

use ringer_core::traits::{TrunkListQuery, TrunkScope};

/// Prefix for cached trunk resources
pub const TRUNKS_PREFIX: &str = "trunks";

/// Default TTL for cached reads (1 minute)
pub const QUERY_TTL_SECS: u64 = 60;

/// Everything cached for one owner scope
///
/// Format: `trunks:{scope}:`
pub fn scope_prefix(scope: &TrunkScope) -> String {
    format!("{}:{}:", TRUNKS_PREFIX, scope)
}

/// Build a cache key for a single trunk
///
/// Format: `trunks:{scope}:trunk:{id}`
pub fn trunk_key(scope: &TrunkScope, trunk_id: &str) -> String {
    format!("{}trunk:{}", scope_prefix(scope), trunk_id)
}

/// Build a cache key for one page of a trunk listing
///
/// Query parameters are rendered in a fixed order, so equal queries share a
/// key.
///
/// Format: `trunks:{scope}:list?page=1&per_page=20[&search=..][&status=..]`
pub fn trunk_list_key(scope: &TrunkScope, query: &TrunkListQuery) -> String {
    let params = query
        .to_pairs()
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}list?{}", scope_prefix(scope), params)
}
