//! Query cache for the Ringer trunk client
//!
//! Each session owns one `QueryCache`. Reads from the platform API are stored
//! as JSON under a key built from the resource and its parameters, and expire
//! after a fixed TTL. Mutations drop every key under the affected owner scope.
//!
//! # Example
//!
//! ```
//! use ringer_cache::QueryCache;
//! use std::time::Duration;
//!
//! let cache = QueryCache::new(Duration::from_secs(60), 128);
//! cache.set("trunks:vendors/PROV-001:trunk:vendor-trunk-001", &"cached").unwrap();
//!
//! let value: Option<String> = cache.get("trunks:vendors/PROV-001:trunk:vendor-trunk-001").unwrap();
//! assert_eq!(value, Some("cached".to_string()));
//!
//! cache.invalidate_prefix("trunks:vendors/PROV-001:");
//! assert!(cache.is_empty());
//! ```

pub mod keys;

use moka::sync::Cache;
use ringer_core::config::CacheConfig;
use ringer_core::error::AppError;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// In-memory TTL cache of serialized query results
///
/// Bounded by `capacity`; moka picks eviction victims by recency and
/// frequency once the bound is reached.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<String, String>,
    ttl: Duration,
    capacity: u64,
}

impl QueryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(1) as u64;
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            entries,
            ttl,
            capacity,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.capacity)
    }

    /// Get a value and deserialize it
    ///
    /// Expired entries read as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.entries.get(key) {
            Some(json) => {
                let value = serde_json::from_str::<T>(&json).map_err(|e| {
                    error!("Failed to deserialize value for key {}: {}", key, e);
                    AppError::Serialization(format!("Deserialization failed: {}", e))
                })?;
                debug!("Cache HIT: {}", key);
                Ok(Some(value))
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    /// Store a value under the cache TTL
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_string(value).map_err(|e| {
            error!("Failed to serialize value for key {}: {}", key, e);
            AppError::Serialization(format!("Serialization failed: {}", e))
        })?;

        debug!("SET {} (TTL: {}s)", key, self.ttl.as_secs());
        self.entries.insert(key.to_string(), json);
        Ok(())
    }

    /// Delete a key, returning whether it was present
    pub fn delete(&self, key: &str) -> bool {
        debug!("DEL {}", key);
        self.entries.remove(key).is_some()
    }

    /// Whether a live entry exists for the key
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Delete every key starting with `prefix`, returning how many went
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let matching: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in &matching {
            self.entries.invalidate(key.as_str());
        }
        debug!("Invalidated {} cached entries under {}", matching.len(), prefix);
        matching.len()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of live entries, after pending evictions have run
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().next().is_none()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(keys::QUERY_TTL_SECS), 256)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish()
    }
}
