//! Common traits and pagination types
//!
//! The platform API is the system of record for trunks; this module defines
//! the repository seam the HTTP layer talks to and the paging shapes it
//! returns.

use crate::error::AppError;
use crate::models::{SipTrunk, TrunkStatus, TrunkType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner of a set of trunks on the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrunkScope {
    /// Customer trunks of a billing account (BAN)
    Customer(String),
    /// Vendor trunks of a provider
    Vendor(String),
}

impl TrunkScope {
    /// Build from a URL segment (`customers` / `vendors`) and owner id
    pub fn from_segment(segment: &str, owner: &str) -> Option<Self> {
        if owner.trim().is_empty() {
            return None;
        }
        match segment.to_lowercase().as_str() {
            "customers" => Some(TrunkScope::Customer(owner.to_string())),
            "vendors" => Some(TrunkScope::Vendor(owner.to_string())),
            _ => None,
        }
    }

    /// Scope that owns a trunk, from its basic block
    pub fn of(trunk: &SipTrunk) -> Option<Self> {
        match trunk.basic.trunk_type {
            TrunkType::Customer => trunk.basic.ban.clone().map(TrunkScope::Customer),
            TrunkType::Vendor => trunk.basic.provider_id.clone().map(TrunkScope::Vendor),
        }
    }

    pub fn segment(&self) -> &'static str {
        match self {
            TrunkScope::Customer(_) => "customers",
            TrunkScope::Vendor(_) => "vendors",
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            TrunkScope::Customer(ban) => ban,
            TrunkScope::Vendor(provider_id) => provider_id,
        }
    }

    pub fn trunk_type(&self) -> TrunkType {
        match self {
            TrunkScope::Customer(_) => TrunkType::Customer,
            TrunkScope::Vendor(_) => TrunkType::Vendor,
        }
    }
}

impl fmt::Display for TrunkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment(), self.owner())
    }
}

/// Largest page the platform serves
pub const MAX_PER_PAGE: i64 = 100;

/// Filters accepted by trunk list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrunkListQuery {
    pub page: i64,
    pub per_page: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrunkStatus>,
}

impl TrunkListQuery {
    /// Page is at least 1; `per_page` is clamped to `1..=MAX_PER_PAGE`
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            search: None,
            status: None,
        }
    }

    /// Query-string pairs in a stable order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        pairs
    }
}

/// Trunk repository backed by the platform API
///
/// `Session` carries the caller's credentials; implementations may refresh
/// it in place.
#[async_trait]
pub trait TrunkRepository: Send + Sync {
    type Session: Send;

    /// List trunks of a scope
    async fn list(
        &self,
        session: &mut Self::Session,
        scope: &TrunkScope,
        query: &TrunkListQuery,
    ) -> Result<Page<SipTrunk>, AppError>;

    /// Fetch one trunk
    async fn get(
        &self,
        session: &mut Self::Session,
        scope: &TrunkScope,
        id: &str,
    ) -> Result<SipTrunk, AppError>;

    /// Create a trunk and return the stored document
    async fn create(
        &self,
        session: &mut Self::Session,
        scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> Result<SipTrunk, AppError>;

    /// Replace a trunk's configuration and return the stored document
    async fn update(
        &self,
        session: &mut Self::Session,
        scope: &TrunkScope,
        trunk: &SipTrunk,
    ) -> Result<SipTrunk, AppError>;

    /// Change status and return the stored document
    async fn set_status(
        &self,
        session: &mut Self::Session,
        scope: &TrunkScope,
        id: &str,
        status: TrunkStatus,
    ) -> Result<SipTrunk, AppError>;
}

/// Pagination metadata
///
/// The platform omits zero-valued fields, so every field defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub per_page: i64,
    #[serde(default)]
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    /// Convert items, keeping the paging metadata
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            pagination: self.pagination,
        })
    }
}
