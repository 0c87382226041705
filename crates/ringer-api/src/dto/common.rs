//! Common DTOs used across the API

use ringer_core::models::TrunkStatus;
use ringer_core::traits::TrunkListQuery;
use ringer_core::AppError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Response data
    pub data: T,
    /// Response message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// Create a success response with data and message
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page", deserialize_with = "deserialize_number_from_string")]
    #[validate(range(min = 1))]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_per_page", deserialize_with = "deserialize_number_from_string")]
    #[validate(range(min = 1, max = 100))]
    pub per_page: i64,
}

/// Deserialize a number from either a string or a number
fn deserialize_number_from_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct I64OrStringVisitor;

    impl<'de> Visitor<'de> for I64OrStringVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer or a string containing an integer")
        }

        fn visit_i64<E>(self, value: i64) -> Result<i64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<i64, E>
        where
            E: de::Error,
        {
            i64::try_from(value).map_err(de::Error::custom)
        }

        fn visit_str<E>(self, value: &str) -> Result<i64, E>
        where
            E: de::Error,
        {
            value.trim().parse::<i64>().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(I64OrStringVisitor)
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// Query parameters of a trunk listing
///
/// `GET /{scope}/{owner}/trunks?page=2&per_page=20&search=acme&status=active`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TrunkListParams {
    #[serde(flatten)]
    #[validate(nested)]
    pub pagination: PaginationParams,

    /// Free-text search on name and identifiers
    #[serde(default)]
    #[validate(length(max = 100, message = "Search is limited to 100 characters"))]
    pub search: Option<String>,

    /// Status filter, any letter case
    #[serde(default)]
    pub status: Option<String>,
}

impl TrunkListParams {
    /// Platform list query
    pub fn to_query(&self) -> Result<TrunkListQuery, AppError> {
        let mut query = TrunkListQuery::new(self.pagination.page, self.pagination.per_page);
        query.search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        query.status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(TrunkStatus::from_str(raw).ok_or_else(|| {
                AppError::InvalidInput(format!("Unknown trunk status '{}'", raw))
            })?),
        };
        Ok(query)
    }
}
