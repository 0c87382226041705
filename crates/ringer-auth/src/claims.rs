//! Platform token claims
//!
//! Access tokens are issued and signed by the platform. This service never
//! holds the signing key, so it only reads the claims to learn who the
//! session belongs to and when it expires; the platform remains the judge of
//! validity.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use ringer_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by a platform access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Platform roles, e.g. `admin`
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Read the claims of a token without verifying its signature
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidToken` when the token is not a JWT or lacks
    /// `sub`/`exp`
    pub fn inspect(token: &str) -> Result<Self, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| {
                debug!(error = %e, "Unreadable access token");
                AppError::InvalidToken(e.to_string())
            })?;
        Ok(data.claims)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Whether the token expires within `skew_secs` from now
    pub fn is_expired(&self, skew_secs: i64) -> bool {
        self.exp - skew_secs <= Utc::now().timestamp()
    }
}
