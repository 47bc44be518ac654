use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskboard_core::UserId;

use crate::{AuthError, Role};

/// Session token claims.
///
/// Identity and role as they were when the token was minted; `iat`/`exp`
/// are unix seconds, as JWT expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / identity identifier.
    pub sub: UserId,

    /// Role granted at issuance.
    pub role: Role,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

/// Refresh token claims: identity only, so renewal has to consult the
/// credential store for the current role. Extra claims are rejected so a
/// session token never passes as a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub exp: i64,
}

impl SessionClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

impl RefreshClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Deterministically check a token expiry against `now`.
///
/// A token is expired from the exact second of its `exp` onwards.
pub fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), AuthError> {
    if now.timestamp() >= exp {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}
