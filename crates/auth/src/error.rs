use thiserror::Error;

use crate::{DenyReason, SecretKind};

/// Request-level authentication and authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is invalid")]
    TokenInvalid,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("identity no longer exists")]
    IdentityNotFound,

    #[error("forbidden: {0}")]
    Forbidden(DenyReason),
}

/// Token issuing failures. These are configuration/programming errors, not
/// something a client can cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("{0} signing secret is not configured")]
    MissingSecret(SecretKind),

    #[error("failed to encode token: {0}")]
    Encoding(String),
}
