//! `taskboard-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it issues and
//! verifies tokens, hashes passwords, and decides what an actor may do.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{
    Action, Decision, DenyReason, Resource, ResourceKind, TaskQuery, TaskScope, UserScope,
    authorize, mutable_task_fields, restrict_task_patch, task_scope, user_scope,
};
pub use claims::{RefreshClaims, SessionClaims, check_expiry};
pub use error::{AuthError, TokenError};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::Actor;
pub use roles::Role;
pub use token::{Claim, REFRESH_TTL_SECS, SESSION_TTL_SECS, SecretKind, TokenIssuer};
