//! API-side authorization guard.
//!
//! Handlers call this before touching a repository, so a denied request never
//! learns whether its target exists.

use tracing::info;

use taskboard_auth::{Action, AuthError, Decision, Resource, authorize};

use crate::app::errors::ApiError;
use crate::context::ActorContext;

/// Check the policy table for the current actor.
pub fn require(actor: &ActorContext, action: Action, resource: Resource) -> Result<(), ApiError> {
    match authorize(actor.role(), actor.id(), action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            info!(
                actor_id = %actor.id(),
                role = %actor.role(),
                %action,
                resource = %resource.kind(),
                %reason,
                "request denied by policy"
            );
            Err(AuthError::Forbidden(reason).into())
        }
    }
}
