use serde::{Deserialize, Serialize};

use taskboard_core::UserId;

use crate::{Role, SessionClaims};

/// The authenticated identity making a request.
///
/// Built only from a verified session claim; the role never comes from a
/// request body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

impl From<&SessionClaims> for Actor {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}
