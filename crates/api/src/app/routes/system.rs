use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode};

use taskboard_auth::AuthError;
use taskboard_infra::User;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The stored identity behind the presented session token.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<User>, ApiError> {
    let user = services
        .store
        .find_user(actor.id())
        .await?
        .ok_or(AuthError::IdentityNotFound)?;
    Ok(Json(user))
}
