use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use taskboard_auth::{Action, Resource, Role, hash_password, user_scope};
use taskboard_infra::{NewUser, User};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::DeferredJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_users).post(create_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: DeferredJson,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&actor, Action::Create, Resource::User)?;
    let body: dto::CreateUserRequest = body.decode()?;

    let name = dto::required("name", body.name)?;
    let email = dto::required("email", body.email)?;
    let password = dto::required("password", body.password)?;
    let role: Role = dto::required("role", body.role)?.trim().parse()?;

    let user = services
        .store
        .create_user(NewUser {
            name,
            email,
            password_hash: hash_password(&password)?,
            role,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %actor.id(), "user created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "userId": user.id,
        })),
    ))
}

/// Identities visible to the actor, newest first.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Vec<User>>, ApiError> {
    authz::require(&actor, Action::List, Resource::User)?;

    let scope = user_scope(actor.role(), actor.id());
    Ok(Json(services.store.list_users(&scope).await?))
}
