use std::sync::Arc;

use axum::{Extension, Json, Router, routing::post};

use taskboard_auth::AuthError;

use crate::app::dto::{self, LoginResponse, RefreshResponse};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;

/// Public routes: no bearer token required.
pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = dto::required("email", body.email)?;
    let password = dto::required("password", body.password)?;

    let session = services.login(&email, &password).await?;
    Ok(Json(LoginResponse {
        session_token: session.session_token,
        refresh_token: session.refresh_token,
        identity: session.user,
    }))
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = body
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AuthError::Unauthenticated)?;

    let session_token = services.renew_session(token.trim()).await?;
    Ok(Json(RefreshResponse { session_token }))
}
