//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, token issuer, session flows
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and expansion of references
//! - `errors.rs`: the single error type and its response shape
//! - `extract.rs`: JSON/query extractors that reject with that shape

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tracing::info;

use taskboard_infra::{AppConfig, RateLimitConfig, bootstrap};

use crate::middleware;
use crate::rate_limit::RateLimiter;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

pub use services::{AppServices, StartupError};

/// Build the full HTTP router from configuration (public entrypoint used by
/// `main.rs`): selects the store, seeds the administrator, wires the routes.
pub async fn build_app(config: &AppConfig) -> Result<Router, StartupError> {
    let services = Arc::new(services::build_services(config).await?);

    if let Some(seed) = &config.seed_admin {
        if bootstrap::ensure_admin(services.store.as_ref(), seed).await? {
            info!(email = %seed.email, "seed administrator ready");
        }
    }

    Ok(router(services, config.rate_limit))
}

/// Route tree over already-built services.
pub fn router(services: Arc<AppServices>, rate_limit: RateLimitConfig) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
    };
    let limiter = Arc::new(RateLimiter::new(rate_limit));

    // Protected routes: require a verified session token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let limited = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(limited)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_middleware))
                .layer(Extension(services)),
        )
}
