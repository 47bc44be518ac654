use axum::{Router, routing::get};

pub mod auth;
pub mod projects;
pub mod system;
pub mod tasks;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/projects", projects::router())
        .nest("/tasks", tasks::router())
}
