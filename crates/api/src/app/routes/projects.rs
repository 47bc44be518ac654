use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use taskboard_auth::{Action, Resource};
use taskboard_core::{ProjectId, ProjectPatch};
use taskboard_infra::NewProject;

use crate::app::dto::{self, ProjectView};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiQuery, DeferredJson};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", put(update_project).delete(delete_project))
}

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: DeferredJson,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&actor, Action::Create, Resource::Project)?;
    let body: dto::CreateProjectRequest = body.decode()?;

    let project = services
        .store
        .create_project(NewProject {
            name: dto::required("name", body.name)?,
            description: body.description,
            created_by: actor.id(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully",
            "project": project,
        })),
    ))
}

/// Every project, one page at a time; listing is never narrowed by owner.
pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiQuery(query): ApiQuery<dto::PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&actor, Action::List, Resource::Project)?;

    let page = query.page();
    let projects = services.store.list_projects(page).await?;
    let creators = services
        .users_by_id(projects.iter().map(|p| p.created_by).collect())
        .await?;

    let projects = projects
        .into_iter()
        .map(|p| ProjectView::new(p, &creators))
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "page": page.number(),
        "count": projects.len(),
        "projects": projects,
    })))
}

pub async fn update_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: DeferredJson,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProjectId = id.parse()?;
    authz::require(&actor, Action::Update, Resource::Project)?;
    let patch: ProjectPatch = body.decode()?;

    let project = services.store.update_project(id, patch).await?;

    Ok(Json(json!({
        "message": "Project updated successfully",
        "project": project,
    })))
}

pub async fn delete_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProjectId = id.parse()?;
    authz::require(&actor, Action::Delete, Resource::Project)?;

    services.store.delete_project(id).await?;

    Ok(Json(json!({ "message": "Project deleted successfully" })))
}
