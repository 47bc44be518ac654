use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use taskboard_auth::{
    Action, Resource, TaskQuery, mutable_task_fields, restrict_task_patch, task_scope,
};
use taskboard_core::{TaskId, TaskPatch};
use taskboard_infra::NewTask;

use crate::app::dto::{self, TaskView};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiQuery, DeferredJson};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", put(update_task).delete(delete_task))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: DeferredJson,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&actor, Action::Create, Resource::any_task())?;
    let body: dto::CreateTaskRequest = body.decode()?;

    let title = dto::required("title", body.title)?;
    let project_id = body
        .project_id
        .ok_or_else(|| ApiError::validation("projectId is required"))?;

    let task = services
        .store
        .create_task(NewTask {
            title,
            description: body.description,
            status: body.status.unwrap_or_default(),
            assigned_to: body.assigned_to,
            project_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Task created successfully",
            "task": task,
        })),
    ))
}

/// Tasks in the actor's scope. Members only ever see their own assignments,
/// and their filters are ignored without being read.
pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiQuery(query): ApiQuery<dto::TaskListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&actor, Action::List, Resource::any_task())?;

    let page = query.page();
    let requested = if actor.role().is_privileged() {
        query.filters()?
    } else {
        TaskQuery::default()
    };
    let scope = task_scope(actor.role(), actor.id(), requested);
    let tasks = services.store.list_tasks(&scope, page).await?;

    let users = services
        .users_by_id(tasks.iter().filter_map(|t| t.assigned_to).collect())
        .await?;
    let projects = services
        .projects_by_id(tasks.iter().map(|t| t.project_id).collect())
        .await?;

    let tasks = tasks
        .into_iter()
        .map(|t| TaskView::new(t, &users, &projects))
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "page": page.number(),
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

/// The policy sees the current assignee before existence is reported, so a
/// non-assignee gets 403 even for a missing task. Only the keys the actor's
/// role may change are decoded from the body; the rest are dropped unread.
pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: DeferredJson,
) -> Result<impl IntoResponse, ApiError> {
    let id: TaskId = id.parse()?;

    let current = services.store.find_task(id).await?;
    let assigned_to = current.as_ref().and_then(|t| t.assigned_to);
    authz::require(&actor, Action::Update, Resource::Task { assigned_to })?;
    if current.is_none() {
        return Err(ApiError::NotFound);
    }

    let allowed: Vec<&str> = mutable_task_fields(actor.role())
        .iter()
        .map(|field| field.wire_name())
        .collect();
    let patch: TaskPatch = body.decode_keeping(&allowed)?;
    let patch = restrict_task_patch(actor.role(), patch);

    // A Member's right to write rests on still being the assignee.
    let expected_assignee = (!actor.role().is_privileged()).then(|| actor.id());
    let task = services
        .store
        .update_task(id, patch, expected_assignee)
        .await?;

    Ok(Json(json!({
        "message": "Task updated successfully",
        "task": task,
    })))
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TaskId = id.parse()?;
    authz::require(&actor, Action::Delete, Resource::any_task())?;

    services.store.delete_task(id).await?;

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
