use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskboard_auth::TaskQuery;
use taskboard_core::{Page, ProjectId, TaskId, TaskStatus, UserId};
use taskboard_infra::{Project, Task, User};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

/// Fields are optional so that absence reports as 400 with a field name
/// instead of a deserializer message.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub project_id: Option<ProjectId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::from_query(self.page.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub page: Option<String>,
}

impl TaskListQuery {
    pub fn page(&self) -> Page {
        Page::from_query(self.page.as_deref())
    }

    /// Parse the optional filters; empty values mean "no filter".
    pub fn filters(&self) -> Result<TaskQuery, ApiError> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        let status = non_empty(&self.status)
            .map(str::parse::<TaskStatus>)
            .transpose()?;
        let assigned_to = non_empty(&self.assigned_to)
            .map(str::parse::<UserId>)
            .transpose()?;

        Ok(TaskQuery {
            status,
            assigned_to,
        })
    }
}

/// Trimmed, non-empty value of a required body field.
pub fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_token: String,
    pub refresh_token: String,
    pub identity: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct CreatorView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct NamedRef<Id> {
    pub id: Id,
    pub name: String,
}

/// Project with its creator expanded; `createdBy` is null once the creator
/// no longer exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<CreatorView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn new(project: Project, users: &HashMap<UserId, User>) -> Self {
        let created_by = users.get(&project.created_by).map(|u| CreatorView {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        });
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            created_by,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<NamedRef<UserId>>,
    pub project: Option<NamedRef<ProjectId>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn new(
        task: Task,
        users: &HashMap<UserId, User>,
        projects: &HashMap<ProjectId, Project>,
    ) -> Self {
        let assigned_to = task
            .assigned_to
            .and_then(|id| users.get(&id))
            .map(|u| NamedRef {
                id: u.id,
                name: u.name.clone(),
            });
        let project = projects.get(&task.project_id).map(|p| NamedRef {
            id: p.id,
            name: p.name.clone(),
        });
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            assigned_to,
            project,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
