//! Persisted records for identities, projects and tasks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskboard_auth::Role;
use taskboard_core::{
    DomainError, DomainResult, ProjectId, ProjectPatch, TaskId, TaskPatch, TaskStatus, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// A stored identity. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(DomainError::validation("email is not a valid address"));
        }
        require("password", &self.password_hash)
    }

    pub fn into_record(self, now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password_hash: self.password_hash,
            role: self.role,
            created_at: now,
        }
    }
}

/// Emails are unique case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// Project
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
}

impl NewProject {
    pub fn validate(&self) -> DomainResult<()> {
        require("name", &self.name)
    }

    pub fn into_record(self, now: DateTime<Utc>) -> Project {
        Project {
            id: ProjectId::new(),
            name: self.name.trim().to_string(),
            description: self.description,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Project {
    pub fn apply(&mut self, patch: ProjectPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            require("name", &name)?;
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        self.updated_at = now;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<UserId>,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<UserId>,
    pub project_id: ProjectId,
}

impl NewTask {
    pub fn validate(&self) -> DomainResult<()> {
        require("title", &self.title)
    }

    pub fn into_record(self, now: DateTime<Utc>) -> Task {
        Task {
            id: TaskId::new(),
            title: self.title.trim().to_string(),
            description: self.description,
            status: self.status,
            assigned_to: self.assigned_to,
            project_id: self.project_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Task {
    /// Merge an already policy-restricted patch. Reference checks are the
    /// store's job since they need the other collections.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(title) = patch.title {
            require("title", &title)?;
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = Some(assigned_to);
        }
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}
