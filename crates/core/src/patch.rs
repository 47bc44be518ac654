//! Partial updates for projects and tasks.
//!
//! A field left `None` is untouched by an update.

use serde::Deserialize;

use crate::{ProjectId, TaskStatus, UserId};

/// Task fields a caller may ask to change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Description,
    Status,
    AssignedTo,
    Project,
}

impl TaskField {
    pub const ALL: [TaskField; 5] = [
        TaskField::Title,
        TaskField::Description,
        TaskField::Status,
        TaskField::AssignedTo,
        TaskField::Project,
    ];

    /// Key of this field in a JSON task patch.
    pub fn wire_name(self) -> &'static str {
        match self {
            TaskField::Title => "title",
            TaskField::Description => "description",
            TaskField::Status => "status",
            TaskField::AssignedTo => "assignedTo",
            TaskField::Project => "projectId",
        }
    }
}

/// Requested changes to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub project_id: Option<ProjectId>,
}

impl TaskPatch {
    /// Drop every change whose field is not in `allowed`.
    pub fn retain_fields(self, allowed: &[TaskField]) -> Self {
        let keep = |field: TaskField| allowed.contains(&field);
        Self {
            title: self.title.filter(|_| keep(TaskField::Title)),
            description: self.description.filter(|_| keep(TaskField::Description)),
            status: self.status.filter(|_| keep(TaskField::Status)),
            assigned_to: self.assigned_to.filter(|_| keep(TaskField::AssignedTo)),
            project_id: self.project_id.filter(|_| keep(TaskField::Project)),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Requested changes to a project. The creator is not part of the patch and
/// therefore can never be reassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_keeps_only_allowed_fields() {
        let patch = TaskPatch {
            title: Some("x".into()),
            description: Some("d".into()),
            status: Some(TaskStatus::Done),
            assigned_to: Some(UserId::new()),
            project_id: Some(ProjectId::new()),
        };

        let stripped = patch.retain_fields(&[TaskField::Status]);
        assert_eq!(
            stripped,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            }
        );
    }

    #[test]
    fn camel_case_wire_names() {
        let id = UserId::new();
        let patch: TaskPatch = serde_json::from_value(serde_json::json!({
            "assignedTo": id.to_string(),
            "status": "In Progress",
        }))
        .unwrap();
        assert_eq!(patch.assigned_to, Some(id));
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn wire_names_match_patch_keys() {
        let mut body = serde_json::Map::new();
        for field in TaskField::ALL {
            let value = match field {
                TaskField::Status => serde_json::json!("Done"),
                TaskField::AssignedTo => serde_json::json!(UserId::new().to_string()),
                TaskField::Project => serde_json::json!(ProjectId::new().to_string()),
                _ => serde_json::json!("text"),
            };
            body.insert(field.wire_name().to_string(), value);
        }
        let patch: TaskPatch = serde_json::from_value(body.into()).unwrap();
        assert_eq!(patch.clone().retain_fields(&TaskField::ALL), patch);
        assert!(patch.title.is_some() && patch.description.is_some());
        assert!(patch.status.is_some() && patch.assigned_to.is_some() && patch.project_id.is_some());
    }

    #[test]
    fn created_by_is_not_patchable() {
        let patch: ProjectPatch = serde_json::from_value(serde_json::json!({
            "name": "Beta",
            "createdBy": UserId::new().to_string(),
        }))
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Beta"));
        assert_eq!(patch.description, None);
    }
}
