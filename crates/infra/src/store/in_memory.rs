use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use taskboard_auth::{TaskScope, UserScope};
use taskboard_core::{Page, ProjectId, ProjectPatch, TaskId, TaskPatch, UserId};

use super::{ProjectRepository, StoreError, StoreResult, TaskRepository, UserRepository};
use crate::records::{NewProject, NewTask, NewUser, Project, Task, User, normalize_email};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
}

impl Collections {
    /// Check the references that are `Some`.
    fn check_task_refs(
        &self,
        project_id: Option<ProjectId>,
        assigned_to: Option<UserId>,
    ) -> StoreResult<()> {
        if let Some(project_id) = project_id {
            if !self.projects.contains_key(&project_id) {
                return Err(StoreError::validation(format!("project {project_id} does not exist")));
            }
        }
        if let Some(user_id) = assigned_to {
            if !self.users.contains_key(&user_id) {
                return Err(StoreError::validation(format!("user {user_id} does not exist")));
            }
        }
        Ok(())
    }
}

/// In-memory store for tests/dev.
///
/// One lock guards all three collections, so every call is atomic and a
/// caller always observes its own prior writes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an identity record as-is.
    pub fn upsert_user(&self, user: User) -> StoreResult<()> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    /// Remove an identity outright.
    pub fn remove_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.write()?.users.remove(&id))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()?;
        let user = new.into_record(Utc::now());

        let mut map = self.write()?;
        if map.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        map.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let map = self.read()?;
        Ok(ids.iter().filter_map(|id| map.users.get(id).cloned()).collect())
    }

    async fn list_users(&self, scope: &UserScope) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .read()?
            .users
            .values()
            .filter(|u| scope.permits(u.id, u.role))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }
}

#[async_trait]
impl ProjectRepository for InMemoryStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        new.validate()?;
        let project = new.into_record(Utc::now());
        self.write()?.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn find_projects(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>> {
        let map = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| map.projects.get(id).cloned())
            .collect())
    }

    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.read()?.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page.apply(projects))
    }

    async fn update_project(&self, id: ProjectId, patch: ProjectPatch) -> StoreResult<Project> {
        let mut map = self.write()?;
        let current = map.projects.get(&id).ok_or(StoreError::NotFound)?;

        let mut updated = current.clone();
        updated.apply(patch, Utc::now())?;
        map.projects.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_project(&self, id: ProjectId) -> StoreResult<()> {
        self.write()?
            .projects
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn create_task(&self, new: NewTask) -> StoreResult<Task> {
        new.validate()?;
        let mut map = self.write()?;
        map.check_task_refs(Some(new.project_id), new.assigned_to)?;

        let task = new.into_record(Utc::now());
        map.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, scope: &TaskScope, page: Page) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read()?
            .tasks
            .values()
            .filter(|t| scope.permits(t.assigned_to, t.status))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page.apply(tasks))
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        expected_assignee: Option<UserId>,
    ) -> StoreResult<Task> {
        let mut map = self.write()?;
        let current = map.tasks.get(&id).ok_or(StoreError::NotFound)?;
        if expected_assignee.is_some_and(|a| current.assigned_to != Some(a)) {
            return Err(StoreError::AssigneeChanged);
        }

        let new_project = patch.project_id.filter(|p| *p != current.project_id);
        let new_assignee = patch.assigned_to.filter(|a| Some(*a) != current.assigned_to);

        let mut updated = current.clone();
        updated.apply(patch, Utc::now())?;
        map.check_task_refs(new_project, new_assignee)?;

        map.tasks.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        self.write()?
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
