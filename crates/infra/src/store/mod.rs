//! Credential store and resource repositories.
//!
//! Repositories receive requests that were already authorized and scoped by
//! the policy in `taskboard-auth`; they never re-check policy. They do own
//! validation and referential checks, which run before any mutation.

use async_trait::async_trait;
use thiserror::Error;

use taskboard_auth::{TaskScope, UserScope};
use taskboard_core::{DomainError, Page, ProjectId, ProjectPatch, TaskId, TaskPatch, UserId};

use crate::records::{NewProject, NewTask, NewUser, Project, Task, User};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("task is no longer assigned to the requesting identity")]
    AssigneeChanged,

    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => StoreError::Validation(msg),
            other => StoreError::Validation(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted identities (the credential store).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the (normalized) email is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;
    /// Newest first.
    async fn list_users(&self, scope: &UserScope) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<Project>>;
    async fn find_projects(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>>;
    /// Creation order, one page.
    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: ProjectId, patch: ProjectPatch) -> StoreResult<Project>;
    async fn delete_project(&self, id: ProjectId) -> StoreResult<()>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// The project must exist; the assignee, if any, must exist.
    async fn create_task(&self, new: NewTask) -> StoreResult<Task>;
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;
    /// Creation order, one page, narrowed by `scope`.
    async fn list_tasks(&self, scope: &TaskScope, page: Page) -> StoreResult<Vec<Task>>;
    /// Changed references are re-validated before the write. With
    /// `expected_assignee` set, the write only happens while the task is still
    /// assigned to that identity, checked in the same atomic step.
    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        expected_assignee: Option<UserId>,
    ) -> StoreResult<Task>;
    async fn delete_task(&self, id: TaskId) -> StoreResult<()>;
}

/// Everything the API needs from persistence.
pub trait Store: UserRepository + ProjectRepository + TaskRepository {}

impl<T> Store for T where T: UserRepository + ProjectRepository + TaskRepository {}
