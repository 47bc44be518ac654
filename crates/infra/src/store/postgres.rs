//! Postgres-backed store.
//!
//! Queries are checked at runtime (no compile-time database needed). Roles and
//! task statuses are stored as their wire labels in TEXT columns.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use taskboard_auth::{Role, TaskScope, UserScope};
use taskboard_core::{
    DomainError, Page, ProjectId, ProjectPatch, TaskId, TaskPatch, TaskStatus, UserId,
};

use super::{ProjectRepository, StoreError, StoreResult, TaskRepository, UserRepository};
use crate::records::{NewProject, NewTask, NewUser, Project, Task, User, normalize_email};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        name          TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT,
        created_by  UUID NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id          UUID PRIMARY KEY,
        title       TEXT NOT NULL,
        description TEXT,
        status      TEXT NOT NULL,
        assigned_to UUID,
        project_id  UUID NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tasks_assigned_to_idx ON tasks (assigned_to)",
    "CREATE INDEX IF NOT EXISTS tasks_created_at_idx ON tasks (created_at, id)",
];

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";
const PROJECT_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, title, description, status, assigned_to, project_id, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict("email is already registered".to_string());
            }
        }
        StoreError::Backend(err.to_string())
    }
}

fn corrupt(err: DomainError) -> StoreError {
    StoreError::backend(format!("corrupt row: {err}"))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>().map_err(corrupt)?,
        created_at: row.try_get("created_at")?,
    })
}

fn project_from_row(row: &PgRow) -> StoreResult<Project> {
    Ok(Project {
        id: ProjectId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> StoreResult<Task> {
    let status: String = row.try_get("status")?;
    let assigned_to: Option<Uuid> = row.try_get("assigned_to")?;
    Ok(Task {
        id: TaskId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: status.parse::<TaskStatus>().map_err(corrupt)?,
        assigned_to: assigned_to.map(UserId::from_uuid),
        project_id: ProjectId::from_uuid(row.try_get("project_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Postgres-backed store for identities, projects and tasks.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema is up to date");
        Ok(())
    }

    async fn project_exists<'e, E>(executor: E, id: ProjectId) -> StoreResult<bool>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query("SELECT 1 FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }

    async fn user_exists<'e, E>(executor: E, id: UserId) -> StoreResult<bool>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()?;
        let user = new.into_record(Utc::now());

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user.id, "user inserted");
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_users(&self, scope: &UserScope) -> StoreResult<Vec<User>> {
        let rows = match scope {
            UserScope::ExcludingRoles(excluded) => {
                let excluded: Vec<String> = excluded.iter().map(|r| r.as_str().to_string()).collect();
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE NOT (role = ANY($1))
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(excluded)
                .fetch_all(&self.pool)
                .await?
            }
            UserScope::OnlySelf(id) => {
                sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(id.as_uuid())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl ProjectRepository for PostgresStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        new.validate()?;
        let project = new.into_record(Utc::now());

        sqlx::query(
            "INSERT INTO projects (id, name, description, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.created_by.as_uuid())
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(project)
    }

    async fn find_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(project_from_row).transpose()
    }

    async fn find_projects(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(project_from_row).collect()
    }

    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             ORDER BY created_at, id
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(project_from_row).collect()
    }

    async fn update_project(&self, id: ProjectId, patch: ProjectPatch) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let mut project = match row {
            Some(row) => project_from_row(&row)?,
            None => return Err(StoreError::NotFound),
        };

        project.apply(patch, Utc::now())?;

        sqlx::query(
            "UPDATE projects SET name = $2, description = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(project)
    }

    async fn delete_project(&self, id: ProjectId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PostgresStore {
    async fn create_task(&self, new: NewTask) -> StoreResult<Task> {
        new.validate()?;
        let mut tx = self.pool.begin().await?;

        if !Self::project_exists(&mut *tx, new.project_id).await? {
            return Err(StoreError::validation(format!(
                "project {} does not exist",
                new.project_id
            )));
        }
        if let Some(user_id) = new.assigned_to {
            if !Self::user_exists(&mut *tx, user_id).await? {
                return Err(StoreError::validation(format!("user {user_id} does not exist")));
            }
        }

        let task = new.into_record(Utc::now());
        sqlx::query(
            "INSERT INTO tasks (id, title, description, status, assigned_to, project_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(task.id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.status.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.project_id.as_uuid())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, scope: &TaskScope, page: Page) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR assigned_to = $2)
             ORDER BY created_at, id
             LIMIT $3 OFFSET $4"
        ))
        .bind(scope.status().map(|s| s.as_str()))
        .bind(scope.assigned_to().map(Uuid::from))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
        expected_assignee: Option<UserId>,
    ) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        let current = match row {
            Some(row) => task_from_row(&row)?,
            None => return Err(StoreError::NotFound),
        };
        if expected_assignee.is_some_and(|a| current.assigned_to != Some(a)) {
            return Err(StoreError::AssigneeChanged);
        }

        let new_project = patch.project_id.filter(|p| *p != current.project_id);
        let new_assignee = patch.assigned_to.filter(|a| Some(*a) != current.assigned_to);

        let mut task = current;
        task.apply(patch, Utc::now())?;

        if let Some(project_id) = new_project {
            if !Self::project_exists(&mut *tx, project_id).await? {
                return Err(StoreError::validation(format!("project {project_id} does not exist")));
            }
        }
        if let Some(user_id) = new_assignee {
            if !Self::user_exists(&mut *tx, user_id).await? {
                return Err(StoreError::validation(format!("user {user_id} does not exist")));
            }
        }

        sqlx::query(
            "UPDATE tasks
             SET title = $2, description = $3, status = $4, assigned_to = $5,
                 project_id = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.status.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.project_id.as_uuid())
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
