/**
 * Project/Task Directory
 *
 * Existence and access checks for the subjects a client asks to subscribe to.
 * The collaboration core never reads project or task rows itself; it only asks
 * "may this user see project/task N?".
 *
 * Two adapters are provided:
 * - `PgDirectory` - queries the application's Postgres schema
 * - `InMemoryDirectory` - fixed id sets (or allow-all) for tests and local runs
 */

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::shared::model::{ProjectId, TaskId, UserId};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Existence/access collaborator consulted before subscribing
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn project_exists(&self, project_id: ProjectId, user_id: UserId) -> Result<bool, DirectoryError>;

    async fn task_exists(&self, task_id: TaskId, user_id: UserId) -> Result<bool, DirectoryError>;
}

/// Postgres-backed directory.
///
/// A user can see a project they own or are a member of, and any task that
/// belongs to such a project.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROJECT_ACCESS_SQL: &str = r#"
SELECT EXISTS (
    SELECT 1 FROM projects p
    WHERE p.id = $1
      AND (p.owner_id = $2
           OR EXISTS (SELECT 1 FROM project_members m
                      WHERE m.project_id = p.id AND m.user_id = $2))
)"#;

const TASK_ACCESS_SQL: &str = r#"
SELECT EXISTS (
    SELECT 1 FROM tasks t
    JOIN projects p ON p.id = t.project_id
    WHERE t.id = $1
      AND (p.owner_id = $2
           OR EXISTS (SELECT 1 FROM project_members m
                      WHERE m.project_id = p.id AND m.user_id = $2))
)"#;

#[async_trait]
impl ProjectDirectory for PgDirectory {
    async fn project_exists(&self, project_id: ProjectId, user_id: UserId) -> Result<bool, DirectoryError> {
        let exists = sqlx::query_scalar::<_, bool>(PROJECT_ACCESS_SQL)
            .bind(project_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn task_exists(&self, task_id: TaskId, user_id: UserId) -> Result<bool, DirectoryError> {
        let exists = sqlx::query_scalar::<_, bool>(TASK_ACCESS_SQL)
            .bind(task_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// In-memory directory with fixed project and task ids
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    allow_all: bool,
    projects: HashSet<ProjectId>,
    tasks: HashSet<TaskId>,
}

impl InMemoryDirectory {
    /// Directory that knows nothing until ids are added
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that answers yes to every lookup
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.projects.insert(project_id);
        self
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.tasks.insert(task_id);
        self
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryDirectory {
    async fn project_exists(&self, project_id: ProjectId, _user_id: UserId) -> Result<bool, DirectoryError> {
        Ok(self.allow_all || self.projects.contains(&project_id))
    }

    async fn task_exists(&self, task_id: TaskId, _user_id: UserId) -> Result<bool, DirectoryError> {
        Ok(self.allow_all || self.tasks.contains(&task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_directory() {
        let directory = InMemoryDirectory::new().with_project(1).with_task(7);
        assert!(directory.project_exists(1, 99).await.unwrap());
        assert!(!directory.project_exists(2, 99).await.unwrap());
        assert!(directory.task_exists(7, 99).await.unwrap());
        assert!(!directory.task_exists(8, 99).await.unwrap());
    }

    #[tokio::test]
    async fn test_allow_all() {
        let directory = InMemoryDirectory::allow_all();
        assert!(directory.project_exists(12345, 1).await.unwrap());
        assert!(directory.task_exists(54321, 1).await.unwrap());
    }
}
