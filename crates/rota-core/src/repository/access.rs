use crate::error::CoreError;
use crate::models::Task;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl super::AccessRepository for SqliteRepository {
    async fn user_can_access_task(&self, user: &str, task_id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn share_task(&self, user: &str, task_id: Uuid, target: &str) -> Result<(), CoreError> {
        let target = validate_user_name(target)?;
        let mut tx = self.pool().begin().await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;

        if Self::has_relation_in_transaction(&mut tx, task_id, target).await? {
            return Err(CoreError::DuplicateRelation(format!(
                "Task '{}' is already shared with '{}'",
                task.name, target
            )));
        }

        sqlx::query("INSERT INTO task_editors (task_id, user_id) VALUES ($1, $2)")
            .bind(task_id)
            .bind(target)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%task_id, user, target, "task shared");
        Ok(())
    }

    async fn unshare_task(&self, user: &str, task_id: Uuid, target: &str) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;

        if task.owner == target {
            return Err(CoreError::InvalidInput(format!(
                "Cannot unshare task '{}' from its owner",
                task.name
            )));
        }

        let result = sqlx::query("DELETE FROM task_editors WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(target)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Task '{}' is not shared with '{}'",
                task.name, target
            )));
        }

        tx.commit().await?;
        tracing::info!(%task_id, user, target, "task unshared");
        Ok(())
    }

    async fn assign_user(&self, user: &str, task_id: Uuid, target: &str) -> Result<Task, CoreError> {
        let target = validate_user_name(target)?;
        let mut tx = self.pool().begin().await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;

        if task.assigned.as_deref() == Some(target) {
            return Err(CoreError::InvalidInput(format!(
                "'{}' is already assigned to task '{}'",
                target, task.name
            )));
        }

        let task: Task = sqlx::query_as(
            "UPDATE tasks SET assigned = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(target)
        .bind(Utc::now())
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        // The assignee needs a relation to see the task.
        sqlx::query("INSERT OR IGNORE INTO task_editors (task_id, user_id) VALUES ($1, $2)")
            .bind(task_id)
            .bind(target)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%task_id, user, target, "user assigned");
        Ok(task)
    }

    async fn task_editors(&self, user: &str, task_id: Uuid) -> Result<Vec<String>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;
        let editors = Self::task_editors_in_transaction(&mut tx, task_id).await?;
        tx.commit().await?;
        Ok(editors)
    }
}

impl SqliteRepository {
    pub(crate) async fn task_editors_in_transaction<'a>(
        tx: &mut sqlx::Transaction<'a, sqlx::Sqlite>,
        task_id: Uuid,
    ) -> Result<Vec<String>, CoreError> {
        let editors = sqlx::query_scalar("SELECT user_id FROM task_editors WHERE task_id = $1 ORDER BY user_id")
            .bind(task_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(editors)
    }
}

fn validate_user_name(name: &str) -> Result<&str, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidInput("User name cannot be empty".to_string()));
    }
    Ok(name)
}
