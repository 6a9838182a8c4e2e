use crate::error::CoreError;
use crate::models::{Folder, Task};
use crate::repository::{short_id_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::FolderRepository for SqliteRepository {
    async fn create_folder(&self, user: &str, name: &str) -> Result<Folder, CoreError> {
        let name = validate_folder_name(name)?;
        let mut tx = self.pool().begin().await?;

        if Self::find_folder_by_name_in_transaction(&mut tx, user, name).await?.is_some() {
            return Err(CoreError::DuplicateRelation(format!("Folder '{}' already exists", name)));
        }

        let folder = sqlx::query_as(
            r#"INSERT INTO folders (id, owner, name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner, name, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user, name, "folder created");
        Ok(folder)
    }

    async fn find_folder(&self, user: &str, id: Uuid) -> Result<Folder, CoreError> {
        let folder: Option<Folder> = sqlx::query_as("SELECT * FROM folders WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(user)
            .fetch_optional(self.pool())
            .await?;
        folder.ok_or_else(|| folder_not_found(id))
    }

    async fn find_folder_by_name(&self, user: &str, name: &str) -> Result<Option<Folder>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let folder = Self::find_folder_by_name_in_transaction(&mut tx, user, name.trim()).await?;
        tx.commit().await?;
        Ok(folder)
    }

    async fn find_folders_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Folder>, CoreError> {
        let folders = sqlx::query_as(
            "SELECT * FROM folders WHERE owner = $1 AND hex(id) LIKE $2 ORDER BY name",
        )
        .bind(user)
        .bind(short_id_pattern(short_id))
        .fetch_all(self.pool())
        .await?;
        Ok(folders)
    }

    async fn list_folders(&self, user: &str) -> Result<Vec<Folder>, CoreError> {
        let folders = sqlx::query_as("SELECT * FROM folders WHERE owner = $1 ORDER BY name")
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(folders)
    }

    async fn rename_folder(&self, user: &str, id: Uuid, name: &str) -> Result<Folder, CoreError> {
        let name = validate_folder_name(name)?;
        let mut tx = self.pool().begin().await?;

        if let Some(existing) = Self::find_folder_by_name_in_transaction(&mut tx, user, name).await? {
            if existing.id != id {
                return Err(CoreError::DuplicateRelation(format!("Folder '{}' already exists", name)));
            }
        }

        let folder: Folder = sqlx::query_as("UPDATE folders SET name = $1 WHERE id = $2 AND owner = $3 RETURNING *")
            .bind(name)
            .bind(id)
            .bind(user)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| folder_not_found(id))?;

        tx.commit().await?;
        tracing::info!(folder_id = %id, user, name, "folder renamed");
        Ok(folder)
    }

    async fn delete_folder(&self, user: &str, id: Uuid) -> Result<(), CoreError> {
        // Memberships go with the folder, the tasks themselves stay.
        let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(user)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(folder_not_found(id));
        }
        tracing::info!(folder_id = %id, user, "folder deleted");
        Ok(())
    }

    async fn add_task_to_folder(&self, user: &str, folder_id: Uuid, task_id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let folder = Self::owned_folder_in_transaction(&mut tx, user, folder_id).await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, task_id).await?;

        let existing: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM folder_tasks WHERE folder_id = $1 AND task_id = $2")
                .bind(folder_id)
                .bind(task_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(CoreError::DuplicateRelation(format!(
                "Task '{}' is already in folder '{}'",
                task.name, folder.name
            )));
        }

        sqlx::query("INSERT INTO folder_tasks (folder_id, task_id) VALUES ($1, $2)")
            .bind(folder_id)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%folder_id, %task_id, user, "task added to folder");
        Ok(())
    }

    async fn remove_task_from_folder(&self, user: &str, folder_id: Uuid, task_id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let folder = Self::owned_folder_in_transaction(&mut tx, user, folder_id).await?;

        let result = sqlx::query("DELETE FROM folder_tasks WHERE folder_id = $1 AND task_id = $2")
            .bind(folder_id)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Task {} is not in folder '{}'",
                task_id, folder.name
            )));
        }

        tx.commit().await?;
        tracing::info!(%folder_id, %task_id, user, "task removed from folder");
        Ok(())
    }

    async fn folder_tasks(&self, user: &str, folder_id: Uuid) -> Result<Vec<Task>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::owned_folder_in_transaction(&mut tx, user, folder_id).await?;

        // Tasks unshared from the user since they were filed are hidden.
        let tasks = sqlx::query_as(
            r#"SELECT t.* FROM tasks t
            INNER JOIN folder_tasks ft ON ft.task_id = t.id
            WHERE ft.folder_id = $1
              AND (t.owner = $2 OR EXISTS (
                  SELECT 1 FROM task_editors e WHERE e.task_id = t.id AND e.user_id = $2))
            ORDER BY t.created_at, t.id"#,
        )
        .bind(folder_id)
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tasks)
    }
}

impl SqliteRepository {
    async fn find_folder_by_name_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        user: &str,
        name: &str,
    ) -> Result<Option<Folder>, CoreError> {
        let folder = sqlx::query_as("SELECT * FROM folders WHERE owner = $1 AND name = $2")
            .bind(user)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(folder)
    }

    async fn owned_folder_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        user: &str,
        id: Uuid,
    ) -> Result<Folder, CoreError> {
        let folder: Option<Folder> = sqlx::query_as("SELECT * FROM folders WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(user)
            .fetch_optional(&mut **tx)
            .await?;
        folder.ok_or_else(|| folder_not_found(id))
    }
}

fn folder_not_found(id: Uuid) -> CoreError {
    CoreError::NotFound(format!("Folder with id {} not found", id))
}

fn validate_folder_name(name: &str) -> Result<&str, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidInput("Folder name cannot be empty".to_string()));
    }
    Ok(name)
}
