use crate::error::CoreError;
use crate::models::{NewTaskData, Task, TaskPriority, TaskStatus, UpdateTaskData};
use crate::repository::{short_id_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, user: &str, data: NewTaskData) -> Result<Task, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Task name cannot be empty".to_string()));
        }

        let mut tx = self.pool().begin().await?;

        if let Some(parent_id) = data.parent_task_id {
            Self::ensure_access_in_transaction(&mut tx, user, parent_id).await?;
            if Self::plan_id_for_task_in_transaction(&mut tx, parent_id).await?.is_some() {
                return Err(CoreError::InvalidInput(
                    "Cannot add a subtask to a task with a plan".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let start_date = data.start_date.unwrap_or(now);
        validate_dates(Some(start_date), data.end_date)?;

        let task = Task {
            id: Uuid::now_v7(),
            owner: user.to_string(),
            assigned: data.assigned,
            parent_task_id: data.parent_task_id,
            name: data.name,
            description: data.description,
            priority: data.priority.unwrap_or(TaskPriority::Medium),
            status: data.status.unwrap_or(TaskStatus::Todo),
            start_date: Some(start_date),
            end_date: data.end_date,
            created_at: now,
            updated_at: now,
        };

        let mut editors = vec![user];
        if let Some(assigned) = task.assigned.as_deref() {
            if assigned != user {
                editors.push(assigned);
            }
        }

        Self::insert_task_in_transaction(&mut tx, &task, &editors).await?;
        tx.commit().await?;

        tracing::info!(task_id = %task.id, user, "task created");
        Ok(task)
    }

    async fn find_task(&self, user: &str, id: Uuid) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, id).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn find_tasks_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            r#"SELECT t.* FROM tasks t
            INNER JOIN task_editors e ON e.task_id = t.id
            WHERE e.user_id = $1 AND hex(t.id) LIKE $2
            ORDER BY t.created_at, t.id"#,
        )
        .bind(user)
        .bind(short_id_pattern(short_id))
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn list_own_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as("SELECT * FROM tasks WHERE owner = $1 ORDER BY created_at, id")
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn list_assigned_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as("SELECT * FROM tasks WHERE assigned = $1 ORDER BY created_at, id")
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn list_available_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as(
            r#"SELECT t.* FROM tasks t
            INNER JOIN task_editors e ON e.task_id = t.id
            WHERE e.user_id = $1
            ORDER BY t.created_at, t.id"#,
        )
        .bind(user)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    async fn list_subtasks(&self, user: &str, id: Uuid) -> Result<Vec<Task>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, id).await?;

        let tasks = sqlx::query_as(
            "SELECT * FROM tasks WHERE parent_task_id = $1 ORDER BY start_date, created_at, id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tasks)
    }

    async fn update_task(&self, user: &str, id: Uuid, data: UpdateTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let current = Self::ensure_access_in_transaction(&mut tx, user, id).await?;

        if let Some(name) = &data.name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidInput("Task name cannot be empty".to_string()));
            }
        }
        validate_dates(
            data.start_date.unwrap_or(current.start_date),
            data.end_date.unwrap_or(current.end_date),
        )?;

        Self::update_task_fields(&mut tx, id, &data).await?;
        let updated = Self::find_task_in_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| task_not_found(id))?;

        tx.commit().await?;
        tracing::info!(task_id = %id, user, "task updated");
        Ok(updated)
    }

    async fn change_task_status(
        &self,
        user: &str,
        id: Uuid,
        status: TaskStatus,
        apply_on_subtasks: bool,
    ) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, id).await?;
        let now = Utc::now();

        let task: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET status = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let mut cascaded = 0;
        if status == TaskStatus::Done || apply_on_subtasks {
            cascaded = sqlx::query(
                r#"WITH RECURSIVE subtree (id) AS (
                    SELECT id FROM tasks WHERE parent_task_id = $1
                    UNION
                    SELECT t.id FROM tasks t JOIN subtree s ON t.parent_task_id = s.id
                )
                UPDATE tasks SET status = $2, updated_at = $3
                WHERE id IN (SELECT id FROM subtree)"#,
            )
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        tracing::info!(task_id = %id, user, %status, cascaded, "task status changed");
        Ok(task)
    }

    async fn attach_subtask(&self, user: &str, parent_id: Uuid, child_id: Uuid) -> Result<Task, CoreError> {
        if parent_id == child_id {
            return Err(CoreError::InvalidInput("A task cannot be its own subtask".to_string()));
        }

        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, parent_id).await?;
        let child = Self::ensure_access_in_transaction(&mut tx, user, child_id).await?;

        if Self::plan_id_for_task_in_transaction(&mut tx, parent_id).await?.is_some() {
            return Err(CoreError::InvalidInput(
                "Cannot add a subtask to a task with a plan".to_string(),
            ));
        }
        if child.parent_task_id.is_some() {
            return Err(CoreError::InvalidInput(format!(
                "Task '{}' is already a subtask of another task",
                child.name
            )));
        }
        if Self::is_ancestor_in_transaction(&mut tx, child_id, parent_id).await? {
            return Err(CoreError::InvalidInput(format!(
                "Task '{}' is an ancestor of the new parent",
                child.name
            )));
        }

        let task: Task = sqlx::query_as(
            "UPDATE tasks SET parent_task_id = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(parent_id)
        .bind(Utc::now())
        .bind(child_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(task_id = %child_id, %parent_id, user, "subtask attached");
        Ok(task)
    }

    async fn detach_subtask(&self, user: &str, child_id: Uuid) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let child = Self::ensure_access_in_transaction(&mut tx, user, child_id).await?;

        if child.parent_task_id.is_none() {
            return Err(CoreError::InvalidInput(format!(
                "Task '{}' is not a subtask",
                child.name
            )));
        }

        let task: Task = sqlx::query_as(
            "UPDATE tasks SET parent_task_id = NULL, updated_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(child_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(task_id = %child_id, user, "subtask detached");
        Ok(task)
    }

    async fn delete_task(&self, user: &str, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::ensure_access_in_transaction(&mut tx, user, id).await?;

        // The plan, editor relations and folder memberships go with the row;
        // subtasks are kept and lose their parent.
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(task_id = %id, user, "task deleted");
        Ok(())
    }
}

impl SqliteRepository {
    /// Find a task by ID within an existing transaction
    pub(crate) async fn find_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: Uuid,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(task)
    }

    /// Loads a task the user holds a relation on.
    pub(crate) async fn ensure_access_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        user: &str,
        id: Uuid,
    ) -> Result<Task, CoreError> {
        let task = Self::find_task_in_transaction(tx, id)
            .await?
            .ok_or_else(|| task_not_found(id))?;

        if task.owner != user && !Self::has_relation_in_transaction(tx, id, user).await? {
            return Err(CoreError::AccessDenied(format!(
                "User '{}' has no access to task '{}'",
                user, task.name
            )));
        }
        Ok(task)
    }

    pub(crate) async fn has_relation_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
        user: &str,
    ) -> Result<bool, CoreError> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM task_editors WHERE task_id = $1 AND user_id = $2")
                .bind(task_id)
                .bind(user)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(found.is_some())
    }

    pub(crate) async fn plan_id_for_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
    ) -> Result<Option<Uuid>, CoreError> {
        let plan_id = sqlx::query_scalar("SELECT id FROM plans WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(plan_id)
    }

    /// Inserts a task row together with its editor relations.
    pub(crate) async fn insert_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task: &Task,
        editors: &[&str],
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO tasks (id, owner, assigned, parent_task_id, name, description, priority, status, start_date, end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(task.id)
        .bind(&task.owner)
        .bind(&task.assigned)
        .bind(task.parent_task_id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.start_date)
        .bind(task.end_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut **tx)
        .await?;

        if !editors.is_empty() {
            let mut query_builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT OR IGNORE INTO task_editors (task_id, user_id) ");
            query_builder.push_values(editors.iter(), |mut b, editor| {
                b.push_bind(task.id).push_bind(*editor);
            });
            query_builder.build().execute(&mut **tx).await?;
        }

        Ok(())
    }

    /// Update task fields within an existing transaction
    pub(crate) async fn update_task_fields<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: Uuid,
        data: &UpdateTaskData,
    ) -> Result<(), CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut separated = qb.separated(", ");
        let mut updated = false;

        if let Some(name) = &data.name {
            separated.push("name = ").push_bind_unseparated(name.clone());
            updated = true;
        }
        if let Some(description) = &data.description {
            separated.push("description = ").push_bind_unseparated(description.clone());
            updated = true;
        }
        if let Some(priority) = data.priority {
            separated.push("priority = ").push_bind_unseparated(priority);
            updated = true;
        }
        if let Some(status) = data.status {
            separated.push("status = ").push_bind_unseparated(status);
            updated = true;
        }
        if let Some(start_date) = data.start_date {
            separated.push("start_date = ").push_bind_unseparated(start_date);
            updated = true;
        }
        if let Some(end_date) = data.end_date {
            separated.push("end_date = ").push_bind_unseparated(end_date);
            updated = true;
        }

        if updated {
            separated.push("updated_at = ").push_bind_unseparated(Utc::now());
            qb.push(" WHERE id = ");
            qb.push_bind(id);
            qb.build().execute(&mut **tx).await?;
        }

        Ok(())
    }

    /// Whether `ancestor` sits anywhere above `task` in the parent chain.
    pub(crate) async fn is_ancestor_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        ancestor: Uuid,
        task: Uuid,
    ) -> Result<bool, CoreError> {
        let found: Option<i32> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestors (id) AS (
                SELECT parent_task_id FROM tasks WHERE id = $1
                UNION
                SELECT t.parent_task_id
                FROM tasks t
                JOIN ancestors a ON t.id = a.id
            )
            SELECT 1 FROM ancestors WHERE id = $2 LIMIT 1;
            "#,
        )
        .bind(task)
        .bind(ancestor)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(found.is_some())
    }
}

pub(crate) fn task_not_found(id: Uuid) -> CoreError {
    CoreError::NotFound(format!("Task with id {} not found", id))
}

fn validate_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), CoreError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::InvalidInput(
                "End date cannot be before the start date".to_string(),
            ));
        }
    }
    Ok(())
}
