use crate::error::CoreError;
use crate::models::{merge_plan_update, EndType, NewPlanData, Plan, Task, UpdatePlanData};
use crate::recurrence::resolve_end_condition;
use crate::repository::{short_id_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::PlanRepository for SqliteRepository {
    async fn create_plan(&self, user: &str, data: NewPlanData) -> Result<Plan, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = Self::ensure_access_in_transaction(&mut tx, user, data.task_id).await?;

        if Self::plan_id_for_task_in_transaction(&mut tx, task.id).await?.is_some() {
            return Err(CoreError::DuplicateRelation(format!(
                "Task '{}' already has a plan",
                task.name
            )));
        }

        let subtasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE parent_task_id = $1")
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await?;
        if subtasks > 0 {
            return Err(CoreError::InvalidInput(format!(
                "Task '{}' has {} subtask(s) and cannot get a plan",
                task.name, subtasks
            )));
        }

        let start_date = task.start_date.ok_or_else(|| {
            CoreError::InvalidInput(format!("Task '{}' needs a start date to get a plan", task.name))
        })?;

        let end_condition = resolve_end_condition(
            start_date,
            data.period,
            data.period_amount,
            data.end_date,
            data.repetitions_amount,
        )?;

        let now = Utc::now();
        let plan: Plan = sqlx::query_as(
            r#"INSERT INTO plans (id, owner, task_id, period, period_amount, end_type, repetitions_amount, repetitions_counter, start_date, end_date, last_activated, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $8, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user)
        .bind(task.id)
        .bind(data.period.as_str())
        .bind(data.period_amount)
        .bind(EndType::from(&end_condition).as_str())
        .bind(data.repetitions_amount.map(i64::from))
        .bind(start_date)
        .bind(data.end_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(plan_id = %plan.id, task_id = %task.id, user, %end_condition, "plan created");
        Ok(plan)
    }

    async fn find_plan(&self, user: &str, id: Uuid) -> Result<Plan, CoreError> {
        let mut tx = self.pool().begin().await?;
        let plan = Self::accessible_plan_in_transaction(&mut tx, user, id).await?;
        tx.commit().await?;
        Ok(plan)
    }

    async fn find_plans_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Plan>, CoreError> {
        let plans = sqlx::query_as(
            r#"SELECT p.* FROM plans p
            INNER JOIN task_editors e ON e.task_id = p.task_id
            WHERE e.user_id = $1 AND hex(p.id) LIKE $2
            ORDER BY p.created_at, p.id"#,
        )
        .bind(user)
        .bind(short_id_pattern(short_id))
        .fetch_all(self.pool())
        .await?;
        Ok(plans)
    }

    async fn list_plans(&self, user: &str) -> Result<Vec<Plan>, CoreError> {
        let plans = sqlx::query_as(
            r#"SELECT p.* FROM plans p
            INNER JOIN task_editors e ON e.task_id = p.task_id
            WHERE e.user_id = $1
            ORDER BY p.created_at, p.id"#,
        )
        .bind(user)
        .fetch_all(self.pool())
        .await?;
        Ok(plans)
    }

    async fn list_own_plans(&self, user: &str) -> Result<Vec<Plan>, CoreError> {
        let plans = sqlx::query_as("SELECT * FROM plans WHERE owner = $1 ORDER BY created_at, id")
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(plans)
    }

    async fn update_plan(&self, user: &str, id: Uuid, data: UpdatePlanData) -> Result<Plan, CoreError> {
        let mut tx = self.pool().begin().await?;
        let current = Self::accessible_plan_in_transaction(&mut tx, user, id).await?;

        let (period, period_amount, repetitions_amount, end_date, end_condition) =
            merge_plan_update(&current, &data)?;

        let plan: Plan = sqlx::query_as(
            r#"UPDATE plans
            SET period = $1, period_amount = $2, end_type = $3, repetitions_amount = $4, end_date = $5, updated_at = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(period.as_str())
        .bind(period_amount)
        .bind(EndType::from(&end_condition).as_str())
        .bind(repetitions_amount)
        .bind(end_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(plan_id = %id, user, %end_condition, "plan updated");
        Ok(plan)
    }

    async fn delete_plan(&self, user: &str, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::accessible_plan_in_transaction(&mut tx, user, id).await?;

        // Tasks generated so far are kept.
        sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(plan_id = %id, user, "plan deleted");
        Ok(())
    }

    async fn generated_tasks(&self, user: &str, plan_id: Uuid) -> Result<Vec<Task>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let plan = Self::accessible_plan_in_transaction(&mut tx, user, plan_id).await?;

        let tasks = sqlx::query_as(
            r#"SELECT t.* FROM tasks t
            INNER JOIN task_editors e ON e.task_id = t.id
            WHERE t.parent_task_id = $1 AND e.user_id = $2
            ORDER BY t.start_date, t.created_at, t.id"#,
        )
        .bind(plan.task_id)
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tasks)
    }
}

impl SqliteRepository {
    /// Loads a plan whose template the user can access.
    async fn accessible_plan_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        user: &str,
        id: Uuid,
    ) -> Result<Plan, CoreError> {
        let plan: Plan = sqlx::query_as("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Plan with id {} not found", id)))?;

        Self::ensure_access_in_transaction(tx, user, plan.task_id).await?;
        Ok(plan)
    }
}
