use crate::error::CoreError;
use crate::models::{Plan, Task, TaskPriority, TaskSnapshot, TaskStatus};
use crate::recurrence::{ActivationBatch, RecurrenceRule, SchedulerStore};
use crate::repository::tasks::task_not_found;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl SchedulerStore for SqliteRepository {
    async fn list_plans_for_user(&self, user: &str) -> Result<Vec<Plan>, CoreError> {
        let plans = sqlx::query_as("SELECT * FROM plans WHERE owner = $1 ORDER BY created_at, id")
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(plans)
    }

    async fn load_template_task(&self, task_id: Uuid) -> Result<TaskSnapshot, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = Self::find_task_in_transaction(&mut tx, task_id)
            .await?
            .ok_or_else(|| task_not_found(task_id))?;
        let shared_with = Self::task_editors_in_transaction(&mut tx, task_id).await?;
        tx.commit().await?;

        Ok(TaskSnapshot {
            id: task.id,
            name: task.name,
            description: task.description,
            assigned: task.assigned,
            shared_with,
        })
    }

    async fn commit_activations(
        &self,
        rule: &RecurrenceRule,
        batch: &ActivationBatch,
    ) -> Result<Vec<Uuid>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        // Guarded by the cursor the batch was computed from, so two ticks
        // racing on the same plan cannot both generate the same activations.
        let result = sqlx::query(
            r#"UPDATE plans
            SET last_activated = $1, repetitions_counter = $2, updated_at = $3
            WHERE id = $4 AND last_activated = $5"#,
        )
        .bind(rule.last_activated)
        .bind(i64::from(rule.repetitions_counter))
        .bind(now)
        .bind(rule.id)
        .bind(batch.previous_cursor)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(format!(
                "Plan {} was advanced or removed concurrently",
                rule.id
            )));
        }

        let mut ids = Vec::with_capacity(batch.tasks.len());
        for generated in &batch.tasks {
            let task = Task {
                id: Uuid::now_v7(),
                owner: generated.owner.clone(),
                assigned: generated.assigned.clone(),
                parent_task_id: Some(generated.parent_task_id),
                name: generated.name.clone(),
                description: generated.description.clone(),
                priority: TaskPriority::Medium,
                status: TaskStatus::Todo,
                start_date: Some(generated.start_date),
                end_date: None,
                created_at: now,
                updated_at: now,
            };
            let editors: Vec<&str> = generated.editors.iter().map(String::as_str).collect();
            Self::insert_task_in_transaction(&mut tx, &task, &editors).await?;
            ids.push(task.id);
        }

        tx.commit().await?;
        tracing::info!(
            plan_id = %rule.id,
            created = ids.len(),
            repetitions = rule.repetitions_counter,
            "plan activations committed"
        );
        Ok(ids)
    }
}
