use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Instant;
use uuid::Uuid;

use super::activation::is_active;
use super::executor::{execute, ActivationBatch};
use super::rule::RecurrenceRule;
use crate::error::{CoreError, ErrorKind};
use crate::models::{Plan, TaskSnapshot};

/// Storage the scheduler reads plans from and commits batches to.
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    /// Plans owned by `user`, as stored.
    async fn list_plans_for_user(&self, user: &str) -> Result<Vec<Plan>, CoreError>;

    async fn load_template_task(&self, task_id: Uuid) -> Result<TaskSnapshot, CoreError>;

    /// Creates every task of `batch` with its access relations and persists
    /// the advanced state of `rule`, all or nothing. Returns the new task ids.
    async fn commit_activations(
        &self,
        rule: &RecurrenceRule,
        batch: &ActivationBatch,
    ) -> Result<Vec<Uuid>, CoreError>;
}

/// Scheduler policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Caps the activations one plan may emit per tick; unbounded when absent
    #[serde(default)]
    pub max_activations_per_rule: Option<NonZeroUsize>,
}

/// A plan that could not be processed during a tick.
#[derive(Debug, Clone, Serialize)]
pub struct RuleFailure {
    pub rule_id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one scheduler tick for one user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerReport {
    /// Plans evaluated without error
    pub rules_processed: usize,
    /// Plans that produced at least one task
    pub rules_activated: usize,
    pub tasks_generated: usize,
    pub generated_task_ids: Vec<Uuid>,
    pub errors: Vec<RuleFailure>,
    pub duration_ms: u64,
}

impl SchedulerReport {
    fn record_failure(&mut self, rule_id: Uuid, err: CoreError) {
        tracing::warn!(%rule_id, error = %err, "plan skipped");
        self.errors.push(RuleFailure {
            rule_id,
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

/// Runs plans against a [`SchedulerStore`].
pub struct Scheduler<'a, S: SchedulerStore + ?Sized> {
    store: &'a S,
    config: SchedulerConfig,
}

impl<'a, S: SchedulerStore + ?Sized> Scheduler<'a, S> {
    pub fn new(store: &'a S, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: &'a S) -> Self {
        Self::new(store, SchedulerConfig::default())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One tick: catches every plan owned by `user` up to `now`.
    ///
    /// Only a failure to list the plans is returned as an error; anything
    /// that goes wrong with a single plan is recorded in the report and the
    /// remaining plans still run.
    pub async fn run(&self, user: &str, now: DateTime<Utc>) -> Result<SchedulerReport, CoreError> {
        let started = Instant::now();
        let mut report = SchedulerReport::default();

        let plans = self.store.list_plans_for_user(user).await?;
        tracing::debug!(user, plans = plans.len(), %now, "scheduler tick");

        for plan in plans {
            match self.run_plan(&plan, now).await {
                Ok(Some(ids)) => {
                    report.rules_processed += 1;
                    report.rules_activated += 1;
                    report.tasks_generated += ids.len();
                    report.generated_task_ids.extend(ids);
                }
                Ok(None) => report.rules_processed += 1,
                Err(err) => report.record_failure(plan.id, err),
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            user,
            processed = report.rules_processed,
            generated = report.tasks_generated,
            failed = report.errors.len(),
            "scheduler tick finished"
        );
        Ok(report)
    }

    /// Returns the ids of the tasks created for `plan`, `None` when it was not due.
    async fn run_plan(&self, plan: &Plan, now: DateTime<Utc>) -> Result<Option<Vec<Uuid>>, CoreError> {
        let rule = plan.to_rule()?;
        if !is_active(&rule, now)? {
            return Ok(None);
        }

        let template = self.store.load_template_task(rule.template_task_id).await?;

        // The stored rule only moves once the commit went through.
        let mut advanced = rule.clone();
        let batch = execute(&mut advanced, now, &template, self.config.max_activations_per_rule)?;
        if batch.is_empty() {
            return Ok(None);
        }

        let ids = self.store.commit_activations(&advanced, &batch).await?;
        tracing::debug!(
            plan_id = %rule.id,
            created = ids.len(),
            last_activated = %advanced.last_activated,
            stop = ?batch.stop,
            "plan executed"
        );
        Ok(Some(ids))
    }
}
