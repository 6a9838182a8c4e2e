use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::recurrence::{resolve_end_condition, EndCondition, PeriodUnit, RecurrenceRule};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Todo,
    InWork,
    Done,
    Archived,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(TaskStatus::Created),
            "todo" => Ok(TaskStatus::Todo),
            "inwork" | "in_work" | "in-work" | "in work" => Ok(TaskStatus::InWork),
            "done" => Ok(TaskStatus::Done),
            "archived" => Ok(TaskStatus::Archived),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Created => write!(f, "Created"),
            TaskStatus::Todo => write!(f, "Todo"),
            TaskStatus::InWork => write!(f, "In work"),
            TaskStatus::Done => write!(f, "Done"),
            TaskStatus::Archived => write!(f, "Archived"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::None => write!(f, "None"),
            TaskPriority::Low => write!(f, "Low"),
            TaskPriority::Medium => write!(f, "Medium"),
            TaskPriority::High => write!(f, "High"),
        }
    }
}

impl From<ParseTaskStatusError> for CoreError {
    fn from(err: ParseTaskStatusError) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}

impl From<ParseTaskPriorityError> for CoreError {
    fn from(err: ParseTaskPriorityError) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub owner: String,
    pub assigned: Option<String>,
    /// Parent task; for plan-generated instances this is the plan's template
    pub parent_task_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            owner: String::new(),
            assigned: None,
            parent_task_id: None,
            name: String::new(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    /// Defaults to the creation time when absent
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub parent_task_id: Option<Uuid>,
    pub assigned: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskData {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}

/// The parts of a template task a plan copies into every generated task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub assigned: Option<String>,
    /// Every user holding an access relation on the template
    pub shared_with: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Plans
// ============================================================================

/// Resolved termination mode as persisted in the `end_type` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndType {
    Never,
    Amount,
    Date,
}

impl EndType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndType::Never => "never",
            EndType::Amount => "amount",
            EndType::Date => "date",
        }
    }
}

impl From<&EndCondition> for EndType {
    fn from(condition: &EndCondition) -> Self {
        match condition {
            EndCondition::Never => EndType::Never,
            EndCondition::AfterCount(_) => EndType::Amount,
            EndCondition::ByDate(_) => EndType::Date,
        }
    }
}

impl FromStr for EndType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" => Ok(EndType::Never),
            "amount" => Ok(EndType::Amount),
            "date" => Ok(EndType::Date),
            _ => Err(CoreError::InvalidEndCondition(format!("unknown end type '{}'", s))),
        }
    }
}

/// A recurrence plan as stored.
///
/// Period and end type are kept as text so that a single malformed row is
/// reported against its own id instead of failing a whole listing; use
/// [`Plan::to_rule`] to get the typed [`RecurrenceRule`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub owner: String,
    pub task_id: Uuid,
    pub period: String,
    pub period_amount: i64,
    pub end_type: String,
    /// Repetitions requested by the user, kept even when the date wins
    pub repetitions_amount: Option<i64>,
    pub repetitions_counter: i64,
    pub start_date: DateTime<Utc>,
    /// End date requested by the user, kept even when the count wins
    pub end_date: Option<DateTime<Utc>>,
    pub last_activated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Closed parse of the stored row into the engine's rule type.
    pub fn to_rule(&self) -> Result<RecurrenceRule, CoreError> {
        let period_unit: PeriodUnit = self.period.parse()?;
        if self.period_amount <= 0 {
            return Err(CoreError::InvalidPeriod(format!(
                "period amount must be positive, got {}",
                self.period_amount
            )));
        }

        let end_condition = match self.end_type.parse::<EndType>()? {
            EndType::Never => EndCondition::Never,
            EndType::Amount => {
                let amount = self.repetitions_amount.ok_or_else(|| {
                    CoreError::InvalidEndCondition("end type 'amount' without repetitions amount".to_string())
                })?;
                let amount = u32::try_from(amount).map_err(|_| {
                    CoreError::InvalidEndCondition(format!("repetitions amount out of range: {}", amount))
                })?;
                EndCondition::AfterCount(amount)
            }
            EndType::Date => {
                let end_date = self.end_date.ok_or_else(|| {
                    CoreError::InvalidEndCondition("end type 'date' without end date".to_string())
                })?;
                EndCondition::ByDate(end_date)
            }
        };

        let repetitions_counter = u32::try_from(self.repetitions_counter).map_err(|_| {
            CoreError::InvalidEndCondition(format!(
                "repetitions counter out of range: {}",
                self.repetitions_counter
            ))
        })?;

        Ok(RecurrenceRule {
            id: self.id,
            owner: self.owner.clone(),
            template_task_id: self.task_id,
            period_unit,
            period_multiplier: self.period_amount,
            end_condition,
            repetitions_counter,
            start_date: self.start_date,
            last_activated: self.last_activated,
        })
    }
}

/// Data required to attach a plan to a task
#[derive(Debug, Clone)]
pub struct NewPlanData {
    pub task_id: Uuid,
    pub period: PeriodUnit,
    pub period_amount: i64,
    pub repetitions_amount: Option<u32>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Data for modifying an existing plan; absent fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct UpdatePlanData {
    pub period: Option<PeriodUnit>,
    pub period_amount: Option<i64>,
    pub repetitions_amount: Option<u32>,
    pub end_date: Option<DateTime<Utc>>,
}

/// The stored inputs of a plan merged with an update, re-resolved.
pub(crate) fn merge_plan_update(
    plan: &Plan,
    update: &UpdatePlanData,
) -> Result<(PeriodUnit, i64, Option<i64>, Option<DateTime<Utc>>, EndCondition), CoreError> {
    let period = match update.period {
        Some(period) => period,
        None => plan.period.parse()?,
    };
    let period_amount = update.period_amount.unwrap_or(plan.period_amount);
    let repetitions_amount = match update.repetitions_amount {
        Some(amount) => Some(amount),
        None => plan
            .repetitions_amount
            .map(|amount| {
                u32::try_from(amount).map_err(|_| {
                    CoreError::InvalidEndCondition(format!("repetitions amount out of range: {}", amount))
                })
            })
            .transpose()?,
    };
    let end_date = update.end_date.or(plan.end_date);

    let end_condition = resolve_end_condition(
        plan.start_date,
        period,
        period_amount,
        end_date,
        repetitions_amount,
    )?;

    Ok((
        period,
        period_amount,
        repetitions_amount.map(i64::from),
        end_date,
        end_condition,
    ))
}
