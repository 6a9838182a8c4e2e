use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::end_condition::EndCondition;
use super::interval::{compute_interval, Interval, PeriodUnit};
use crate::error::CoreError;
use crate::models::TaskSnapshot;

/// A plan as seen by the scheduling engine.
///
/// Only the executor moves `last_activated` and `repetitions_counter`, and
/// always on a copy that is handed back to storage for an atomic commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub owner: String,
    pub template_task_id: Uuid,
    pub period_unit: PeriodUnit,
    pub period_multiplier: i64,
    pub end_condition: EndCondition,
    pub repetitions_counter: u32,
    pub start_date: DateTime<Utc>,
    pub last_activated: DateTime<Utc>,
}

impl RecurrenceRule {
    /// A fresh rule whose cursor sits on its start date.
    pub fn new(
        owner: impl Into<String>,
        template_task_id: Uuid,
        period_unit: PeriodUnit,
        period_multiplier: i64,
        end_condition: EndCondition,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner: owner.into(),
            template_task_id,
            period_unit,
            period_multiplier,
            end_condition,
            repetitions_counter: 0,
            start_date,
            last_activated: start_date,
        }
    }

    #[inline]
    pub fn interval(&self) -> Result<Interval, CoreError> {
        compute_interval(self.period_unit, self.period_multiplier)
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        match self.end_condition {
            EndCondition::ByDate(end_date) => Some(end_date),
            _ => None,
        }
    }

    /// The activation following the cursor, `None` past chrono's range.
    pub fn next_activation(&self) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(self.interval()?.add_to(self.last_activated))
    }
}

/// A task to be created for one activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTask {
    pub owner: String,
    pub parent_task_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub assigned: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Users that get an access relation, owner first, without duplicates
    pub editors: Vec<String>,
}

impl GeneratedTask {
    pub fn from_template(template: &TaskSnapshot, acting_user: &str, start_date: DateTime<Utc>) -> Self {
        let mut seen = BTreeSet::new();
        let editors = std::iter::once(acting_user)
            .chain(template.assigned.as_deref())
            .chain(template.shared_with.iter().map(String::as_str))
            .filter(|user| seen.insert(*user))
            .map(str::to_string)
            .collect();

        Self {
            owner: acting_user.to_string(),
            parent_task_id: template.id,
            name: template.name.clone(),
            description: template.description.clone(),
            assigned: template.assigned.clone(),
            start_date,
            editors,
        }
    }
}
