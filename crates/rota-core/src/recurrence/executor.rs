use chrono::{DateTime, Utc};
use serde::Serialize;
use std::num::NonZeroUsize;
use uuid::Uuid;

use super::rule::{GeneratedTask, RecurrenceRule};
use super::StopReason;
use crate::error::CoreError;
use crate::models::TaskSnapshot;

/// Everything one catch-up pass produced for a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationBatch {
    pub rule_id: Uuid,
    /// Cursor before the pass; storage uses it to detect concurrent advances
    pub previous_cursor: DateTime<Utc>,
    pub tasks: Vec<GeneratedTask>,
    pub stop: StopReason,
}

impl ActivationBatch {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Emits one task per due activation of `rule` up to (excluding) `now`.
///
/// Advances `rule.last_activated` and `rule.repetitions_counter` in place;
/// callers run this on a copy and only keep it once storage has committed
/// the returned batch. `limit` caps the activations emitted in one pass, the
/// remainder is picked up by the next pass.
pub fn execute(
    rule: &mut RecurrenceRule,
    now: DateTime<Utc>,
    template: &TaskSnapshot,
    limit: Option<NonZeroUsize>,
) -> Result<ActivationBatch, CoreError> {
    let interval = rule.interval()?;
    let previous_cursor = rule.last_activated;
    let mut tasks = Vec::new();

    let stop = loop {
        let Some(next) = interval.add_to(rule.last_activated) else {
            break StopReason::OutOfRange;
        };
        if next >= now {
            break StopReason::CaughtUp;
        }
        if let Some(reason) = rule.end_condition.blocks(rule.repetitions_counter, next) {
            break reason;
        }
        if limit.is_some_and(|limit| tasks.len() >= limit.get()) {
            break StopReason::LimitReached;
        }

        tasks.push(GeneratedTask::from_template(template, &rule.owner, next));
        rule.last_activated = next;
        rule.repetitions_counter += 1;
    };

    Ok(ActivationBatch {
        rule_id: rule.id,
        previous_cursor,
        tasks,
        stop,
    })
}
