use chrono::{DateTime, Utc};

use super::rule::RecurrenceRule;
use crate::error::CoreError;

/// Whether `rule` has at least one unprocessed activation at `now`.
///
/// An activation falling exactly on `now` is not due yet, so a tick on the
/// boundary never fires twice.
pub fn is_active(rule: &RecurrenceRule, now: DateTime<Utc>) -> Result<bool, CoreError> {
    let Some(next) = rule.next_activation()? else {
        return Ok(false);
    };

    Ok(next < now && rule.end_condition.blocks(rule.repetitions_counter, next).is_none())
}
