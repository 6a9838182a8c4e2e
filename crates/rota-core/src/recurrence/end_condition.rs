use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interval::{compute_interval, PeriodUnit};
use super::StopReason;
use crate::error::CoreError;

/// How a plan terminates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EndCondition {
    Never,
    AfterCount(u32),
    ByDate(DateTime<Utc>),
}

impl EndCondition {
    /// Returns why an activation at `next` must not be produced, given the
    /// number of activations already produced.
    ///
    /// Shared by the activation evaluator and the executor so the two agree
    /// on every boundary. The end date itself is still admitted.
    #[inline]
    pub fn blocks(&self, repetitions_counter: u32, next: DateTime<Utc>) -> Option<StopReason> {
        match self {
            EndCondition::Never => None,
            EndCondition::AfterCount(amount) if repetitions_counter >= *amount => Some(StopReason::Exhausted),
            EndCondition::AfterCount(_) => None,
            EndCondition::ByDate(end_date) if next > *end_date => Some(StopReason::EndDateReached),
            EndCondition::ByDate(_) => None,
        }
    }
}

impl std::fmt::Display for EndCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndCondition::Never => write!(f, "never"),
            EndCondition::AfterCount(amount) => write!(f, "after {} repetitions", amount),
            EndCondition::ByDate(date) => write!(f, "by {}", date.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Classifies a plan's termination mode from the user's inputs.
///
/// When both an end date and a repetitions amount are given, whichever
/// boundary is reached first wins; reaching both at the same instant
/// resolves to [`EndCondition::ByDate`].
pub fn resolve_end_condition(
    start_date: DateTime<Utc>,
    period_unit: PeriodUnit,
    period_multiplier: i64,
    end_date: Option<DateTime<Utc>>,
    repetitions_amount: Option<u32>,
) -> Result<EndCondition, CoreError> {
    let interval = compute_interval(period_unit, period_multiplier)?;

    if repetitions_amount == Some(0) {
        return Err(CoreError::InvalidEndCondition(
            "repetitions amount must be positive".to_string(),
        ));
    }
    if let Some(end_date) = end_date {
        if end_date <= start_date {
            return Err(CoreError::InvalidEndCondition(format!(
                "end date {} is not after start date {}",
                end_date.format("%Y-%m-%d %H:%M"),
                start_date.format("%Y-%m-%d %H:%M")
            )));
        }
    }

    let condition = match (end_date, repetitions_amount) {
        (None, None) => EndCondition::Never,
        (None, Some(amount)) => EndCondition::AfterCount(amount),
        (Some(end_date), None) => EndCondition::ByDate(end_date),
        (Some(end_date), Some(amount)) => {
            let projected = interval
                .times(amount)
                .and_then(|total| total.add_to(start_date));
            match projected {
                Some(projected) if projected < end_date => EndCondition::AfterCount(amount),
                _ => EndCondition::ByDate(end_date),
            }
        }
    };

    Ok(condition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_neither_supplied_is_never() {
        let condition = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 1, None, None).unwrap();
        assert_eq!(condition, EndCondition::Never);
    }

    #[test]
    fn test_only_repetitions() {
        let condition = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 1, None, Some(4)).unwrap();
        assert_eq!(condition, EndCondition::AfterCount(4));
    }

    #[test]
    fn test_only_end_date() {
        let end = day(2024, 2, 1);
        let condition = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 1, Some(end), None).unwrap();
        assert_eq!(condition, EndCondition::ByDate(end));
    }

    #[rstest]
    // 10 daily repetitions from Jan 1 land exactly on Jan 11: the date wins the tie.
    #[case(day(2024, 1, 11), false)]
    #[case(day(2024, 1, 12), true)]
    #[case(day(2024, 1, 5), false)]
    fn test_both_supplied_tie_break(#[case] end: DateTime<Utc>, #[case] count_first: bool) {
        let condition = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 1, Some(end), Some(10)).unwrap();
        if count_first {
            assert_eq!(condition, EndCondition::AfterCount(10));
        } else {
            assert_eq!(condition, EndCondition::ByDate(end));
        }
    }

    #[test]
    fn test_both_supplied_threads_the_period_through() {
        // Same inputs as the daily case but weekly: 10 weeks overshoot Jan 12.
        let end = day(2024, 1, 12);
        let condition = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Week, 1, Some(end), Some(10)).unwrap();
        assert_eq!(condition, EndCondition::ByDate(end));
    }

    #[test]
    fn test_both_supplied_monthly_projection_from_month_end() {
        // Jan 31 + 2 months is Mar 31 (clamped once), which ties with the end date.
        let start = day(2024, 1, 31);
        let tie = resolve_end_condition(start, PeriodUnit::Month, 1, Some(day(2024, 3, 31)), Some(2)).unwrap();
        assert!(matches!(tie, EndCondition::ByDate(_)));

        let later = resolve_end_condition(start, PeriodUnit::Month, 1, Some(day(2024, 4, 1)), Some(2)).unwrap();
        assert_eq!(later, EndCondition::AfterCount(2));
    }

    #[test]
    fn test_invalid_period_fails_first() {
        let result = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 0, Some(day(2024, 2, 1)), Some(3));
        assert!(matches!(result, Err(CoreError::InvalidPeriod(_))));
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let result = resolve_end_condition(day(2024, 1, 1), PeriodUnit::Day, 1, None, Some(0));
        assert!(matches!(result, Err(CoreError::InvalidEndCondition(_))));
    }

    #[test]
    fn test_end_date_before_start_rejected() {
        let result = resolve_end_condition(day(2024, 1, 10), PeriodUnit::Day, 1, Some(day(2024, 1, 1)), None);
        assert!(matches!(result, Err(CoreError::InvalidEndCondition(_))));
    }

    #[rstest]
    #[case(EndCondition::Never, 100, None)]
    #[case(EndCondition::AfterCount(2), 1, None)]
    #[case(EndCondition::AfterCount(2), 2, Some(StopReason::Exhausted))]
    #[case(EndCondition::AfterCount(2), 3, Some(StopReason::Exhausted))]
    fn test_blocks_by_count(#[case] condition: EndCondition, #[case] counter: u32, #[case] expected: Option<StopReason>) {
        assert_eq!(condition.blocks(counter, day(2024, 1, 1)), expected);
    }

    #[test]
    fn test_blocks_by_date_admits_the_end_date() {
        let condition = EndCondition::ByDate(day(2024, 1, 10));
        assert_eq!(condition.blocks(0, day(2024, 1, 9)), None);
        assert_eq!(condition.blocks(0, day(2024, 1, 10)), None);
        assert_eq!(condition.blocks(0, day(2024, 1, 11)), Some(StopReason::EndDateReached));
    }
}
