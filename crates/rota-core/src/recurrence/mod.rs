//! Plan-based recurrence.
//!
//! A plan regenerates its template task every `period_multiplier ×
//! period_unit`, starting from the template's start date. Nothing runs in
//! the background: each call to [`Scheduler::run`] is one tick that catches
//! every plan of a user up to "now", however many periods were missed.
//!
//! - [`interval`]: period unit and multiplier to a calendar-aware step
//! - [`end_condition`]: never / after N repetitions / by a date
//! - [`activation`]: is a plan due at all
//! - [`executor`]: the catch-up loop producing generated tasks
//! - [`scheduler`]: the per-user batch over a [`SchedulerStore`]

use serde::Serialize;

pub mod activation;
pub mod end_condition;
pub mod executor;
pub mod interval;
pub mod rule;
pub mod scheduler;

pub use activation::is_active;
pub use end_condition::{resolve_end_condition, EndCondition};
pub use executor::{execute, ActivationBatch};
pub use interval::{compute_interval, Interval, PeriodUnit};
pub use rule::{GeneratedTask, RecurrenceRule};
pub use scheduler::{RuleFailure, Scheduler, SchedulerConfig, SchedulerReport, SchedulerStore};

/// Why a catch-up pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The next activation is not before `now`
    CaughtUp,
    /// The repetitions amount has been produced
    Exhausted,
    /// The next activation falls after the end date
    EndDateReached,
    /// The per-pass activation limit was hit
    LimitReached,
    /// The next activation is not representable
    OutOfRange,
}

impl StopReason {
    /// Whether the plan can never produce another activation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StopReason::Exhausted | StopReason::EndDateReached | StopReason::OutOfRange)
    }
}
