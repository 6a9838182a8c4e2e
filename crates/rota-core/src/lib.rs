//! # Rota Core Library
//!
//! Shared task management with plan-based recurrence.
//!
//! Tasks belong to an owner, can be shared with other users, assigned,
//! nested one level at a time and grouped into per-user folders. A task can
//! carry a *plan*: every `period_multiplier × period_unit` a new task is
//! generated from it, until an optional end condition (a number of
//! repetitions or an end date) is met.
//!
//! Plans are not driven by a background timer. A scheduler tick catches every
//! plan of a user up to "now", emitting one task per missed period, and
//! commits each plan's batch atomically.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Stored rows and transfer objects
//! - [`repository`]: Data access layer with access control
//! - [`recurrence`]: Interval arithmetic, end conditions and the scheduler
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use rota_core::{
//!     db,
//!     models::{NewPlanData, NewTaskData},
//!     recurrence::{PeriodUnit, Scheduler, SchedulerConfig},
//!     repository::{PlanRepository, SqliteRepository, TaskRepository},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rota_core::error::CoreError> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!
//!     let task = repo
//!         .add_task("alice", NewTaskData {
//!             name: "Water the plants".to_string(),
//!             start_date: Some(Utc::now()),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     repo.create_plan("alice", NewPlanData {
//!         task_id: task.id,
//!         period: PeriodUnit::Day,
//!         period_amount: 3,
//!         repetitions_amount: Some(10),
//!         end_date: None,
//!     })
//!     .await?;
//!
//!     let report = Scheduler::new(&repo, SchedulerConfig::default())
//!         .run("alice", Utc::now())
//!         .await?;
//!     println!("{} task(s) generated", report.tasks_generated);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod repository;
