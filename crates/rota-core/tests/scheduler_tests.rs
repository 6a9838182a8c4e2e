use chrono::{DateTime, TimeZone, Utc};
use rota_core::db::establish_connection;
use rota_core::error::{CoreError, ErrorKind};
use rota_core::models::*;
use rota_core::recurrence::{execute, PeriodUnit, Scheduler, SchedulerConfig, SchedulerStore};
use rota_core::repository::{AccessRepository, PlanRepository, SqliteRepository, TaskRepository};
use std::num::NonZeroUsize;
use tempfile::TempDir;

async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("scheduler.db");
    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");
    (SqliteRepository::new(pool), temp_dir)
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

async fn planned_task(
    repo: &SqliteRepository,
    user: &str,
    name: &str,
    period: PeriodUnit,
    period_amount: i64,
    repetitions_amount: Option<u32>,
    end_date: Option<DateTime<Utc>>,
) -> (Task, Plan) {
    let task = repo
        .add_task(
            user,
            NewTaskData {
                name: name.to_string(),
                description: Some("from template".to_string()),
                start_date: Some(day(2024, 1, 1)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create template task");
    let plan = repo
        .create_plan(
            user,
            NewPlanData {
                task_id: task.id,
                period,
                period_amount,
                repetitions_amount,
                end_date,
            },
        )
        .await
        .expect("Failed to create plan");
    (task, plan)
}

#[tokio::test]
async fn test_weekly_catch_up_end_to_end() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (template, plan) = planned_task(&repo, "alice", "Weekly review", PeriodUnit::Week, 1, None, None).await;

    let scheduler = Scheduler::new(&repo, SchedulerConfig::default());
    let report = scheduler.run("alice", day(2024, 1, 22)).await.unwrap();

    assert_eq!(report.rules_processed, 1);
    assert_eq!(report.rules_activated, 1);
    assert_eq!(report.tasks_generated, 2);
    assert!(report.errors.is_empty());

    let generated = repo.generated_tasks("alice", plan.id).await.unwrap();
    let starts: Vec<_> = generated.iter().map(|t| t.start_date).collect();
    assert_eq!(starts, vec![Some(day(2024, 1, 8)), Some(day(2024, 1, 15))]);
    for task in &generated {
        assert_eq!(task.parent_task_id, Some(template.id));
        assert_eq!(task.name, "Weekly review");
        assert_eq!(task.description.as_deref(), Some("from template"));
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.owner, "alice");
    }

    let plan = repo.find_plan("alice", plan.id).await.unwrap();
    assert_eq!(plan.last_activated, day(2024, 1, 15));
    assert_eq!(plan.repetitions_counter, 2);

    // Same "now" again: nothing new.
    let again = scheduler.run("alice", day(2024, 1, 22)).await.unwrap();
    assert_eq!(again.tasks_generated, 0);
    assert_eq!(repo.generated_tasks("alice", plan.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_generated_tasks_inherit_sharing() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (template, plan) = planned_task(&repo, "alice", "Clean kitchen", PeriodUnit::Day, 1, None, None).await;
    repo.share_task("alice", template.id, "bob").await.unwrap();
    repo.assign_user("alice", template.id, "carol").await.unwrap();

    Scheduler::new(&repo, SchedulerConfig::default())
        .run("alice", day(2024, 1, 3))
        .await
        .unwrap();

    let generated = repo.generated_tasks("bob", plan.id).await.unwrap();
    assert_eq!(generated.len(), 1);
    let task = &generated[0];
    assert_eq!(task.assigned.as_deref(), Some("carol"));
    assert_eq!(
        repo.task_editors("alice", task.id).await.unwrap(),
        vec!["alice", "bob", "carol"]
    );
    assert_eq!(repo.list_assigned_tasks("carol").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_only_owned_plans_are_run() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (template, plan) = planned_task(&repo, "alice", "Alice's plan", PeriodUnit::Day, 1, None, None).await;
    repo.share_task("alice", template.id, "bob").await.unwrap();

    let report = Scheduler::new(&repo, SchedulerConfig::default())
        .run("bob", day(2024, 1, 10))
        .await
        .unwrap();
    assert_eq!(report.rules_processed, 0);
    assert_eq!(repo.find_plan("alice", plan.id).await.unwrap().repetitions_counter, 0);
}

#[tokio::test]
async fn test_end_conditions_stop_generation() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, counted) = planned_task(&repo, "alice", "Three times", PeriodUnit::Day, 1, Some(3), None).await;
    let (_, dated) =
        planned_task(&repo, "alice", "Until the 4th", PeriodUnit::Day, 1, None, Some(day(2024, 1, 4))).await;

    let scheduler = Scheduler::new(&repo, SchedulerConfig::default());
    let report = scheduler.run("alice", day(2024, 3, 1)).await.unwrap();
    assert_eq!(report.tasks_generated, 6);

    assert_eq!(repo.generated_tasks("alice", counted.id).await.unwrap().len(), 3);
    // The activation on the end date itself is still emitted.
    let dated_tasks = repo.generated_tasks("alice", dated.id).await.unwrap();
    assert_eq!(dated_tasks.last().and_then(|t| t.start_date), Some(day(2024, 1, 4)));
    assert_eq!(dated_tasks.len(), 3);

    let later = scheduler.run("alice", day(2025, 1, 1)).await.unwrap();
    assert_eq!(later.tasks_generated, 0);
    assert_eq!(later.rules_processed, 2);
}

#[tokio::test]
async fn test_activation_limit_from_config() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, plan) = planned_task(&repo, "alice", "Hourly", PeriodUnit::Hour, 1, None, None).await;

    let config = SchedulerConfig {
        max_activations_per_rule: NonZeroUsize::new(5),
    };
    let scheduler = Scheduler::new(&repo, config);
    let report = scheduler.run("alice", day(2024, 1, 2)).await.unwrap();
    assert_eq!(report.tasks_generated, 5);
    assert_eq!(repo.find_plan("alice", plan.id).await.unwrap().repetitions_counter, 5);
}

#[tokio::test]
async fn test_stale_batch_is_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, plan) = planned_task(&repo, "alice", "Racy", PeriodUnit::Day, 1, None, None).await;
    let now = day(2024, 1, 5);

    let stored = repo.list_plans_for_user("alice").await.unwrap();
    let rule = stored[0].to_rule().unwrap();
    let template = repo.load_template_task(rule.template_task_id).await.unwrap();

    // Two ticks compute from the same cursor.
    let mut first = rule.clone();
    let first_batch = execute(&mut first, now, &template, None).unwrap();
    let mut second = rule.clone();
    let second_batch = execute(&mut second, now, &template, None).unwrap();

    let ids = repo.commit_activations(&first, &first_batch).await.unwrap();
    assert_eq!(ids.len(), 3);

    let result = repo.commit_activations(&second, &second_batch).await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));

    // Nothing of the losing batch was written.
    assert_eq!(repo.generated_tasks("alice", plan.id).await.unwrap().len(), 3);
    assert_eq!(repo.find_plan("alice", plan.id).await.unwrap().repetitions_counter, 3);
}

#[tokio::test]
async fn test_malformed_plan_does_not_abort_tick() {
    let (repo, temp_dir) = setup_test_db().await;
    let (_, broken) = planned_task(&repo, "alice", "Broken", PeriodUnit::Day, 1, None, None).await;
    let (_, healthy) = planned_task(&repo, "alice", "Healthy", PeriodUnit::Day, 1, None, None).await;

    // Corrupt one row behind the repository's back.
    let pool = establish_connection(&temp_dir.path().join("scheduler.db").to_string_lossy())
        .await
        .unwrap();
    sqlx::query("UPDATE plans SET period = 'fortnight' WHERE id = $1")
        .bind(broken.id)
        .execute(&pool)
        .await
        .unwrap();

    let report = Scheduler::new(&repo, SchedulerConfig::default())
        .run("alice", day(2024, 1, 3))
        .await
        .unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].rule_id, broken.id);
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidPeriod);
    assert_eq!(report.tasks_generated, 1);
    assert_eq!(repo.generated_tasks("alice", healthy.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let (repo, _temp_dir) = setup_test_db().await;
    let result = repo.load_template_task(uuid::Uuid::now_v7()).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}
