use chrono::{DateTime, Duration, TimeZone, Utc};
use rota_core::db::establish_connection;
use rota_core::error::CoreError;
use rota_core::models::*;
use rota_core::recurrence::PeriodUnit;
use rota_core::repository::{
    AccessRepository, FolderRepository, PlanRepository, SqliteRepository, TaskRepository,
};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    (SqliteRepository::new(pool), temp_dir)
}

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
}

/// Helper function to create a test task
async fn create_test_task(repo: &SqliteRepository, user: &str, name: &str) -> Task {
    let task_data = NewTaskData {
        name: name.to_string(),
        description: Some(format!("Test task: {}", name)),
        start_date: Some(jan(1)),
        ..Default::default()
    };

    repo.add_task(user, task_data)
        .await
        .expect("Failed to create test task")
}

#[tokio::test]
async fn test_basic_task_crud_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;

    let task = create_test_task(&repo, "alice", "Test Task").await;
    assert_eq!(task.owner, "alice");
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(repo.task_editors("alice", task.id).await.unwrap(), vec!["alice"]);

    let update_data = UpdateTaskData {
        name: Some("Updated Task".to_string()),
        priority: Some(TaskPriority::High),
        description: Some(None),
        ..Default::default()
    };
    let updated = repo.update_task("alice", task.id, update_data).await.unwrap();
    assert_eq!(updated.name, "Updated Task");
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.description, None);
    assert!(updated.updated_at >= task.updated_at);

    let found = repo.find_task("alice", task.id).await.unwrap();
    assert_eq!(found.name, "Updated Task");

    repo.delete_task("alice", task.id).await.unwrap();
    assert!(matches!(
        repo.find_task("alice", task.id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_task_validation() {
    let (repo, _temp_dir) = setup_test_db().await;

    let empty = repo
        .add_task("alice", NewTaskData { name: "  ".to_string(), ..Default::default() })
        .await;
    assert!(matches!(empty, Err(CoreError::InvalidInput(_))));

    let backwards = repo
        .add_task(
            "alice",
            NewTaskData {
                name: "Backwards".to_string(),
                start_date: Some(jan(5)),
                end_date: Some(jan(2)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(backwards, Err(CoreError::InvalidInput(_))));

    let defaulted = repo
        .add_task("alice", NewTaskData { name: "Now".to_string(), ..Default::default() })
        .await
        .unwrap();
    assert!(defaulted.start_date.is_some());
}

#[tokio::test]
async fn test_access_control() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Private").await;

    assert!(matches!(
        repo.find_task("bob", task.id).await,
        Err(CoreError::AccessDenied(_))
    ));
    assert!(matches!(
        repo.update_task("bob", task.id, UpdateTaskData::default()).await,
        Err(CoreError::AccessDenied(_))
    ));
    assert!(matches!(
        repo.user_can_access_task("bob", Uuid::now_v7()).await,
        Err(CoreError::NotFound(_))
    ));

    repo.share_task("alice", task.id, "bob").await.unwrap();
    repo.user_can_access_task("bob", task.id).await.unwrap();
    assert!(matches!(
        repo.share_task("alice", task.id, "bob").await,
        Err(CoreError::DuplicateRelation(_))
    ));
    assert_eq!(repo.list_available_tasks("bob").await.unwrap().len(), 1);
    assert!(repo.list_own_tasks("bob").await.unwrap().is_empty());

    assert!(matches!(
        repo.unshare_task("bob", task.id, "alice").await,
        Err(CoreError::InvalidInput(_))
    ));
    repo.unshare_task("alice", task.id, "bob").await.unwrap();
    assert!(matches!(
        repo.find_task("bob", task.id).await,
        Err(CoreError::AccessDenied(_))
    ));
    assert!(matches!(
        repo.unshare_task("alice", task.id, "bob").await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_assignment_grants_access() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Take out trash").await;

    let assigned = repo.assign_user("alice", task.id, "carol").await.unwrap();
    assert_eq!(assigned.assigned.as_deref(), Some("carol"));
    assert_eq!(repo.list_assigned_tasks("carol").await.unwrap().len(), 1);
    assert_eq!(
        repo.task_editors("carol", task.id).await.unwrap(),
        vec!["alice", "carol"]
    );

    assert!(matches!(
        repo.assign_user("alice", task.id, "carol").await,
        Err(CoreError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_created_with_assignee() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = repo
        .add_task(
            "alice",
            NewTaskData {
                name: "Review".to_string(),
                assigned: Some("bob".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(repo.task_editors("bob", task.id).await.unwrap(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_subtask_hierarchy_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;
    let parent = create_test_task(&repo, "alice", "Move house").await;
    let child = create_test_task(&repo, "alice", "Pack books").await;
    let grandchild = create_test_task(&repo, "alice", "Buy boxes").await;

    assert!(matches!(
        repo.attach_subtask("alice", parent.id, parent.id).await,
        Err(CoreError::InvalidInput(_))
    ));

    let attached = repo.attach_subtask("alice", parent.id, child.id).await.unwrap();
    assert_eq!(attached.parent_task_id, Some(parent.id));
    repo.attach_subtask("alice", child.id, grandchild.id).await.unwrap();

    // Two-node and longer loops are refused.
    assert!(matches!(
        repo.attach_subtask("alice", child.id, parent.id).await,
        Err(CoreError::InvalidInput(_))
    ));
    assert!(matches!(
        repo.attach_subtask("alice", grandchild.id, parent.id).await,
        Err(CoreError::InvalidInput(_))
    ));
    // A task keeps a single parent.
    let other = create_test_task(&repo, "alice", "Other").await;
    assert!(matches!(
        repo.attach_subtask("alice", other.id, child.id).await,
        Err(CoreError::InvalidInput(_))
    ));

    let subtasks = repo.list_subtasks("alice", parent.id).await.unwrap();
    assert_eq!(subtasks.len(), 1);
    assert_eq!(subtasks[0].id, child.id);

    // Done cascades through the whole subtree.
    repo.change_task_status("alice", parent.id, TaskStatus::Done, false)
        .await
        .unwrap();
    for id in [child.id, grandchild.id] {
        assert_eq!(repo.find_task("alice", id).await.unwrap().status, TaskStatus::Done);
    }

    // Other statuses only cascade on request.
    repo.change_task_status("alice", parent.id, TaskStatus::InWork, false)
        .await
        .unwrap();
    assert_eq!(repo.find_task("alice", child.id).await.unwrap().status, TaskStatus::Done);
    repo.change_task_status("alice", parent.id, TaskStatus::Archived, true)
        .await
        .unwrap();
    assert_eq!(
        repo.find_task("alice", grandchild.id).await.unwrap().status,
        TaskStatus::Archived
    );

    let detached = repo.detach_subtask("alice", child.id).await.unwrap();
    assert_eq!(detached.parent_task_id, None);
    assert!(matches!(
        repo.detach_subtask("alice", child.id).await,
        Err(CoreError::InvalidInput(_))
    ));

    // Deleting a parent keeps its subtasks.
    repo.delete_task("alice", child.id).await.unwrap();
    let orphan = repo.find_task("alice", grandchild.id).await.unwrap();
    assert_eq!(orphan.parent_task_id, None);
}

#[tokio::test]
async fn test_short_id_lookup_is_scoped_to_accessible_tasks() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Findable").await;
    let short_id = task.id.to_string()[..8].to_string();

    let found = repo.find_tasks_by_short_id_prefix("alice", &short_id).await.unwrap();
    assert!(found.iter().any(|t| t.id == task.id));

    let hyphenated = task.id.to_string()[..13].to_string();
    let found = repo.find_tasks_by_short_id_prefix("alice", &hyphenated).await.unwrap();
    assert_eq!(found.len(), 1);

    assert!(repo
        .find_tasks_by_short_id_prefix("bob", &short_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_folder_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Groceries").await;

    let folder = repo.create_folder("alice", "Home").await.unwrap();
    assert!(matches!(
        repo.create_folder("alice", "Home").await,
        Err(CoreError::DuplicateRelation(_))
    ));
    // Names are unique per user only.
    repo.create_folder("bob", "Home").await.unwrap();

    repo.add_task_to_folder("alice", folder.id, task.id).await.unwrap();
    assert!(matches!(
        repo.add_task_to_folder("alice", folder.id, task.id).await,
        Err(CoreError::DuplicateRelation(_))
    ));
    assert_eq!(repo.folder_tasks("alice", folder.id).await.unwrap().len(), 1);

    // Bob cannot see or fill alice's folder.
    assert!(matches!(
        repo.find_folder("bob", folder.id).await,
        Err(CoreError::NotFound(_))
    ));

    let renamed = repo.rename_folder("alice", folder.id, "House").await.unwrap();
    assert_eq!(renamed.name, "House");
    assert!(repo.find_folder_by_name("alice", "Home").await.unwrap().is_none());
    assert_eq!(repo.list_folders("alice").await.unwrap().len(), 1);

    repo.remove_task_from_folder("alice", folder.id, task.id).await.unwrap();
    assert!(matches!(
        repo.remove_task_from_folder("alice", folder.id, task.id).await,
        Err(CoreError::NotFound(_))
    ));

    repo.add_task_to_folder("alice", folder.id, task.id).await.unwrap();
    repo.delete_task("alice", task.id).await.unwrap();
    assert!(repo.folder_tasks("alice", folder.id).await.unwrap().is_empty());

    repo.delete_folder("alice", folder.id).await.unwrap();
    assert!(matches!(
        repo.delete_folder("alice", folder.id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_plan_creation_rules() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Standup").await;

    let plan = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: task.id,
                period: PeriodUnit::Day,
                period_amount: 1,
                repetitions_amount: Some(5),
                end_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(plan.end_type, "amount");
    assert_eq!(plan.last_activated, jan(1));
    assert_eq!(plan.repetitions_counter, 0);

    let again = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: task.id,
                period: PeriodUnit::Week,
                period_amount: 1,
                repetitions_amount: None,
                end_date: None,
            },
        )
        .await;
    assert!(matches!(again, Err(CoreError::DuplicateRelation(_))));

    // No subtasks below a planned task.
    let child = create_test_task(&repo, "alice", "Child").await;
    assert!(matches!(
        repo.attach_subtask("alice", task.id, child.id).await,
        Err(CoreError::InvalidInput(_))
    ));

    // A task with subtasks cannot get a plan.
    let parent = create_test_task(&repo, "alice", "Parent").await;
    repo.attach_subtask("alice", parent.id, child.id).await.unwrap();
    let with_children = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: parent.id,
                period: PeriodUnit::Day,
                period_amount: 1,
                repetitions_amount: None,
                end_date: None,
            },
        )
        .await;
    assert!(matches!(with_children, Err(CoreError::InvalidInput(_))));

    let other = create_test_task(&repo, "alice", "Other").await;
    let invalid_period = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: other.id,
                period: PeriodUnit::Day,
                period_amount: 0,
                repetitions_amount: None,
                end_date: None,
            },
        )
        .await;
    assert!(matches!(invalid_period, Err(CoreError::InvalidPeriod(_))));

    let invalid_end = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: other.id,
                period: PeriodUnit::Day,
                period_amount: 1,
                repetitions_amount: None,
                end_date: Some(jan(1) - Duration::days(1)),
            },
        )
        .await;
    assert!(matches!(invalid_end, Err(CoreError::InvalidEndCondition(_))));

    let denied = repo
        .create_plan(
            "bob",
            NewPlanData {
                task_id: other.id,
                period: PeriodUnit::Day,
                period_amount: 1,
                repetitions_amount: None,
                end_date: None,
            },
        )
        .await;
    assert!(matches!(denied, Err(CoreError::AccessDenied(_))));
}

#[tokio::test]
async fn test_plan_update_re_resolves_end_condition() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Gym").await;
    let plan = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: task.id,
                period: PeriodUnit::Week,
                period_amount: 1,
                repetitions_amount: Some(10),
                end_date: None,
            },
        )
        .await
        .unwrap();

    // Ten weeks end in March; an end date in February is reached first.
    let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let updated = repo
        .update_plan(
            "alice",
            plan.id,
            UpdatePlanData { end_date: Some(feb), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(updated.end_type, "date");
    assert_eq!(updated.repetitions_amount, Some(10));
    assert_eq!(updated.end_date, Some(feb));

    // Switching to daily makes the count win again.
    let updated = repo
        .update_plan(
            "alice",
            plan.id,
            UpdatePlanData { period: Some(PeriodUnit::Day), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(updated.period, "day");
    assert_eq!(updated.end_type, "amount");

    let broken = repo
        .update_plan(
            "alice",
            plan.id,
            UpdatePlanData { period_amount: Some(-1), ..Default::default() },
        )
        .await;
    assert!(matches!(broken, Err(CoreError::InvalidPeriod(_))));

    repo.delete_plan("alice", plan.id).await.unwrap();
    assert!(matches!(
        repo.find_plan("alice", plan.id).await,
        Err(CoreError::NotFound(_))
    ));
    // The template outlives its plan.
    repo.find_task("alice", task.id).await.unwrap();
}

#[tokio::test]
async fn test_deleting_template_removes_plan() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "alice", "Laundry").await;
    let plan = repo
        .create_plan(
            "alice",
            NewPlanData {
                task_id: task.id,
                period: PeriodUnit::Day,
                period_amount: 2,
                repetitions_amount: None,
                end_date: None,
            },
        )
        .await
        .unwrap();

    repo.share_task("alice", task.id, "bob").await.unwrap();
    assert_eq!(repo.list_plans("bob").await.unwrap().len(), 1);
    assert!(repo.list_own_plans("bob").await.unwrap().is_empty());

    repo.delete_task("alice", task.id).await.unwrap();
    assert!(matches!(
        repo.find_plan("alice", plan.id).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(repo.list_own_plans("alice").await.unwrap().is_empty());
}
