use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    Folder, NewPlanData, NewTaskData, Plan, Task, TaskStatus, UpdatePlanData, UpdateTaskData,
};
use crate::recurrence::SchedulerStore;
use async_trait::async_trait;
use uuid::Uuid;

pub mod access;
pub mod folders;
pub mod plans;
pub mod scheduling;
pub mod tasks;

// Traits are defined in this module and implemented in respective domain modules.
// Every operation takes the acting user; reads and writes on a task require an
// access relation on it (see `AccessRepository::user_can_access_task`).

/// Domain-specific trait for task operations
#[async_trait]
pub trait TaskRepository {
    async fn add_task(&self, user: &str, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task(&self, user: &str, id: Uuid) -> Result<Task, CoreError>;
    async fn find_tasks_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Task>, CoreError>;
    /// Tasks owned by `user`
    async fn list_own_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError>;
    /// Tasks assigned to `user`
    async fn list_assigned_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError>;
    /// Every task `user` holds an access relation on
    async fn list_available_tasks(&self, user: &str) -> Result<Vec<Task>, CoreError>;
    async fn list_subtasks(&self, user: &str, id: Uuid) -> Result<Vec<Task>, CoreError>;
    async fn update_task(&self, user: &str, id: Uuid, data: UpdateTaskData) -> Result<Task, CoreError>;
    /// Sets the status; `Done` always cascades to subtasks, other statuses
    /// only with `apply_on_subtasks`.
    async fn change_task_status(
        &self,
        user: &str,
        id: Uuid,
        status: TaskStatus,
        apply_on_subtasks: bool,
    ) -> Result<Task, CoreError>;
    async fn attach_subtask(&self, user: &str, parent_id: Uuid, child_id: Uuid) -> Result<Task, CoreError>;
    async fn detach_subtask(&self, user: &str, child_id: Uuid) -> Result<Task, CoreError>;
    async fn delete_task(&self, user: &str, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for sharing and assignment
#[async_trait]
pub trait AccessRepository {
    /// `NotFound` for a missing task, `AccessDenied` without a relation.
    async fn user_can_access_task(&self, user: &str, task_id: Uuid) -> Result<(), CoreError>;
    async fn share_task(&self, user: &str, task_id: Uuid, target: &str) -> Result<(), CoreError>;
    async fn unshare_task(&self, user: &str, task_id: Uuid, target: &str) -> Result<(), CoreError>;
    async fn assign_user(&self, user: &str, task_id: Uuid, target: &str) -> Result<Task, CoreError>;
    async fn task_editors(&self, user: &str, task_id: Uuid) -> Result<Vec<String>, CoreError>;
}

/// Domain-specific trait for folder operations
#[async_trait]
pub trait FolderRepository {
    async fn create_folder(&self, user: &str, name: &str) -> Result<Folder, CoreError>;
    async fn find_folder(&self, user: &str, id: Uuid) -> Result<Folder, CoreError>;
    async fn find_folder_by_name(&self, user: &str, name: &str) -> Result<Option<Folder>, CoreError>;
    async fn find_folders_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Folder>, CoreError>;
    async fn list_folders(&self, user: &str) -> Result<Vec<Folder>, CoreError>;
    async fn rename_folder(&self, user: &str, id: Uuid, name: &str) -> Result<Folder, CoreError>;
    async fn delete_folder(&self, user: &str, id: Uuid) -> Result<(), CoreError>;
    async fn add_task_to_folder(&self, user: &str, folder_id: Uuid, task_id: Uuid) -> Result<(), CoreError>;
    async fn remove_task_from_folder(&self, user: &str, folder_id: Uuid, task_id: Uuid) -> Result<(), CoreError>;
    async fn folder_tasks(&self, user: &str, folder_id: Uuid) -> Result<Vec<Task>, CoreError>;
}

/// Domain-specific trait for recurrence plans
#[async_trait]
pub trait PlanRepository {
    async fn create_plan(&self, user: &str, data: NewPlanData) -> Result<Plan, CoreError>;
    async fn find_plan(&self, user: &str, id: Uuid) -> Result<Plan, CoreError>;
    async fn find_plans_by_short_id_prefix(&self, user: &str, short_id: &str) -> Result<Vec<Plan>, CoreError>;
    /// Plans whose template task `user` can access
    async fn list_plans(&self, user: &str) -> Result<Vec<Plan>, CoreError>;
    async fn list_own_plans(&self, user: &str) -> Result<Vec<Plan>, CoreError>;
    async fn update_plan(&self, user: &str, id: Uuid, data: UpdatePlanData) -> Result<Plan, CoreError>;
    async fn delete_plan(&self, user: &str, id: Uuid) -> Result<(), CoreError>;
    /// Tasks generated so far, oldest activation first
    async fn generated_tasks(&self, user: &str, plan_id: Uuid) -> Result<Vec<Task>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository:
    TaskRepository + AccessRepository + FolderRepository + PlanRepository + SchedulerStore
{
}

/// SQLite implementation of the repository pattern
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}

/// `LIKE` pattern matching a textual uuid prefix against a BLOB id column
/// through `hex(id)`.
pub(crate) fn short_id_pattern(short_id: &str) -> String {
    let mut pattern: String = short_id
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    pattern.push('%');
    pattern
}
