use clap::{Args, Parser, Subcommand, ValueEnum};
use rota_core::models::{TaskPriority, TaskStatus};
use rota_core::recurrence::PeriodUnit;

/// Rota: shared tasks, folders and recurring plans
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act as this user (falls back to `user` in rota.toml)
    #[arg(long, short, global = true, env = "ROTA_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage tasks
    Task(TaskCommand),
    /// Manage folders
    Folder(FolderCommand),
    /// Manage recurring plans
    Plan(PlanCommand),
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskSubcommand {
    /// Add a new task
    Add(AddTaskCommand),
    /// Show a task with its editors, subtasks and plan
    Show(TaskIdCommand),
    /// List tasks
    List(ListTasksCommand),
    /// Edit a task
    Edit(EditTaskCommand),
    /// Share a task with another user
    Share(TaskUserCommand),
    /// Revoke another user's access to a task
    Unshare(TaskUserCommand),
    /// Assign a task to a user
    Assign(TaskUserCommand),
    /// Make a task the subtask of another
    Attach(AttachCommand),
    /// Detach a subtask from its parent
    Detach(TaskIdCommand),
    /// Mark a task (and its subtasks) as done
    Done(TaskIdCommand),
    /// Archive a task
    Archive(StatusShortcutCommand),
    /// Set the status of a task
    Status(StatusCommand),
    /// Delete a task
    Delete(DeleteCommand),
}

#[derive(Args, Debug, Clone)]
pub struct AddTaskCommand {
    /// The name of the task
    pub name: String,
    /// The description of the task
    #[arg(short, long)]
    pub description: Option<String>,
    /// When the task starts (e.g. '2024-01-01', 'tomorrow'); defaults to now
    #[arg(short, long)]
    pub start: Option<String>,
    /// When the task is due
    #[arg(short, long)]
    pub end: Option<String>,
    /// The priority of the task (none, low, medium, high)
    #[arg(short, long)]
    pub priority: Option<TaskPriority>,
    /// The initial status of the task
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// The parent task ID
    #[arg(long)]
    pub parent: Option<String>,
    /// Assign the task to this user
    #[arg(short, long)]
    pub assign: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskIdCommand {
    /// The ID of the task
    pub id: String,
}

/// Which tasks `task list` shows
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Every task shared with you
    #[default]
    Available,
    /// Tasks you own
    Own,
    /// Tasks assigned to you
    Assigned,
}

#[derive(Args, Debug, Clone)]
pub struct ListTasksCommand {
    #[arg(long, value_enum, default_value_t = ListScope::Available)]
    pub scope: ListScope,
    /// Only show tasks with this status
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Include done and archived tasks
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditTaskCommand {
    /// The ID of the task to edit
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub start: Option<String>,
    #[arg(long, conflicts_with = "start")]
    pub start_clear: bool,

    #[arg(long)]
    pub end: Option<String>,
    #[arg(long, conflicts_with = "end")]
    pub end_clear: bool,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub status: Option<TaskStatus>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskUserCommand {
    /// The ID of the task
    pub id: String,
    /// The other user
    pub target: String,
}

#[derive(Args, Debug, Clone)]
pub struct AttachCommand {
    /// The ID of the parent task
    pub parent: String,
    /// The ID of the task that becomes a subtask
    pub child: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusShortcutCommand {
    /// The ID of the task
    pub id: String,
    /// Apply to all subtasks as well
    #[arg(long)]
    pub subtasks: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusCommand {
    /// The ID of the task
    pub id: String,
    /// The new status (created, todo, inwork, done, archived)
    pub status: TaskStatus,
    /// Apply to all subtasks as well (always the case for 'done')
    #[arg(long)]
    pub subtasks: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the item to delete
    pub id: String,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct FolderCommand {
    #[command(subcommand)]
    pub command: FolderSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FolderSubcommand {
    /// Create a folder
    Add(FolderNameCommand),
    /// List your folders
    List,
    /// Show the tasks in a folder
    Show(FolderRefCommand),
    /// Rename a folder
    Rename(RenameFolderCommand),
    /// Delete a folder (its tasks are kept)
    Delete(DeleteCommand),
    /// Put a task into a folder
    Put(FolderTaskCommand),
    /// Take a task out of a folder
    Take(FolderTaskCommand),
}

#[derive(Args, Debug, Clone)]
pub struct FolderNameCommand {
    /// The name of the folder
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct FolderRefCommand {
    /// Folder name or ID
    pub folder: String,
}

#[derive(Args, Debug, Clone)]
pub struct RenameFolderCommand {
    /// Folder name or ID
    pub folder: String,
    /// The new name
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct FolderTaskCommand {
    /// Folder name or ID
    pub folder: String,
    /// The ID of the task
    pub task: String,
}

// ============================================================================
// Plans
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct PlanCommand {
    #[command(subcommand)]
    pub command: PlanSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlanSubcommand {
    /// Attach a recurring plan to a task
    Add(AddPlanCommand),
    /// List plans
    List(ListPlansCommand),
    /// Show a plan
    Show(PlanIdCommand),
    /// Change a plan's period or end condition
    Edit(EditPlanCommand),
    /// Delete a plan (generated tasks are kept)
    Delete(DeleteCommand),
    /// List the tasks a plan generated
    Tasks(PlanIdCommand),
    /// Generate every task that is due for your plans
    Run(RunPlansCommand),
}

#[derive(Args, Debug, Clone)]
pub struct AddPlanCommand {
    /// The ID of the template task
    pub task: String,
    /// Period unit (minute, hour, day, week, month, year)
    #[arg(short, long)]
    pub period: PeriodUnit,
    /// Number of period units between two activations
    #[arg(short = 'n', long, default_value_t = 1)]
    pub every: i64,
    /// Stop after this many generated tasks
    #[arg(short, long)]
    pub count: Option<u32>,
    /// Stop after this date
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListPlansCommand {
    /// Only plans you own
    #[arg(long)]
    pub own: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanIdCommand {
    /// The ID of the plan
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditPlanCommand {
    /// The ID of the plan
    pub id: String,
    #[arg(short, long)]
    pub period: Option<PeriodUnit>,
    #[arg(short = 'n', long)]
    pub every: Option<i64>,
    #[arg(short, long)]
    pub count: Option<u32>,
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunPlansCommand {
    /// Evaluate plans as of this date instead of now
    #[arg(long)]
    pub at: Option<String>,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
