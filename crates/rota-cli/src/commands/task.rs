use anyhow::Result;
use owo_colors::OwoColorize;
use rota_core::models::{NewTaskData, TaskStatus, UpdateTaskData};
use rota_core::repository::{AccessRepository, PlanRepository, Repository, TaskRepository};

use super::{confirmed, print_id, print_success};
use crate::cli::{
    AddTaskCommand, EditTaskCommand, ListScope, ListTasksCommand, TaskCommand, TaskSubcommand,
};
use crate::parser::parse_date;
use crate::util::resolve_task_id;
use crate::views::table::{display_task_details, display_tasks};

pub async fn task_command(repo: &impl Repository, user: &str, command: TaskCommand) -> Result<()> {
    match command.command {
        TaskSubcommand::Add(command) => add_task(repo, user, command).await,
        TaskSubcommand::Show(command) => show_task(repo, user, &command.id).await,
        TaskSubcommand::List(command) => list_tasks(repo, user, command).await,
        TaskSubcommand::Edit(command) => edit_task(repo, user, command).await,
        TaskSubcommand::Share(command) => {
            let task_id = resolve_task_id(repo, user, &command.id).await?;
            repo.share_task(user, task_id, &command.target).await?;
            print_success(format!("Shared task with {}", command.target.bold()));
            Ok(())
        }
        TaskSubcommand::Unshare(command) => {
            let task_id = resolve_task_id(repo, user, &command.id).await?;
            repo.unshare_task(user, task_id, &command.target).await?;
            print_success(format!("Revoked access for {}", command.target.bold()));
            Ok(())
        }
        TaskSubcommand::Assign(command) => {
            let task_id = resolve_task_id(repo, user, &command.id).await?;
            let task = repo.assign_user(user, task_id, &command.target).await?;
            print_success(format!("Assigned '{}' to {}", task.name, command.target.bold()));
            Ok(())
        }
        TaskSubcommand::Attach(command) => {
            let parent_id = resolve_task_id(repo, user, &command.parent).await?;
            let child_id = resolve_task_id(repo, user, &command.child).await?;
            let child = repo.attach_subtask(user, parent_id, child_id).await?;
            print_success(format!("'{}' is now a subtask", child.name));
            Ok(())
        }
        TaskSubcommand::Detach(command) => {
            let task_id = resolve_task_id(repo, user, &command.id).await?;
            let task = repo.detach_subtask(user, task_id).await?;
            print_success(format!("'{}' is no longer a subtask", task.name));
            Ok(())
        }
        TaskSubcommand::Done(command) => set_status(repo, user, &command.id, TaskStatus::Done, true).await,
        TaskSubcommand::Archive(command) => {
            set_status(repo, user, &command.id, TaskStatus::Archived, command.subtasks).await
        }
        TaskSubcommand::Status(command) => {
            set_status(repo, user, &command.id, command.status, command.subtasks).await
        }
        TaskSubcommand::Delete(command) => {
            let task_id = resolve_task_id(repo, user, &command.id).await?;
            let task = repo.find_task(user, task_id).await?;
            if !confirmed(
                command.force,
                format!("Are you sure you want to delete task '{}'?", task.name),
            ) {
                return Ok(());
            }
            repo.delete_task(user, task_id).await?;
            print_success(format!("Deleted task '{}'", task.name));
            Ok(())
        }
    }
}

async fn add_task(repo: &impl Repository, user: &str, command: AddTaskCommand) -> Result<()> {
    let start_date = command.start.as_deref().map(parse_date).transpose()?;
    let end_date = command.end.as_deref().map(parse_date).transpose()?;
    let parent_task_id = match &command.parent {
        Some(parent) => Some(resolve_task_id(repo, user, parent).await?),
        None => None,
    };

    let new_task_data = NewTaskData {
        name: command.name,
        description: command.description,
        priority: command.priority,
        status: command.status,
        start_date,
        end_date,
        parent_task_id,
        assigned: command.assign,
    };

    let added_task = repo.add_task(user, new_task_data).await?;

    print_success(format!("Created task: {}", added_task.name.bright_white().bold()));
    print_id("Task ID", added_task.id);
    if let Some(end) = added_task.end_date {
        println!("  {} Due: {}", "→".blue(), end.format("%Y-%m-%d %H:%M").to_string().cyan());
    }
    Ok(())
}

async fn show_task(repo: &impl Repository, user: &str, id: &str) -> Result<()> {
    let task_id = resolve_task_id(repo, user, id).await?;
    let task = repo.find_task(user, task_id).await?;
    let editors = repo.task_editors(user, task_id).await?;
    let subtasks = repo.list_subtasks(user, task_id).await?;
    let plan = repo
        .list_plans(user)
        .await?
        .into_iter()
        .find(|plan| plan.task_id == task_id);

    display_task_details(&task, &editors, &subtasks, plan.as_ref());
    Ok(())
}

async fn list_tasks(repo: &impl Repository, user: &str, command: ListTasksCommand) -> Result<()> {
    let tasks = match command.scope {
        ListScope::Available => repo.list_available_tasks(user).await?,
        ListScope::Own => repo.list_own_tasks(user).await?,
        ListScope::Assigned => repo.list_assigned_tasks(user).await?,
    };

    let tasks: Vec<_> = tasks
        .into_iter()
        .filter(|task| match command.status {
            Some(status) => task.status == status,
            None => command.all || !matches!(task.status, TaskStatus::Done | TaskStatus::Archived),
        })
        .collect();

    display_tasks(&tasks);
    Ok(())
}

async fn edit_task(repo: &impl Repository, user: &str, command: EditTaskCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, user, &command.id).await?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };

    let start_date = if command.start_clear {
        Some(None)
    } else if let Some(start) = command.start {
        Some(Some(parse_date(&start)?))
    } else {
        None
    };

    let end_date = if command.end_clear {
        Some(None)
    } else if let Some(end) = command.end {
        Some(Some(parse_date(&end)?))
    } else {
        None
    };

    let update_data = UpdateTaskData {
        name: command.name,
        description,
        priority: command.priority,
        status: command.status,
        start_date,
        end_date,
    };

    let task = repo.update_task(user, task_id, update_data).await?;
    print_success(format!("Updated task: {}", task.name.bright_white().bold()));
    Ok(())
}

async fn set_status(
    repo: &impl Repository,
    user: &str,
    id: &str,
    status: TaskStatus,
    subtasks: bool,
) -> Result<()> {
    let task_id = resolve_task_id(repo, user, id).await?;
    let task = repo.change_task_status(user, task_id, status, subtasks).await?;
    print_success(format!("Task '{}' is now {}", task.name, task.status));
    Ok(())
}
