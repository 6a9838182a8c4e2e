use anyhow::Result;
use owo_colors::OwoColorize;
use rota_core::repository::{FolderRepository, Repository, TaskRepository};

use super::{confirmed, print_id, print_success};
use crate::cli::{FolderCommand, FolderSubcommand};
use crate::util::{resolve_folder, resolve_task_id};
use crate::views::table::{display_folders, display_tasks};

pub async fn folder_command(repo: &impl Repository, user: &str, command: FolderCommand) -> Result<()> {
    match command.command {
        FolderSubcommand::Add(command) => {
            let folder = repo.create_folder(user, &command.name).await?;
            print_success(format!("Created folder: {}", folder.name.bright_white().bold()));
            print_id("Folder ID", folder.id);
        }
        FolderSubcommand::List => {
            let folders = repo.list_folders(user).await?;
            let mut rows = Vec::with_capacity(folders.len());
            for folder in folders {
                let count = repo.folder_tasks(user, folder.id).await?.len();
                rows.push((folder, count));
            }
            display_folders(&rows);
        }
        FolderSubcommand::Show(command) => {
            let folder = resolve_folder(repo, user, &command.folder).await?;
            println!("{} {}", "Folder".bold(), folder.name.bright_white().bold());
            let tasks = repo.folder_tasks(user, folder.id).await?;
            display_tasks(&tasks);
        }
        FolderSubcommand::Rename(command) => {
            let folder = resolve_folder(repo, user, &command.folder).await?;
            let renamed = repo.rename_folder(user, folder.id, &command.name).await?;
            print_success(format!("Renamed folder '{}' to '{}'", folder.name, renamed.name));
        }
        FolderSubcommand::Delete(command) => {
            let folder = resolve_folder(repo, user, &command.id).await?;
            if !confirmed(
                command.force,
                format!("Are you sure you want to delete folder '{}'?", folder.name),
            ) {
                return Ok(());
            }
            repo.delete_folder(user, folder.id).await?;
            print_success(format!("Deleted folder '{}'", folder.name));
        }
        FolderSubcommand::Put(command) => {
            let folder = resolve_folder(repo, user, &command.folder).await?;
            let task_id = resolve_task_id(repo, user, &command.task).await?;
            repo.add_task_to_folder(user, folder.id, task_id).await?;
            let task = repo.find_task(user, task_id).await?;
            print_success(format!("Put '{}' into folder '{}'", task.name, folder.name));
        }
        FolderSubcommand::Take(command) => {
            let folder = resolve_folder(repo, user, &command.folder).await?;
            let task_id = resolve_task_id(repo, user, &command.task).await?;
            repo.remove_task_from_folder(user, folder.id, task_id).await?;
            print_success(format!("Took task out of folder '{}'", folder.name));
        }
    }
    Ok(())
}
