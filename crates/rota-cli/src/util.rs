use anyhow::{anyhow, Result};
use rota_core::error::CoreError;
use rota_core::models::Folder;
use rota_core::repository::{FolderRepository, PlanRepository, Repository, TaskRepository};
use uuid::Uuid;

/// Picks the single match for a short ID, or explains why there is none.
fn unique_match<T>(
    kind: &str,
    short_id: &str,
    mut matches: Vec<T>,
    describe: impl Fn(&T) -> (String, String),
) -> Result<T> {
    match matches.len() {
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No {} found with ID prefix '{}'",
            kind, short_id
        )))),
        1 => Ok(matches.remove(0)),
        _ => Err(anyhow!(CoreError::AmbiguousId(
            matches.iter().map(describe).collect()
        ))),
    }
}

fn check_short_id(short_id: &str) -> Result<()> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    Ok(())
}

pub async fn resolve_task_id(repo: &impl Repository, user: &str, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    check_short_id(short_id)?;
    let tasks = repo.find_tasks_by_short_id_prefix(user, short_id).await?;
    let task = unique_match("task", short_id, tasks, |t| (t.id.to_string(), t.name.clone()))?;
    Ok(task.id)
}

pub async fn resolve_plan_id(repo: &impl Repository, user: &str, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    check_short_id(short_id)?;
    let plans = repo.find_plans_by_short_id_prefix(user, short_id).await?;
    let plan = unique_match("plan", short_id, plans, |p| {
        (p.id.to_string(), format!("every {} {}", p.period_amount, p.period))
    })?;
    Ok(plan.id)
}

/// Folders are addressed by name first, then by ID prefix.
pub async fn resolve_folder(repo: &impl Repository, user: &str, reference: &str) -> Result<Folder> {
    if let Some(folder) = repo.find_folder_by_name(user, reference).await? {
        return Ok(folder);
    }
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(repo.find_folder(user, id).await?);
    }
    check_short_id(reference)?;
    let folders = repo.find_folders_by_short_id_prefix(user, reference).await?;
    unique_match("folder", reference, folders, |f| (f.id.to_string(), f.name.clone()))
}

/// Shortest hex prefixes (at least 8 characters) telling the given ids apart.
pub fn short_ids(ids: &[Uuid]) -> Vec<String> {
    let hex: Vec<String> = ids.iter().map(|id| id.simple().to_string()).collect();
    hex.iter()
        .map(|own| {
            let len = hex
                .iter()
                .filter(|other| *other != own)
                .map(|other| common_prefix_len(own, other) + 1)
                .max()
                .unwrap_or(0)
                .clamp(8, own.len());
            own[..len].to_string()
        })
        .collect()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}
