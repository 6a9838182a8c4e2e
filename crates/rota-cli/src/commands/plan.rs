use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use rota_core::models::{NewPlanData, Plan, UpdatePlanData};
use rota_core::recurrence::{Scheduler, SchedulerConfig};
use rota_core::repository::{PlanRepository, Repository, TaskRepository};

use super::{confirmed, print_id, print_success};
use crate::cli::{AddPlanCommand, EditPlanCommand, PlanCommand, PlanSubcommand, RunPlansCommand};
use crate::parser::parse_date;
use crate::util::{resolve_plan_id, resolve_task_id};
use crate::views::table::{display_plan_details, display_plans, display_report, display_tasks, ViewPlan};

pub async fn plan_command(
    repo: &impl Repository,
    user: &str,
    scheduler_config: SchedulerConfig,
    command: PlanCommand,
) -> Result<()> {
    match command.command {
        PlanSubcommand::Add(command) => add_plan(repo, user, command).await,
        PlanSubcommand::List(command) => {
            let plans = if command.own {
                repo.list_own_plans(user).await?
            } else {
                repo.list_plans(user).await?
            };
            let mut views = Vec::with_capacity(plans.len());
            for plan in plans {
                views.push(view_plan(repo, user, plan).await?);
            }
            display_plans(&views);
            Ok(())
        }
        PlanSubcommand::Show(command) => {
            let plan_id = resolve_plan_id(repo, user, &command.id).await?;
            let plan = repo.find_plan(user, plan_id).await?;
            // A malformed row still shows, just without a next activation.
            let next_activation = plan.to_rule().ok().and_then(|rule| rule.next_activation().ok().flatten());
            let view = view_plan(repo, user, plan).await?;
            display_plan_details(&view, next_activation);
            Ok(())
        }
        PlanSubcommand::Edit(command) => edit_plan(repo, user, command).await,
        PlanSubcommand::Delete(command) => {
            let plan_id = resolve_plan_id(repo, user, &command.id).await?;
            let view = view_plan(repo, user, repo.find_plan(user, plan_id).await?).await?;
            if !confirmed(
                command.force,
                format!("Are you sure you want to delete the plan of '{}'?", view.template_name),
            ) {
                return Ok(());
            }
            repo.delete_plan(user, plan_id).await?;
            print_success(format!("Deleted plan of '{}'", view.template_name));
            Ok(())
        }
        PlanSubcommand::Tasks(command) => {
            let plan_id = resolve_plan_id(repo, user, &command.id).await?;
            let tasks = repo.generated_tasks(user, plan_id).await?;
            display_tasks(&tasks);
            Ok(())
        }
        PlanSubcommand::Run(command) => run_plans(repo, user, scheduler_config, command).await,
    }
}

async fn view_plan(repo: &impl Repository, user: &str, plan: Plan) -> Result<ViewPlan> {
    let template = repo.find_task(user, plan.task_id).await?;
    Ok(ViewPlan {
        plan,
        template_name: template.name,
    })
}

async fn add_plan(repo: &impl Repository, user: &str, command: AddPlanCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, user, &command.task).await?;
    let end_date = command.until.as_deref().map(parse_date).transpose()?;

    let plan = repo
        .create_plan(
            user,
            NewPlanData {
                task_id,
                period: command.period,
                period_amount: command.every,
                repetitions_amount: command.count,
                end_date,
            },
        )
        .await?;

    print_success(format!(
        "Created plan: every {} {}",
        plan.period_amount.to_string().bright_white().bold(),
        plan.period.bright_white().bold()
    ));
    print_id("Plan ID", plan.id);
    if plan.end_type != "never" {
        println!("  {} Ends: {}", "→".blue(), plan.end_type.cyan());
    }
    Ok(())
}

async fn edit_plan(repo: &impl Repository, user: &str, command: EditPlanCommand) -> Result<()> {
    let plan_id = resolve_plan_id(repo, user, &command.id).await?;
    let end_date = command.until.as_deref().map(parse_date).transpose()?;

    let update = UpdatePlanData {
        period: command.period,
        period_amount: command.every,
        repetitions_amount: command.count,
        end_date,
    };
    let plan = repo.update_plan(user, plan_id, update).await?;

    print_success(format!(
        "Updated plan: every {} {} (ends: {})",
        plan.period_amount, plan.period, plan.end_type
    ));
    Ok(())
}

async fn run_plans(
    repo: &impl Repository,
    user: &str,
    scheduler_config: SchedulerConfig,
    command: RunPlansCommand,
) -> Result<()> {
    let now = match command.at.as_deref() {
        Some(at) => parse_date(at)?,
        None => Utc::now(),
    };

    let report = Scheduler::new(repo, scheduler_config).run(user, now).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report);
    }
    Ok(())
}
