use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use rota_core::db;
use rota_core::error::CoreError;
use rota_core::recurrence::Scheduler;
use rota_core::repository::SqliteRepository;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

use cli::{Cli, Commands, PlanSubcommand};
use config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);

    if let Err(e) = run(cli, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore a second init; output stays on stderr so stdout remains scriptable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let user = cli
        .user
        .or_else(|| config.user.clone())
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty())
        .ok_or_else(|| anyhow!("No user given. Pass --user or set ROTA_USER."))?;

    let db_pool = db::establish_connection(&config.database_path).await?;
    let repository = SqliteRepository::new(db_pool);
    let scheduler_config = config.scheduler.to_core();

    let explicit_run = matches!(
        &cli.command,
        Commands::Plan(plan) if matches!(plan.command, PlanSubcommand::Run(_))
    );
    if config.scheduler.run_on_startup && !explicit_run {
        let report = Scheduler::new(&repository, scheduler_config.clone())
            .run(&user, Utc::now())
            .await?;
        if report.tasks_generated > 0 {
            tracing::info!(
                generated = report.tasks_generated,
                plans = report.rules_activated,
                "plans caught up"
            );
        }
    }

    match cli.command {
        Commands::Task(command) => commands::task::task_command(&repository, &user, command).await,
        Commands::Folder(command) => commands::folder::folder_command(&repository, &user, command).await,
        Commands::Plan(command) => {
            commands::plan::plan_command(&repository, &user, scheduler_config, command).await
        }
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AccessDenied(s) => {
                eprintln!("{} Access denied: {}", "Error:".style(error_style), s);
            }
            CoreError::DuplicateRelation(s) => {
                eprintln!("{} Already exists: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::AmbiguousId(candidates) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, name) in candidates {
                    eprintln!("  {} ({})", id.yellow(), name);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidPeriod(s) | CoreError::InvalidEndCondition(s) => {
                eprintln!("{} Invalid plan: {}", "Error:".style(error_style), s);
            }
            CoreError::Conflict(s) => {
                eprintln!(
                    "{} {} (another process changed it, try again)",
                    "Error:".style(error_style),
                    s
                );
            }
            CoreError::Database(e) => {
                eprintln!("{} Database error: {}", "Error:".style(error_style), e);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
