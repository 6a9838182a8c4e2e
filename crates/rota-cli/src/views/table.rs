use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use rota_core::models::{Folder, Plan, Task, TaskPriority, TaskStatus};
use rota_core::recurrence::SchedulerReport;
use uuid::Uuid;

use crate::util::short_ids;

/// A plan row together with the name of its template task
#[derive(Debug, Clone)]
pub struct ViewPlan {
    pub plan: Plan,
    pub template_name: String,
}

fn date_cell(date: Option<DateTime<Utc>>) -> Cell {
    match date {
        Some(date) => Cell::new(format!("{} ({})", date.format("%Y-%m-%d %H:%M"), date.humanize())),
        None => Cell::new("None"),
    }
}

pub fn display_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let short = short_ids(&ids);

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Status", "Priority", "Start", "Due", "Owner", "Assigned"]);

    for (task, short_id) in tasks.iter().zip(short) {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id));

        let mut display_name = task.name.clone();
        if task.parent_task_id.is_some() {
            display_name.insert_str(0, "↳ ");
        }
        let mut name_cell = Cell::new(display_name);

        // Style based on status and priority
        match task.status {
            TaskStatus::Done | TaskStatus::Archived => {
                name_cell = name_cell
                    .add_attribute(Attribute::CrossedOut)
                    .fg(Color::DarkGrey);
            }
            TaskStatus::Created | TaskStatus::Todo | TaskStatus::InWork => {
                name_cell = match task.priority {
                    TaskPriority::High => name_cell.fg(Color::Red).add_attribute(Attribute::Bold),
                    TaskPriority::Medium => name_cell.fg(Color::Yellow),
                    TaskPriority::Low => name_cell.fg(Color::Green),
                    TaskPriority::None => name_cell,
                };
            }
        };
        row.add_cell(name_cell);

        let status_cell = Cell::new(task.status.to_string());
        row.add_cell(match task.status {
            TaskStatus::Done => status_cell.fg(Color::Green),
            TaskStatus::Archived => status_cell.fg(Color::DarkGrey),
            TaskStatus::InWork => status_cell.fg(Color::Cyan),
            TaskStatus::Created | TaskStatus::Todo => status_cell,
        });
        row.add_cell(Cell::new(task.priority.to_string()));

        row.add_cell(match task.start_date {
            Some(start) => Cell::new(start.humanize()),
            None => Cell::new("None"),
        });

        let due_cell = match task.end_date {
            Some(end) => {
                let open = !matches!(task.status, TaskStatus::Done | TaskStatus::Archived);
                let cell = Cell::new(end.humanize());
                if open && end < Utc::now() {
                    cell.fg(Color::Red) // Overdue
                } else {
                    cell
                }
            }
            None => Cell::new("None"),
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(&task.owner));
        row.add_cell(Cell::new(task.assigned.as_deref().unwrap_or("-")));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_task_details(task: &Task, editors: &[String], subtasks: &[Task], plan: Option<&Plan>) {
    let mut table = Table::new();
    table.add_row(vec![Cell::new("ID"), Cell::new(task.id)]);
    table.add_row(vec![Cell::new("Name").add_attribute(Attribute::Bold), Cell::new(&task.name)]);
    table.add_row(vec![
        Cell::new("Description"),
        Cell::new(task.description.as_deref().unwrap_or("None")),
    ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(task.status)]);
    table.add_row(vec![Cell::new("Priority"), Cell::new(task.priority)]);
    table.add_row(vec![Cell::new("Start"), date_cell(task.start_date)]);
    table.add_row(vec![Cell::new("Due"), date_cell(task.end_date)]);
    table.add_row(vec![Cell::new("Owner"), Cell::new(&task.owner)]);
    table.add_row(vec![
        Cell::new("Assigned"),
        Cell::new(task.assigned.as_deref().unwrap_or("None")),
    ]);
    table.add_row(vec![Cell::new("Shared with"), Cell::new(editors.join(", "))]);
    if let Some(parent) = task.parent_task_id {
        table.add_row(vec![Cell::new("Parent"), Cell::new(parent)]);
    }
    if let Some(plan) = plan {
        table.add_row(vec![
            Cell::new("Plan"),
            Cell::new(format!("{} (every {} {})", plan.id, plan.period_amount, plan.period)),
        ]);
    }
    table.add_row(vec![Cell::new("Updated"), Cell::new(task.updated_at.humanize())]);
    println!("{table}");

    if !subtasks.is_empty() {
        println!("\nSubtasks:");
        display_tasks(subtasks);
    }
}

pub fn display_folders(folders: &[(Folder, usize)]) {
    if folders.is_empty() {
        println!("No folders found.");
        return;
    }

    let ids: Vec<Uuid> = folders.iter().map(|(f, _)| f.id).collect();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Tasks", "Created At"]);

    for ((folder, count), short_id) in folders.iter().zip(short_ids(&ids)) {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id));
        row.add_cell(Cell::new(&folder.name));
        row.add_cell(Cell::new(count));
        row.add_cell(Cell::new(folder.created_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

fn end_description(plan: &Plan) -> String {
    match plan.end_type.as_str() {
        "amount" => format!(
            "after {} ({} done)",
            plan.repetitions_amount.unwrap_or_default(),
            plan.repetitions_counter
        ),
        "date" => match plan.end_date {
            Some(end) => format!("on {}", end.format("%Y-%m-%d %H:%M")),
            None => "on ?".to_string(),
        },
        _ => "never".to_string(),
    }
}

pub fn display_plans(plans: &[ViewPlan]) {
    if plans.is_empty() {
        println!("No plans found.");
        return;
    }

    let ids: Vec<Uuid> = plans.iter().map(|p| p.plan.id).collect();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Task", "Every", "Ends", "Generated", "Last Activation", "Owner"]);

    for (view, short_id) in plans.iter().zip(short_ids(&ids)) {
        let plan = &view.plan;
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id));
        row.add_cell(Cell::new(&view.template_name));
        row.add_cell(Cell::new(format!("{} {}", plan.period_amount, plan.period)));
        row.add_cell(Cell::new(end_description(plan)));
        row.add_cell(Cell::new(plan.repetitions_counter));
        row.add_cell(Cell::new(plan.last_activated.humanize()));
        row.add_cell(Cell::new(&plan.owner));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_plan_details(view: &ViewPlan, next_activation: Option<DateTime<Utc>>) {
    let plan = &view.plan;
    let mut table = Table::new();
    table.add_row(vec![Cell::new("ID"), Cell::new(plan.id)]);
    table.add_row(vec![
        Cell::new("Task").add_attribute(Attribute::Bold),
        Cell::new(format!("{} ({})", view.template_name, plan.task_id)),
    ]);
    table.add_row(vec![
        Cell::new("Every"),
        Cell::new(format!("{} {}", plan.period_amount, plan.period)),
    ]);
    table.add_row(vec![Cell::new("Ends"), Cell::new(end_description(plan))]);
    table.add_row(vec![Cell::new("Start"), date_cell(Some(plan.start_date))]);
    table.add_row(vec![Cell::new("Last activation"), date_cell(Some(plan.last_activated))]);
    table.add_row(vec![Cell::new("Next activation"), date_cell(next_activation)]);
    table.add_row(vec![Cell::new("Generated"), Cell::new(plan.repetitions_counter)]);
    table.add_row(vec![Cell::new("Owner"), Cell::new(&plan.owner)]);
    println!("{table}");
}

pub fn display_report(report: &SchedulerReport) {
    println!(
        "Processed {} plan(s): {} task(s) generated by {} plan(s) in {} ms",
        report.rules_processed, report.tasks_generated, report.rules_activated, report.duration_ms
    );

    if report.errors.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Plan", "Kind", "Error"]);
    for failure in &report.errors {
        table.add_row(vec![
            Cell::new(failure.rule_id),
            Cell::new(failure.kind).fg(Color::Red),
            Cell::new(&failure.message),
        ]);
    }
    println!("{table}");
}
