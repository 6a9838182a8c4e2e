use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};

pub mod folder;
pub mod plan;
pub mod task;

pub(crate) fn print_success(message: impl std::fmt::Display) {
    let success_style = Style::new().green().bold();
    println!("{} {}", "✓".style(success_style), message);
}

/// Prints the full ID on its own line so scripts can pick it up.
pub(crate) fn print_id(label: &str, id: impl std::fmt::Display) {
    let info_style = Style::new().blue();
    println!("  {} {}: {}", "→".style(info_style), label, id);
}

/// Asks before destructive operations unless `force` is set.
pub(crate) fn confirmed(force: bool, prompt: String) -> bool {
    if force {
        return true;
    }
    let confirmation = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false);
    if !confirmation {
        println!("Deletion cancelled.");
    }
    confirmation
}
