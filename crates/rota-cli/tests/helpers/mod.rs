use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// A command acting as `alice`, with the startup tick disabled and no config file
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("rota").expect("Failed to find rota binary");

        cmd.env("ROTA_DATABASE_PATH", &self.db_path)
            .env("ROTA_CONFIG", self.temp_dir.path().join("missing.toml"))
            .env("ROTA_USER", "alice")
            .env("ROTA_SCHEDULER__RUN_ON_STARTUP", "false")
            .env_remove("RUST_LOG");

        cmd
    }

    /// Same as [`command`](Self::command) but acting as `user`
    pub fn command_as(&self, user: &str) -> Command {
        let mut cmd = self.command();
        cmd.env("ROTA_USER", user);
        cmd
    }

    /// Directory holding the database; config files for a test go here too
    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command that prints an `… ID: <uuid>` line and returns the uuid
    pub fn create(&self, args: &[&str], label: &str) -> String {
        let output = self.command().args(args).output().expect("Failed to run rota");
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        extract_id(&String::from_utf8_lossy(&output.stdout), label)
    }

    pub fn add_task(&self, args: &[&str]) -> String {
        let mut full = vec!["task", "add"];
        full.extend_from_slice(args);
        self.create(&full, "Task ID:")
    }
}

/// Pulls the id following `label` out of command output
pub fn extract_id(stdout: &str, label: &str) -> String {
    stdout
        .lines()
        .find(|line| line.contains(label))
        .and_then(|line| line.split_whitespace().last())
        .unwrap_or_else(|| panic!("no '{}' line in output:\n{}", label, stdout))
        .to_string()
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains task table headers
    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Name"))
            .and(predicate::str::contains("Status"))
    }

    pub fn created(kind: &str) -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains(format!("Created {}", kind)))
    }

    pub fn empty_result() -> impl Predicate<str> {
        predicate::str::contains("No tasks found")
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
