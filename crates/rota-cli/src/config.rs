use figment::{providers::{Env, Format, Toml}, Figment};
use rota_core::recurrence::SchedulerConfig;
use serde::Deserialize;
use std::num::NonZeroUsize;

const DEFAULT_DATABASE_PATH: &str = "rota.db";
const DEFAULT_CONFIG_FILE: &str = "rota.toml";

#[derive(Deserialize, Debug)]
pub struct Config {
    /// SQLite file, or `sqlite::memory:`
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Acting user when `--user` is not given
    #[serde(default)]
    pub user: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

/// The `[scheduler]` table
#[derive(Deserialize, Debug)]
pub struct SchedulerSettings {
    /// Catch the user's plans up before every command
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
    /// Activations one plan may emit per tick; 0 disables the cap
    #[serde(default = "default_max_activations")]
    pub max_activations_per_rule: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            run_on_startup: default_run_on_startup(),
            max_activations_per_rule: default_max_activations(),
        }
    }
}

impl SchedulerSettings {
    pub fn to_core(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_activations_per_rule: NonZeroUsize::new(self.max_activations_per_rule),
        }
    }
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_run_on_startup() -> bool {
    true
}

fn default_max_activations() -> usize {
    1000
}

impl Config {
    /// Merges `rota.toml` (or the file named by `ROTA_CONFIG`) with `ROTA_*`
    /// environment variables; nested keys use `__`, e.g.
    /// `ROTA_SCHEDULER__RUN_ON_STARTUP=false`.
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(Env::var_or("ROTA_CONFIG", DEFAULT_CONFIG_FILE)))
            .merge(Env::prefixed("ROTA_").ignore(&["CONFIG"]).split("__"))
    }
}
