use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Relation already exists: {0}")]
    DuplicateRelation(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid end condition: {0}")]
    InvalidEndCondition(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, Name)
}

/// Coarse classification recorded in scheduler reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPeriod,
    InvalidEndCondition,
    NotFound,
    Storage,
    Other,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidPeriod(_) => ErrorKind::InvalidPeriod,
            CoreError::InvalidEndCondition(_) => ErrorKind::InvalidEndCondition,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Database(_)
            | CoreError::Migration(_)
            | CoreError::Io(_)
            | CoreError::Conflict(_) => ErrorKind::Storage,
            _ => ErrorKind::Other,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidPeriod => write!(f, "invalid period"),
            ErrorKind::InvalidEndCondition => write!(f, "invalid end condition"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}
