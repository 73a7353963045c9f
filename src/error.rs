//! Error types for the timeline engine.

use std::path::PathBuf;

use crate::task::TaskId;

/// Failures of the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid task data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task {0} does not exist")]
    UnknownTask(TaskId),

    /// Backend-specific failure reported by a non-file store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Input rejected at the create/edit boundary, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task name cannot be empty")]
    EmptyName,

    #[error("end date must be after start date")]
    EndNotAfterStart,

    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),

    #[error("'{0}' is not a #rrggbb colour")]
    InvalidColor(String),

    #[error("parent task {0} does not exist")]
    UnknownParent(TaskId),

    #[error("task {task} cannot be moved under {parent}: that would create a cycle")]
    ParentCycle { task: TaskId, parent: TaskId },

    #[error("dependency {0} does not exist")]
    UnknownDependency(TaskId),

    #[error("issue description cannot be empty")]
    EmptyIssue,

    #[error("task {task} has no issue {issue}")]
    UnknownIssue { task: TaskId, issue: u64 },
}

/// Errors surfaced by [`crate::planner::Planner`] mutations.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Problems reading `config.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("palette colour '{0}' is not a #rrggbb colour")]
    InvalidPaletteColor(String),

    #[error("palette must contain at least one colour")]
    EmptyPalette,
}
