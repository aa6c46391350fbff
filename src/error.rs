//! Error types for the scheduler core.
//!
//! Lookups never fail with an error: a missing task, user or project is an
//! `Option::None`. Errors are reserved for rejected input, referential
//! constraints and file/format problems.

/// Top-level error type for service, persistence and shell operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A task needs a non-empty title.
    #[error("task title cannot be empty")]
    EmptyTitle,

    /// A task needs an owner.
    #[error("task owner must be selected")]
    MissingOwner,

    /// Referenced user id does not exist.
    #[error("user {0} not found")]
    UnknownUser(u64),

    /// Referenced project id does not exist.
    #[error("project {0} not found")]
    UnknownProject(u64),

    /// Referenced task id does not exist.
    #[error("task {0} not found")]
    TaskNotFound(u64),

    /// No user or project matches the given name or id.
    #[error("{0} not found")]
    NotFound(String),

    /// User and project names must be non-empty.
    #[error("name cannot be empty")]
    EmptyName,

    /// User and project names are unique.
    #[error("'{0}' already exists")]
    DuplicateName(String),

    /// A user still owns tasks and cannot be deleted.
    #[error("user '{name}' still owns {count} task(s)")]
    UserHasTasks { name: String, count: usize },

    /// A project still has tasks and cannot be deleted.
    #[error("project '{name}' still has {count} task(s)")]
    ProjectHasTasks { name: String, count: usize },

    /// File content is valid JSON but not the expected shape.
    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or encode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SchedulerError>;
