use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Operation not allowed: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejected campaign lifecycle transition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("campaign is already launched")]
    AlreadyLaunched,
    #[error("campaign is already completed")]
    AlreadyCompleted,
    #[error("campaign is disabled")]
    Disabled,
    #[error("campaign has not been launched")]
    NotLaunched,
    #[error("campaign has a dispatch run in progress")]
    RunInProgress,
    #[error("campaign was edited while it was being launched")]
    ChangedDuringLaunch,
}

impl StateError {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateError::AlreadyLaunched => "already_launched",
            StateError::AlreadyCompleted => "already_completed",
            StateError::Disabled => "disabled",
            StateError::NotLaunched => "not_launched",
            StateError::RunInProgress => "run_in_progress",
            StateError::ChangedDuringLaunch => "changed_during_launch",
        }
    }
}
