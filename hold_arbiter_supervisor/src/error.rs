use hold_arbiter_core::ValidationError;

/// Hold state store failures. Never conflated with "no hold in progress".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("hold store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("corrupt entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage io error: {reason}")]
    Io { reason: String },

    #[error("failed to serialize {key}: {reason}")]
    Serialize { key: String, reason: String },
}

impl StorageError {
    pub(crate) fn poisoned() -> Self {
        StorageError::Unavailable {
            reason: "store mutex poisoned".to_string(),
        }
    }
}

/// Recheck or adjudication call failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteCallError {
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error("remote rejected the call with code {code}")]
    Rejected { code: i32 },

    #[error("remote endpoint unreachable")]
    Unreachable,
}

/// Durable scheduling facility refused a registration change.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler rejected task {task}: {reason}")]
    Rejected { task: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("unknown task name: {0}")]
    UnknownTask(String),

    #[error("fallback timer could not be armed: {reason}")]
    Fallback { reason: String },
}

/// Adjudication aborted as a whole; no partial classification is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdjudicationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteCallError),
}
