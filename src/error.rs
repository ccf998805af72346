//! Error types for the dispatcher

use thiserror::Error;

/// Result type alias for dispatcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dispatcher operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (snapshot reads/writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operator id already present in the roster
    #[error("Operator is already registered")]
    AlreadyRegistered,

    /// Operator id unknown to the roster
    #[error("Operator is not registered")]
    NotRegistered,

    /// Operator already holds a queue entry
    #[error("Operator is already in the queue")]
    AlreadyQueued,

    /// Operator has no queue entry
    #[error("Operator is not in the queue")]
    NotQueued,

    /// Display-name lookup found no roster entry
    #[error("No registered operator named '{0}'")]
    NotFound(String),

    /// Awaiting-task index outside `[0, len)`
    #[error("Awaiting-task index {index} out of range (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Forced assignment requested against an empty queue
    #[error("No operators available")]
    NoOperatorsAvailable,

    /// Direct assignment targeted an unknown display name
    #[error("Operator '{0}' not found in register")]
    OperatorNotFound(String),

    /// Caller lacks membership in the allowed admin group
    #[error("Permission denied")]
    PermissionDenied,

    /// Language tag outside the supported set
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Command text could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Chat-platform notification failed
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Audit sink failure (logged by the audit worker, never surfaced to dispatch callers)
    #[error("Audit write failed: {0}")]
    Audit(String),

    /// Identity lookup against the chat platform failed
    #[error("Identity lookup failed: {0}")]
    Identity(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// User-facing message for the ephemeral command response
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Error::AlreadyRegistered => "You are already registered.".to_string(),
            Error::NotRegistered => "You are not registered. Please register first.".to_string(),
            Error::AlreadyQueued => "You are already in the queue.".to_string(),
            Error::NotQueued => "You are not in the queue.".to_string(),
            Error::NotFound(name) => {
                format!("User with display name {name} not found.")
            }
            Error::OperatorNotFound(name) => {
                format!("User with display name {name} not found in register.")
            }
            Error::IndexOutOfRange { index, len } => {
                // The external interface numbers tasks from 1
                format!(
                    "Task number {} is out of range (awaiting list has {len} tasks).",
                    index + 1
                )
            }
            Error::NoOperatorsAvailable => "No operators available.".to_string(),
            Error::PermissionDenied => {
                "You do not have permission to perform this action.".to_string()
            }
            Error::UnsupportedLanguage(lang) => format!("Unsupported language: {lang}."),
            Error::InvalidCommand(_) => {
                "Incorrect usage of the command. Ensure your message and language are properly quoted."
                    .to_string()
            }
            Error::Notify(_) => "Failed to post to the channel.".to_string(),
            Error::Identity(_) => "Failed to retrieve display name.".to_string(),
            _ => "Internal error.".to_string(),
        }
    }
}
