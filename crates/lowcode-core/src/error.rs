use action_client::ActionClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LowcodeError {
    #[error("not initialized: run 'lowcode init'")]
    NotInitialized,

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("action already exists: {0}")]
    ActionExists(String),

    #[error("invalid action id '{0}': use only letters, digits, '_' or '-'")]
    InvalidActionId(String),

    #[error("display name already in use: {0}")]
    DuplicateDisplayName(String),

    #[error("invalid display name '{0}': must start with a letter, '_' or '$' and contain only letters, digits, '_' or '$'")]
    InvalidDisplayName(String),

    #[error("stale rename for action {action_id}: expected display name '{expected}', found '{found}'")]
    StaleRename {
        action_id: String,
        expected: String,
        found: String,
    },

    #[error("invalid action descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Client(#[from] ActionClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LowcodeError>;
