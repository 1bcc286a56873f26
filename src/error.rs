use thiserror::Error;

/// Result type used across the service, repository and object store layers
pub type Result<T> = std::result::Result<T, AppError>;

/// Error taxonomy shared by every layer below the HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested task/session/media/link row is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request payload failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Object store network/auth failure
    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),

    /// Database transport or query failure (not a missing row)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} '{}' not found", what, id))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}
