/// Core error types for Volume Crisis
use thiserror::Error;

/// Result type alias using `CrisisError`
pub type Result<T> = std::result::Result<T, CrisisError>;

/// Core error type for Volume Crisis
#[derive(Error, Debug)]
pub enum CrisisError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Actuator discovery or write errors
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Keep-alive / background audio errors
    #[error("Background audio error: {0}")]
    Background(String),

    /// A level outside the valid [0, 1] range reached a boundary that
    /// requires it to already be clamped
    #[error("Invalid level: {0}")]
    InvalidLevel(f32),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CrisisError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an actuator error
    pub fn actuator(msg: impl Into<String>) -> Self {
        Self::Actuator(msg.into())
    }

    /// Create a background audio error
    pub fn background(msg: impl Into<String>) -> Self {
        Self::Background(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
