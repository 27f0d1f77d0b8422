/// Core error types for Fable Viewer
use thiserror::Error;

/// Result type alias using `FableError`
pub type Result<T> = std::result::Result<T, FableError>;

/// Core error type for Fable Viewer
#[derive(Error, Debug)]
pub enum FableError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Network or remote API errors
    #[error("Network error: {0}")]
    Network(String),

    /// Progress persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

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

impl FableError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = FableError::not_found("Page", "story-1/7");
        assert_eq!(err.to_string(), "Page not found: story-1/7");
    }

    #[test]
    fn serde_errors_convert() {
        let err: FableError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FableError::Serialization(_)));
    }
}
