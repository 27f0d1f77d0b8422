/// Viewer error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid story bundle: {0}")]
    Story(String),

    #[error("Story error: {0}")]
    Core(#[from] fable_core::FableError),

    #[error("Playback error: {0}")]
    Playback(#[from] fable_playback::PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ViewerError {
    fn from(err: config::ConfigError) -> Self {
        ViewerError::Config(err.to_string())
    }
}
