//! Error types for playback orchestration

use fable_core::FableError;
use thiserror::Error;

/// Playback errors
///
/// Only session opening surfaces errors to the host. Everything that can go
/// wrong once a session runs (load failures, unlock rejection, persistence
/// failures) is recovered internally.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Story has no pages
    #[error("Story has no pages")]
    EmptyStory,

    /// Page index outside the story
    #[error("Page {index} out of range (story has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// Collaborator (page provider, progress store) failed
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] FableError),

    /// Platform media error
    #[error("Media error: {0}")]
    Media(String),

    /// Platform refused the audio unlock handshake
    #[error("Audio unlock rejected: {0}")]
    UnlockRejected(String),

    /// Narration output has not been unlocked yet
    #[error("Audio output not unlocked")]
    OutputLocked,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session was already closed
    #[error("Session closed")]
    SessionClosed,
}

impl PlaybackError {
    /// Create a media error
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
