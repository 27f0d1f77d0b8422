//! Audio unlock handshake
//!
//! Gesture-gated runtimes refuse to start audio unless an unlock handshake ran
//! inside a user-initiated input event. The gate performs that handshake once
//! and then lends the resulting output element to the narration backend for
//! the rest of the session.

use crate::error::{PlaybackError, Result};
use crate::platform::{ClipId, MediaPlatform};
use crate::types::AudioPolicy;

/// Gate state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockState {
    /// Platform does not gate audio
    NotRequired,

    /// Waiting for a user gesture
    Locked,

    /// Handshake done; the output element is reusable
    Unlocked(ClipId),

    /// Last handshake was refused; a later gesture may retry
    Rejected(String),
}

/// Owner of the unlocked narration output
#[derive(Debug)]
pub struct AudioUnlockGate {
    state: UnlockState,
}

impl AudioUnlockGate {
    pub fn new(policy: AudioPolicy) -> Self {
        let state = match policy {
            AudioPolicy::Permissive => UnlockState::NotRequired,
            AudioPolicy::GestureGated => UnlockState::Locked,
        };
        Self { state }
    }

    pub fn state(&self) -> &UnlockState {
        &self.state
    }

    /// Whether narration may start
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state,
            UnlockState::NotRequired | UnlockState::Unlocked(_)
        )
    }

    /// Whether a gesture is still needed
    pub fn needs_unlock(&self) -> bool {
        matches!(self.state, UnlockState::Locked | UnlockState::Rejected(_))
    }

    /// Unlocked output element, if any
    pub fn handle(&self) -> Option<ClipId> {
        match self.state {
            UnlockState::Unlocked(handle) => Some(handle),
            _ => None,
        }
    }

    /// Run the unlock handshake (call from inside a user gesture)
    ///
    /// # Returns
    /// * `Ok(Some(handle))` - Output unlocked (or already was)
    /// * `Ok(None)` - Platform does not gate audio
    /// * `Err(UnlockRejected)` - Handshake refused; the gate stays retryable
    pub fn acquire(&mut self, platform: &mut dyn MediaPlatform) -> Result<Option<ClipId>> {
        match &self.state {
            UnlockState::NotRequired => Ok(None),
            UnlockState::Unlocked(handle) => Ok(Some(*handle)),
            UnlockState::Locked | UnlockState::Rejected(_) => match platform.unlock_output() {
                Ok(handle) => {
                    tracing::info!(clip = %handle, "Audio output unlocked");
                    self.state = UnlockState::Unlocked(handle);
                    Ok(Some(handle))
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(error = %reason, "Audio unlock rejected");
                    self.state = UnlockState::Rejected(reason.clone());
                    Err(PlaybackError::UnlockRejected(reason))
                }
            },
        }
    }

    /// Dispose of the output element at session teardown
    pub fn release(&mut self, platform: &mut dyn MediaPlatform) {
        if let UnlockState::Unlocked(handle) = self.state {
            platform.release(handle);
            self.state = UnlockState::Locked;
        }
    }
}
