//! Narration resource strategies
//!
//! The sentence queue is written against `AudioBackend` only. The concrete
//! strategy is picked once per session from the platform's `AudioPolicy`:
//!
//! - **Double buffered** (permissive platforms): two elements, the next clip
//!   loads unstarted while the current one plays.
//! - **Single handle** (gesture-gated platforms): one unlocked element whose
//!   source is swapped per clip. No prefetch.
//!
//! Both keep a `should_be_playing` intent flag that only explicit pause, stop
//! or natural completion clear. The platform may pause an element behind our
//! back (a video claiming the media session); the flag tells that apart from
//! a user pause.

mod double_buffered;
mod single_handle;

pub use double_buffered::DoubleBufferedBackend;
pub use single_handle::SingleHandleBackend;

use crate::error::Result;
use crate::platform::{ClipId, MediaPlatform};
use crate::types::AudioPolicy;
use fable_core::MediaRef;

/// Clip made audible by `AudioBackend::start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedClip {
    pub clip: ClipId,
    /// Already buffered (a preloaded clip that reported ready)
    pub ready: bool,
}

/// Result of resuming a paused clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Playback continues from the paused position
    Resumed,
    /// The paused resource is gone; the caller must restart the clip
    Discarded,
}

/// Narration resource strategy
pub trait AudioBackend {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Make `source` the audible clip and start it
    ///
    /// A rejected start clears the intent flag and returns the error; the
    /// caller treats it like a clip that finished.
    fn start(
        &mut self,
        platform: &mut dyn MediaPlatform,
        source: &MediaRef,
        volume: f32,
    ) -> Result<StartedClip>;

    /// Hint that `source` plays next
    fn preload(&mut self, platform: &mut dyn MediaPlatform, source: &MediaRef, volume: f32);

    /// Explicit pause; clears the intent flag
    fn pause(&mut self, platform: &mut dyn MediaPlatform);

    /// Pause without clearing the intent flag (surface hidden)
    fn suspend(&mut self, platform: &mut dyn MediaPlatform);

    /// Resume the paused clip in place, if it is still loaded
    fn resume(&mut self, platform: &mut dyn MediaPlatform) -> ResumeOutcome;

    /// Drop the current clip after it failed or timed out
    fn abandon(&mut self, platform: &mut dyn MediaPlatform);

    /// Stop everything and dispose of every loaded resource
    fn stop(&mut self, platform: &mut dyn MediaPlatform);

    /// Natural completion of the last clip; clears the intent flag
    fn mark_done(&mut self);

    fn set_volume(&mut self, platform: &mut dyn MediaPlatform, volume: f32);

    /// Record that a clip reported ready
    fn on_ready(&mut self, clip: ClipId);

    /// Dispose of a failed preloaded clip; returns false if `clip` is not a preload
    fn discard_preload(&mut self, platform: &mut dyn MediaPlatform, clip: ClipId) -> bool;

    /// Whether `clip` belongs to this backend
    fn owns(&self, clip: ClipId) -> bool;

    /// Clip currently audible (or paused)
    fn current(&self) -> Option<ClipId>;

    /// Intent flag, independent of the element's paused state
    fn should_be_playing(&self) -> bool;

    /// Resume if we intend to play but the element was paused out-of-band
    ///
    /// Returns true if playback was restarted.
    fn nudge(&mut self, platform: &mut dyn MediaPlatform) -> bool {
        match self.current() {
            Some(clip) if self.should_be_playing() && platform.is_paused(clip) => {
                platform.play(clip).is_ok()
            }
            _ => false,
        }
    }

    /// Hand over an unlocked output element
    fn attach_output(&mut self, _handle: ClipId) {}

    /// Whether clips can be started at all
    fn is_available(&self) -> bool {
        true
    }
}

/// Pick the strategy for a platform policy
pub fn backend_for(policy: AudioPolicy) -> Box<dyn AudioBackend> {
    match policy {
        AudioPolicy::Permissive => Box::new(DoubleBufferedBackend::new()),
        AudioPolicy::GestureGated => Box::new(SingleHandleBackend::new()),
    }
}
