//! Single unlocked element backend for gesture-gated platforms

use super::{AudioBackend, ResumeOutcome, StartedClip};
use crate::error::{PlaybackError, Result};
use crate::platform::{ClipId, MediaPlatform};
use fable_core::MediaRef;

/// Reuses one unlocked output element, swapping its source per clip
///
/// The element comes from `AudioUnlockGate`; this backend never releases it.
/// Clip-to-clip latency is accepted since there is no second unlocked element
/// to preload into.
#[derive(Debug, Default)]
pub struct SingleHandleBackend {
    handle: Option<ClipId>,
    source: Option<MediaRef>,
    should_be_playing: bool,
}

impl SingleHandleBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<ClipId> {
        self.handle
    }
}

impl AudioBackend for SingleHandleBackend {
    fn name(&self) -> &'static str {
        "single-handle"
    }

    fn start(
        &mut self,
        platform: &mut dyn MediaPlatform,
        source: &MediaRef,
        volume: f32,
    ) -> Result<StartedClip> {
        let handle = self.handle.ok_or(PlaybackError::OutputLocked)?;

        platform.set_source(handle, source)?;
        platform.set_volume(handle, volume);
        self.source = Some(source.clone());

        match platform.play(handle) {
            Ok(()) => {
                self.should_be_playing = true;
                Ok(StartedClip {
                    clip: handle,
                    ready: false,
                })
            }
            Err(e) => {
                self.should_be_playing = false;
                Err(e)
            }
        }
    }

    fn preload(&mut self, _platform: &mut dyn MediaPlatform, source: &MediaRef, _volume: f32) {
        tracing::trace!(source = %source, "Single handle cannot preload");
    }

    fn pause(&mut self, platform: &mut dyn MediaPlatform) {
        if let Some(handle) = self.handle {
            platform.pause(handle);
        }
        self.should_be_playing = false;
    }

    fn suspend(&mut self, platform: &mut dyn MediaPlatform) {
        if let Some(handle) = self.handle {
            platform.pause(handle);
        }
    }

    fn resume(&mut self, platform: &mut dyn MediaPlatform) -> ResumeOutcome {
        match self.handle {
            Some(handle)
                if self.source.is_some()
                    && platform.can_resume(handle)
                    && platform.play(handle).is_ok() =>
            {
                self.should_be_playing = true;
                ResumeOutcome::Resumed
            }
            _ => {
                self.source = None;
                ResumeOutcome::Discarded
            }
        }
    }

    fn abandon(&mut self, platform: &mut dyn MediaPlatform) {
        if let Some(handle) = self.handle {
            platform.pause(handle);
        }
        self.source = None;
        self.should_be_playing = false;
    }

    fn stop(&mut self, platform: &mut dyn MediaPlatform) {
        self.abandon(platform);
    }

    fn mark_done(&mut self) {
        self.should_be_playing = false;
    }

    fn set_volume(&mut self, platform: &mut dyn MediaPlatform, volume: f32) {
        if let Some(handle) = self.handle {
            platform.set_volume(handle, volume);
        }
    }

    fn on_ready(&mut self, _clip: ClipId) {}

    fn discard_preload(&mut self, _platform: &mut dyn MediaPlatform, _clip: ClipId) -> bool {
        false
    }

    fn owns(&self, clip: ClipId) -> bool {
        self.handle == Some(clip)
    }

    fn current(&self) -> Option<ClipId> {
        self.source.as_ref().and(self.handle)
    }

    fn should_be_playing(&self) -> bool {
        self.should_be_playing
    }

    fn attach_output(&mut self, handle: ClipId) {
        self.handle = Some(handle);
    }

    fn is_available(&self) -> bool {
        self.handle.is_some()
    }
}
