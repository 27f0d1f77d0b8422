//! Two-slot narration backend for permissive platforms

use super::{AudioBackend, ResumeOutcome, StartedClip};
use crate::error::Result;
use crate::platform::{ClipId, LoadRequest, MediaPlatform};
use fable_core::MediaRef;

#[derive(Debug, Clone)]
struct Slot {
    clip: ClipId,
    source: MediaRef,
    ready: bool,
}

/// Double-buffered narration
///
/// While slot A plays clip *i*, clip *i+1* loads unstarted into slot B. When
/// *i* ends, B becomes the active slot and A is released. Slots swap roles on
/// every clip.
#[derive(Debug, Default)]
pub struct DoubleBufferedBackend {
    slots: [Option<Slot>; 2],
    active: usize,
    should_be_playing: bool,
}

impl DoubleBufferedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn standby(&self) -> usize {
        1 - self.active
    }

    fn release_slot(&mut self, platform: &mut dyn MediaPlatform, index: usize) {
        if let Some(slot) = self.slots[index].take() {
            platform.release(slot.clip);
        }
    }

    /// Number of loaded elements (at most two)
    pub fn loaded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl AudioBackend for DoubleBufferedBackend {
    fn name(&self) -> &'static str {
        "double-buffered"
    }

    fn start(
        &mut self,
        platform: &mut dyn MediaPlatform,
        source: &MediaRef,
        volume: f32,
    ) -> Result<StartedClip> {
        let standby = self.standby();
        let preloaded = self.slots[standby]
            .as_ref()
            .is_some_and(|slot| &slot.source == source);

        self.release_slot(platform, self.active);
        if preloaded {
            self.active = standby;
        } else {
            // Stale preload for some other clip
            self.release_slot(platform, standby);
            let clip = platform.load(LoadRequest::narration(source.clone(), volume))?;
            self.slots[self.active] = Some(Slot {
                clip,
                source: source.clone(),
                ready: false,
            });
        }

        let Some(slot) = self.slots[self.active].clone() else {
            return Err(crate::error::PlaybackError::media("active slot empty"));
        };

        platform.set_volume(slot.clip, volume);
        if let Err(e) = platform.play(slot.clip) {
            self.should_be_playing = false;
            self.release_slot(platform, self.active);
            return Err(e);
        }

        self.should_be_playing = true;
        Ok(StartedClip {
            clip: slot.clip,
            ready: slot.ready,
        })
    }

    fn preload(&mut self, platform: &mut dyn MediaPlatform, source: &MediaRef, volume: f32) {
        let standby = self.standby();
        if self.slots[standby]
            .as_ref()
            .is_some_and(|slot| &slot.source == source)
        {
            return;
        }

        self.release_slot(platform, standby);
        match platform.load(LoadRequest::narration(source.clone(), volume)) {
            Ok(clip) => {
                self.slots[standby] = Some(Slot {
                    clip,
                    source: source.clone(),
                    ready: false,
                });
            }
            Err(e) => {
                // Start will retry the load
                tracing::debug!(source = %source, error = %e, "Preload failed");
            }
        }
    }

    fn pause(&mut self, platform: &mut dyn MediaPlatform) {
        if let Some(clip) = self.current() {
            platform.pause(clip);
        }
        self.should_be_playing = false;
    }

    fn suspend(&mut self, platform: &mut dyn MediaPlatform) {
        if let Some(clip) = self.current() {
            platform.pause(clip);
        }
    }

    fn resume(&mut self, platform: &mut dyn MediaPlatform) -> ResumeOutcome {
        let Some(clip) = self.current() else {
            return ResumeOutcome::Discarded;
        };

        if platform.can_resume(clip) && platform.play(clip).is_ok() {
            self.should_be_playing = true;
            return ResumeOutcome::Resumed;
        }

        self.release_slot(platform, self.active);
        ResumeOutcome::Discarded
    }

    fn abandon(&mut self, platform: &mut dyn MediaPlatform) {
        self.release_slot(platform, self.active);
        self.should_be_playing = false;
    }

    fn stop(&mut self, platform: &mut dyn MediaPlatform) {
        self.release_slot(platform, 0);
        self.release_slot(platform, 1);
        self.active = 0;
        self.should_be_playing = false;
    }

    fn mark_done(&mut self) {
        self.should_be_playing = false;
    }

    fn set_volume(&mut self, platform: &mut dyn MediaPlatform, volume: f32) {
        for slot in self.slots.iter().flatten() {
            platform.set_volume(slot.clip, volume);
        }
    }

    fn on_ready(&mut self, clip: ClipId) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.clip == clip {
                slot.ready = true;
            }
        }
    }

    fn discard_preload(&mut self, platform: &mut dyn MediaPlatform, clip: ClipId) -> bool {
        let standby = self.standby();
        if self.slots[standby].as_ref().is_some_and(|s| s.clip == clip) {
            self.release_slot(platform, standby);
            return true;
        }
        false
    }

    fn owns(&self, clip: ClipId) -> bool {
        self.slots.iter().flatten().any(|slot| slot.clip == clip)
    }

    fn current(&self) -> Option<ClipId> {
        self.slots[self.active].as_ref().map(|slot| slot.clip)
    }

    fn should_be_playing(&self) -> bool {
        self.should_be_playing
    }
}
