//! Background music
//!
//! One looping track per story. It is started once when the session opens and
//! survives page changes. Volume is a fraction of a fixed ceiling so music
//! always sits below narration.

use crate::context::Ctx;
use crate::platform::{ClipId, LoadRequest, MediaEvent, MediaEventKind};
use crate::volume::Volume;
use fable_core::MediaRef;
use tracing::{debug, warn};

/// Why music is temporarily held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendReason {
    /// Hosting surface is hidden
    Hidden,
    /// Narration is claiming the audio output for an unlock handshake
    Unlock,
}

/// Background music controller
#[derive(Debug)]
pub struct MusicController {
    clip: Option<ClipId>,
    volume: Volume,
    enabled: bool,
    suspensions: Vec<SuspendReason>,
    /// Platform accepted the last play request
    playing: bool,
}

impl MusicController {
    pub fn new(level: u8, ceiling: f32, enabled: bool) -> Self {
        Self {
            clip: None,
            volume: Volume::with_ceiling(level, ceiling),
            enabled,
            suspensions: Vec::new(),
            playing: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn level(&self) -> u8 {
        self.volume.level()
    }

    pub fn gain(&self) -> f32 {
        self.volume.gain()
    }

    pub fn owns(&self, clip: ClipId) -> bool {
        self.clip == Some(clip)
    }

    /// Whether music should currently be audible
    pub fn should_play(&self) -> bool {
        self.enabled && self.suspensions.is_empty() && self.clip.is_some()
    }

    /// Load the story's track and start it if enabled
    pub(crate) fn start(&mut self, ctx: &mut Ctx<'_>, source: Option<&MediaRef>) {
        let Some(source) = source else {
            debug!("Story has no background music");
            return;
        };

        match ctx
            .platform
            .load(LoadRequest::music(source.clone(), self.volume.gain()))
        {
            Ok(clip) => {
                self.clip = Some(clip);
                self.apply(ctx);
            }
            Err(e) => warn!(source = %source, error = %e, "Background music load failed"),
        }
    }

    pub(crate) fn set_enabled(&mut self, ctx: &mut Ctx<'_>, enabled: bool) {
        self.enabled = enabled;
        self.apply(ctx);
    }

    pub(crate) fn set_level(&mut self, ctx: &mut Ctx<'_>, level: u8) {
        self.volume.set_level(level);
        if let Some(clip) = self.clip {
            ctx.platform.set_volume(clip, self.volume.gain());
        }
    }

    pub(crate) fn suspend(&mut self, ctx: &mut Ctx<'_>, reason: SuspendReason) {
        if !self.suspensions.contains(&reason) {
            self.suspensions.push(reason);
        }
        self.apply(ctx);
    }

    pub(crate) fn release(&mut self, ctx: &mut Ctx<'_>, reason: SuspendReason) {
        self.suspensions.retain(|r| *r != reason);
        self.apply(ctx);
    }

    /// Resume if music should be playing but is not (rejected start, external pause)
    pub(crate) fn nudge(&mut self, ctx: &mut Ctx<'_>) -> bool {
        let Some(clip) = self.clip else {
            return false;
        };
        if !self.should_play() {
            return false;
        }
        if self.playing && !ctx.platform.is_paused(clip) {
            return false;
        }
        self.playing = false;
        self.apply(ctx);
        self.playing
    }

    pub(crate) fn on_media_event(&mut self, ctx: &mut Ctx<'_>, event: &MediaEvent) {
        let Some(clip) = self.clip.filter(|c| *c == event.clip) else {
            return;
        };

        match &event.kind {
            MediaEventKind::Ready => {}
            MediaEventKind::Ended => {
                // Looping should never end; restart defensively
                if self.playing {
                    if let Err(e) = ctx.platform.restart(clip) {
                        warn!(error = %e, "Background music restart failed");
                        self.playing = false;
                    }
                }
            }
            MediaEventKind::Failed(reason) => {
                warn!(reason = %reason, "Background music failed");
                ctx.platform.release(clip);
                self.clip = None;
                self.playing = false;
            }
        }
    }

    pub(crate) fn teardown(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(clip) = self.clip.take() {
            ctx.platform.release(clip);
        }
        self.playing = false;
    }

    fn apply(&mut self, ctx: &mut Ctx<'_>) {
        let Some(clip) = self.clip else {
            return;
        };

        match (self.should_play(), self.playing) {
            (true, false) => match ctx.platform.play(clip) {
                Ok(()) => self.playing = true,
                Err(e) => debug!(error = %e, "Background music start rejected"),
            },
            (false, true) => {
                ctx.platform.pause(clip);
                self.playing = false;
            }
            _ => {}
        }
    }
}
