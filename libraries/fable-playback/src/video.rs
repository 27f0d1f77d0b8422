//! Page video completion
//!
//! A video page counts as done once its clip has played one full cycle. The
//! clip then plays at most `video_max_cycles` cycles in total before stopping
//! on its last frame. A fallback timer armed at page entry forces completion
//! if the asset never loads, never becomes ready or never ends; a load error
//! completes immediately.

use crate::context::Ctx;
use crate::events::PlaybackEvent;
use crate::generation::Generation;
use crate::platform::{ClipId, LoadRequest, MediaEvent, MediaEventKind};
use crate::timer::TimerKind;
use fable_core::{MediaRef, Page};
use tracing::{debug, info, warn};

/// Where the page video is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoPhase {
    /// Page has no video
    #[default]
    Absent,
    /// Waiting for the delayed load
    Waiting,
    /// Load requested, waiting for ready
    Loading,
    Playing,
    /// Played all cycles (or failed)
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct VideoClip {
    clip: ClipId,
    generation: Generation,
}

/// Video completion controller for the current page
#[derive(Debug, Default)]
pub struct VideoController {
    page: usize,
    source: Option<MediaRef>,
    clip: Option<VideoClip>,
    phase: VideoPhase,
    cycles: u32,
    completed: bool,
    completion_unreported: bool,
    visible: bool,
}

impl VideoController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VideoPhase {
        self.phase
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Completed cycles of the current clip
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn owns(&self, clip: ClipId) -> bool {
        self.clip.is_some_and(|c| c.clip == clip)
    }

    /// Report completion once; returns true the first time after it happened
    pub fn take_completion(&mut self) -> bool {
        std::mem::take(&mut self.completion_unreported)
    }

    /// Set up the page's video. Returns true if the page has one.
    pub(crate) fn enter_page(&mut self, ctx: &mut Ctx<'_>, page: &Page) -> bool {
        self.teardown(ctx);
        self.page = page.index;
        self.cycles = 0;
        self.completion_unreported = false;

        let Some(video) = page.video() else {
            self.completed = true;
            self.source = None;
            return false;
        };

        self.completed = false;
        self.source = Some(video.clone());
        self.phase = VideoPhase::Waiting;
        let (load_delay, fallback) = (ctx.config.video_load_delay(), ctx.config.video_fallback());
        ctx.schedule(TimerKind::VideoLoad, load_delay);
        ctx.schedule(TimerKind::VideoFallback, fallback);
        debug!(page = self.page, source = %video, "Video scheduled");
        true
    }

    /// Delayed load timer fired
    pub(crate) fn on_load_timer(&mut self, ctx: &mut Ctx<'_>) {
        if self.phase != VideoPhase::Waiting {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };

        match ctx.platform.load(LoadRequest::video(source)) {
            Ok(clip) => {
                self.clip = Some(VideoClip {
                    clip,
                    generation: ctx.generation,
                });
                self.phase = VideoPhase::Loading;
            }
            Err(e) => {
                warn!(page = self.page, error = %e, "Video load failed");
                self.phase = VideoPhase::Stopped;
                self.complete(ctx);
            }
        }
    }

    /// Fallback timer fired
    pub(crate) fn on_fallback(&mut self, ctx: &mut Ctx<'_>) {
        if self.completed {
            return;
        }
        warn!(page = self.page, phase = ?self.phase, "Video fallback forcing completion");
        self.complete(ctx);
    }

    pub(crate) fn on_media_event(&mut self, ctx: &mut Ctx<'_>, event: &MediaEvent) {
        let Some(current) = self.clip.filter(|c| c.clip == event.clip) else {
            return;
        };
        if !ctx.generation.is_current(current.generation) {
            debug!(clip = %event.clip, "Stale video event ignored");
            return;
        }

        match &event.kind {
            MediaEventKind::Ready => {
                if self.phase != VideoPhase::Loading {
                    return;
                }
                match ctx.platform.play(current.clip) {
                    Ok(()) => {
                        self.phase = VideoPhase::Playing;
                        self.set_visible(ctx, true);
                        let nudge = ctx.config.video_resume_nudge();
                        ctx.schedule(TimerKind::VideoResumeNudge, nudge);
                    }
                    Err(e) => {
                        warn!(page = self.page, error = %e, "Video play rejected");
                        self.phase = VideoPhase::Stopped;
                        self.complete(ctx);
                    }
                }
            }
            MediaEventKind::Ended => {
                self.cycles += 1;
                self.complete(ctx);
                if self.cycles < ctx.config.video_max_cycles {
                    if let Err(e) = ctx.platform.restart(current.clip) {
                        warn!(page = self.page, error = %e, "Video restart failed");
                        self.phase = VideoPhase::Stopped;
                    }
                } else {
                    debug!(page = self.page, cycles = self.cycles, "Video stopped");
                    ctx.platform.pause(current.clip);
                    self.phase = VideoPhase::Stopped;
                }
            }
            MediaEventKind::Failed(reason) => {
                warn!(page = self.page, reason = %reason, "Video failed");
                ctx.platform.release(current.clip);
                self.clip = None;
                self.phase = VideoPhase::Stopped;
                self.set_visible(ctx, false);
                self.complete(ctx);
            }
        }
    }

    /// Keep the loaded clip across a generation change that leaves the page in place
    pub(crate) fn adopt(&mut self, generation: Generation) {
        if let Some(current) = self.clip.as_mut() {
            current.generation = generation;
        }
    }

    /// Release the clip and cancel video timers
    pub(crate) fn teardown(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(current) = self.clip.take() {
            ctx.platform.release(current.clip);
        }
        ctx.timers.cancel_where(|kind| {
            matches!(
                kind,
                TimerKind::VideoLoad | TimerKind::VideoFallback | TimerKind::VideoResumeNudge
            )
        });
        self.phase = VideoPhase::Absent;
        self.set_visible(ctx, false);
    }

    fn complete(&mut self, ctx: &mut Ctx<'_>) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.completion_unreported = true;
        ctx.timers.cancel(TimerKind::VideoFallback);
        ctx.emit(PlaybackEvent::VideoCompleted { page: self.page });
        info!(page = self.page, cycles = self.cycles, "Video complete");
    }

    fn set_visible(&mut self, ctx: &mut Ctx<'_>, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            ctx.emit(PlaybackEvent::VideoVisibilityChanged { visible });
        }
    }
}
