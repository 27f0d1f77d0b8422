//! Sentence narration queue
//!
//! Plays a page's narration clips strictly in order, one audible clip at a
//! time, with a fixed gap between sentences. Sentences without audio for the
//! active language keep their slot but are skipped without ever entering
//! `Playing`.
//!
//! Pages without any sentence audio fall back to page mode: the legacy
//! whole-page clip is played as a single item, or the queue completes at once
//! if there is none.
//!
//! Every continuation (gap timer, load timeout, clip events) is checked against
//! a local epoch as well as the session generation. The epoch moves on internal
//! restarts (seek, resume of a discarded clip, re-enable) that must not disturb
//! the rest of the session.

use crate::backend::{AudioBackend, ResumeOutcome};
use crate::context::Ctx;
use crate::events::PlaybackEvent;
use crate::generation::Generation;
use crate::platform::{ClipId, MediaEvent, MediaEventKind};
use crate::timer::TimerKind;
use crate::types::{NarrationMode, QueueState};
use fable_core::{Language, MediaRef, Page};
use tracing::{debug, info, warn};

/// One ordering slot of the page
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueItem {
    /// Sentence index, `None` for the page-mode item
    sentence: Option<usize>,
    source: Option<MediaRef>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveClip {
    clip: ClipId,
    position: usize,
    generation: Generation,
    epoch: u64,
    ready: bool,
}

/// Ordered narration player for the current page
pub struct SentenceQueue {
    backend: Box<dyn AudioBackend>,
    items: Vec<QueueItem>,
    mode: NarrationMode,
    page: usize,
    cursor: usize,
    state: QueueState,
    epoch: u64,
    active: Option<ActiveClip>,
    /// Position waiting for the inter-sentence gap to elapse
    pending_gap: Option<usize>,
    /// Gap elapsed while suspended; play `pending_gap` on unsuspend
    gap_deferred: bool,
    suspended: bool,
    gain: f32,
    completed: bool,
    completion_unreported: bool,
}

impl SentenceQueue {
    pub fn new(backend: Box<dyn AudioBackend>, gain: f32) -> Self {
        Self {
            backend,
            items: Vec::new(),
            mode: NarrationMode::Sentence,
            page: 0,
            cursor: 0,
            state: QueueState::Idle,
            epoch: 0,
            active: None,
            pending_gap: None,
            gap_deferred: false,
            suspended: false,
            gain,
            completed: false,
            completion_unreported: false,
        }
    }

    // ===== Accessors =====

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn mode(&self) -> NarrationMode {
        self.mode
    }

    /// Sentence to highlight, `None` in page mode or when idle
    pub fn current_sentence(&self) -> Option<usize> {
        if self.state == QueueState::Idle {
            return None;
        }
        self.items.get(self.cursor).and_then(|item| item.sentence)
    }

    /// Whether the page has anything to narrate in the loaded language
    pub fn has_audio(&self) -> bool {
        self.items.iter().any(|item| item.source.is_some())
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn should_be_playing(&self) -> bool {
        self.backend.should_be_playing()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn owns(&self, clip: ClipId) -> bool {
        self.backend.owns(clip)
    }

    /// Report completion once; returns true the first time after it happened
    pub fn take_completion(&mut self) -> bool {
        std::mem::take(&mut self.completion_unreported)
    }

    // ===== Lifecycle =====

    /// Hand over the unlocked output element (gesture-gated platforms)
    pub(crate) fn attach_output(&mut self, handle: ClipId) {
        self.backend.attach_output(handle);
    }

    /// Replace the queue contents with a page's narration, without starting it
    pub(crate) fn load_page(&mut self, ctx: &mut Ctx<'_>, page: &Page, language: Language) {
        self.halt(ctx);
        self.page = page.index;
        self.cursor = 0;
        self.completed = false;
        self.completion_unreported = false;

        if page.has_sentence_audio(language) {
            self.mode = NarrationMode::Sentence;
            self.items = page
                .sentences
                .iter()
                .map(|s| QueueItem {
                    sentence: Some(s.index),
                    source: s.audio_for(language).cloned(),
                })
                .collect();
        } else {
            self.mode = NarrationMode::Page;
            self.items = vec![QueueItem {
                sentence: None,
                source: page.legacy_audio(language).cloned(),
            }];
        }

        self.set_state(ctx, QueueState::Idle);
        debug!(
            page = self.page,
            mode = ?self.mode,
            items = self.items.len(),
            "Narration loaded"
        );
    }

    /// Start from the first item
    pub(crate) fn start(&mut self, ctx: &mut Ctx<'_>) {
        self.play_from(ctx, 0);
    }

    /// Start again from the current item (narration re-enabled, output unlocked)
    pub(crate) fn restart_current(&mut self, ctx: &mut Ctx<'_>) {
        self.halt(ctx);
        self.completed = false;
        self.completion_unreported = false;
        self.play_from(ctx, self.cursor);
    }

    /// Jump to an ordering position and play from there
    ///
    /// Returns false if the position is outside the page.
    pub(crate) fn seek(&mut self, ctx: &mut Ctx<'_>, position: usize) -> bool {
        if position >= self.items.len() {
            return false;
        }
        self.halt(ctx);
        self.completed = false;
        self.completion_unreported = false;
        self.play_from(ctx, position);
        true
    }

    /// Explicit pause. Returns true if something was playing.
    pub(crate) fn pause(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if self.state != QueueState::Playing {
            return false;
        }

        if let Some(position) = self.pending_gap.take() {
            self.cursor = position;
            self.gap_deferred = false;
            self.cancel_timers(ctx);
        }
        self.backend.pause(ctx.platform);
        self.set_state(ctx, QueueState::Paused);
        true
    }

    /// Resume after an explicit pause
    ///
    /// Continues the paused clip in place if the platform still holds it,
    /// otherwise restarts the same position.
    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if self.state != QueueState::Paused {
            return false;
        }

        if self.active.is_some() && !self.suspended {
            if self.backend.resume(ctx.platform) == ResumeOutcome::Resumed {
                self.set_state(ctx, QueueState::Playing);
                return true;
            }
            debug!(page = self.page, position = self.cursor, "Paused clip discarded, restarting");
        }

        self.halt(ctx);
        self.play_from(ctx, self.cursor);
        true
    }

    /// Stop without completing (narration disabled). The cursor is kept.
    pub(crate) fn stop(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(position) = self.pending_gap {
            self.cursor = position;
        }
        self.halt(ctx);
        if self.state == QueueState::Playing {
            self.set_state(ctx, QueueState::Paused);
        }
    }

    /// Tear everything down and forget the page
    pub(crate) fn reset(&mut self, ctx: &mut Ctx<'_>) {
        self.halt(ctx);
        self.items.clear();
        self.cursor = 0;
        self.completed = false;
        self.completion_unreported = false;
        self.set_state(ctx, QueueState::Idle);
    }

    /// Surface hidden: pause without dropping the intent to play
    pub(crate) fn suspend(&mut self, ctx: &mut Ctx<'_>) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        self.backend.suspend(ctx.platform);
    }

    /// Surface visible again
    pub(crate) fn unsuspend(&mut self, ctx: &mut Ctx<'_>) {
        if !self.suspended {
            return;
        }
        self.suspended = false;

        if self.state != QueueState::Playing {
            return;
        }

        if self.gap_deferred {
            self.gap_deferred = false;
            if let Some(position) = self.pending_gap.take() {
                self.play_position(ctx, position);
            }
            return;
        }

        self.backend.nudge(ctx.platform);
    }

    /// Resume if we should be playing but the platform paused us
    pub(crate) fn nudge(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if self.suspended || self.state != QueueState::Playing {
            return false;
        }
        let resumed = self.backend.nudge(ctx.platform);
        if resumed {
            debug!(page = self.page, position = self.cursor, "Narration nudged back");
        }
        resumed
    }

    pub(crate) fn set_volume(&mut self, ctx: &mut Ctx<'_>, gain: f32) {
        self.gain = gain;
        self.backend.set_volume(ctx.platform, gain);
    }

    // ===== Continuations =====

    /// Inter-sentence gap elapsed
    pub(crate) fn on_gap_elapsed(&mut self, ctx: &mut Ctx<'_>, epoch: u64, position: usize) {
        if epoch != self.epoch || self.pending_gap != Some(position) {
            debug!(epoch, current = self.epoch, position, "Stale sentence gap ignored");
            return;
        }

        if self.suspended {
            self.gap_deferred = true;
            return;
        }

        self.pending_gap = None;
        self.play_position(ctx, position);
    }

    /// Clip did not become ready in time
    pub(crate) fn on_load_timeout(&mut self, ctx: &mut Ctx<'_>, epoch: u64, clip: ClipId) {
        if epoch != self.epoch {
            return;
        }
        let Some(active) = self.active.filter(|a| a.clip == clip && !a.ready) else {
            return;
        };

        warn!(
            page = self.page,
            position = active.position,
            clip = %clip,
            "Narration clip load timed out, skipping"
        );
        self.backend.abandon(ctx.platform);
        self.finish_clip(ctx, active.position);
    }

    /// Platform event for a clip owned by this queue
    pub(crate) fn on_media_event(&mut self, ctx: &mut Ctx<'_>, event: &MediaEvent) {
        let Some(mut active) = self.active.filter(|a| a.clip == event.clip) else {
            match &event.kind {
                MediaEventKind::Ready => self.backend.on_ready(event.clip),
                MediaEventKind::Failed(reason) => {
                    if self.backend.discard_preload(ctx.platform, event.clip) {
                        debug!(clip = %event.clip, reason = %reason, "Preloaded clip failed");
                    }
                }
                MediaEventKind::Ended => {
                    debug!(clip = %event.clip, "Ended event for inactive clip ignored");
                }
            }
            return;
        };

        if !ctx.generation.is_current(active.generation) || active.epoch != self.epoch {
            debug!(clip = %event.clip, "Stale narration event ignored");
            return;
        }

        match &event.kind {
            MediaEventKind::Ready => {
                self.backend.on_ready(event.clip);
                active.ready = true;
                self.active = Some(active);
                ctx.timers.cancel(TimerKind::ClipLoadTimeout {
                    epoch: self.epoch,
                    clip: event.clip,
                });
            }
            MediaEventKind::Ended => {
                self.finish_clip(ctx, active.position);
            }
            MediaEventKind::Failed(reason) => {
                warn!(
                    page = self.page,
                    position = active.position,
                    reason = %reason,
                    "Narration clip failed, treating as finished"
                );
                self.backend.abandon(ctx.platform);
                self.finish_clip(ctx, active.position);
            }
        }
    }

    // ===== Internals =====

    fn next_audible(&self, from: usize) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, item)| item.source.is_some())
            .map(|(position, _)| position)
    }

    fn play_from(&mut self, ctx: &mut Ctx<'_>, from: usize) {
        match self.next_audible(from) {
            Some(position) => self.play_position(ctx, position),
            None => self.complete(ctx),
        }
    }

    fn play_position(&mut self, ctx: &mut Ctx<'_>, position: usize) {
        let Some(source) = self.items.get(position).and_then(|i| i.source.clone()) else {
            self.play_from(ctx, position + 1);
            return;
        };

        self.cursor = position;
        self.pending_gap = None;
        ctx.emit(PlaybackEvent::SentenceChanged {
            sentence: self.items[position].sentence,
        });
        self.set_state(ctx, QueueState::Playing);

        match self.backend.start(ctx.platform, &source, self.gain) {
            Ok(started) => {
                debug!(page = self.page, position, clip = %started.clip, "Narration clip started");
                self.active = Some(ActiveClip {
                    clip: started.clip,
                    position,
                    generation: ctx.generation,
                    epoch: self.epoch,
                    ready: started.ready,
                });
                if !started.ready {
                    let timeout = ctx.config.clip_load_timeout();
                    ctx.schedule(
                        TimerKind::ClipLoadTimeout {
                            epoch: self.epoch,
                            clip: started.clip,
                        },
                        timeout,
                    );
                }
                if let Some(next) = self.next_audible(position + 1) {
                    if let Some(next_source) = self.items[next].source.clone() {
                        self.backend.preload(ctx.platform, &next_source, self.gain);
                    }
                }
            }
            Err(e) => {
                warn!(page = self.page, position, error = %e, "Narration clip could not start");
                self.finish_clip(ctx, position);
            }
        }
    }

    /// Clip at `position` ended (naturally, by error or by timeout)
    fn finish_clip(&mut self, ctx: &mut Ctx<'_>, position: usize) {
        let epoch = self.epoch;
        if let Some(active) = self.active.take() {
            ctx.timers.cancel(TimerKind::ClipLoadTimeout {
                epoch,
                clip: active.clip,
            });
        }

        match self.next_audible(position + 1) {
            Some(next) => {
                self.pending_gap = Some(next);
                let gap = ctx.config.sentence_gap();
                ctx.schedule(
                    TimerKind::SentenceGap {
                        epoch,
                        position: next,
                    },
                    gap,
                );
            }
            None => self.complete(ctx),
        }
    }

    fn complete(&mut self, ctx: &mut Ctx<'_>) {
        if self.completed {
            return;
        }
        self.backend.mark_done();
        self.active = None;
        self.pending_gap = None;
        self.completed = true;
        self.completion_unreported = true;
        self.set_state(ctx, QueueState::PageComplete);
        ctx.emit(PlaybackEvent::NarrationCompleted { page: self.page });
        info!(page = self.page, mode = ?self.mode, "Narration complete");
    }

    /// Invalidate in-flight work and release resources
    fn halt(&mut self, ctx: &mut Ctx<'_>) {
        self.epoch += 1;
        self.backend.stop(ctx.platform);
        self.active = None;
        self.pending_gap = None;
        self.gap_deferred = false;
        self.cancel_timers(ctx);
    }

    fn cancel_timers(&mut self, ctx: &mut Ctx<'_>) {
        ctx.timers.cancel_where(|kind| {
            matches!(
                kind,
                TimerKind::SentenceGap { .. } | TimerKind::ClipLoadTimeout { .. }
            )
        });
    }

    fn set_state(&mut self, ctx: &mut Ctx<'_>, state: QueueState) {
        if self.state != state {
            self.state = state;
            ctx.emit(PlaybackEvent::NarrationStateChanged { state });
        }
    }
}

impl std::fmt::Debug for SentenceQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceQueue")
            .field("backend", &self.backend.name())
            .field("page", &self.page)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .finish()
    }
}
