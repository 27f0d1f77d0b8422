//! Auto-advance coordination
//!
//! Waits for both the narration and the video completion flags, then turns
//! the page once the minimum display time has passed plus a short transition
//! buffer. Only one advance may be pending at a time.

use crate::context::Ctx;
use crate::events::PlaybackEvent;
use crate::timer::TimerKind;
use std::time::{Duration, Instant};
use tracing::debug;

/// Delay from `now` until the page may turn
///
/// `elapsed` is the time the page has been displayed so far.
pub fn advance_delay(elapsed: Duration, min_display: Duration, buffer: Duration) -> Duration {
    if elapsed >= min_display {
        buffer
    } else {
        (min_display - elapsed) + buffer
    }
}

/// Auto-advance coordinator
#[derive(Debug, Clone)]
pub struct AutoAdvance {
    narration_done: bool,
    video_done: bool,
    page_entered_at: Instant,
    deadline: Option<Instant>,
}

impl AutoAdvance {
    pub fn new(now: Instant) -> Self {
        Self {
            narration_done: true,
            video_done: true,
            page_entered_at: now,
            deadline: None,
        }
    }

    /// Reset flags for a new page
    ///
    /// A flag starts `true` when its subsystem has nothing to play on the page.
    pub fn enter_page(&mut self, now: Instant, narration_applies: bool, video_applies: bool) {
        self.page_entered_at = now;
        self.narration_done = !narration_applies;
        self.video_done = !video_applies;
        self.deadline = None;
    }

    pub fn set_narration_done(&mut self, done: bool) {
        self.narration_done = done;
    }

    pub fn set_video_done(&mut self, done: bool) {
        self.video_done = done;
    }

    pub fn narration_done(&self) -> bool {
        self.narration_done
    }

    pub fn video_done(&self) -> bool {
        self.video_done
    }

    pub fn page_entered_at(&self) -> Instant {
        self.page_entered_at
    }

    /// Deadline of the pending advance, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Schedule the advance if everything on the page is done
    ///
    /// `audio_active` is the platform guard: narration still believes it is
    /// playing, so a completion signal that got us here is spurious.
    pub(crate) fn evaluate(
        &mut self,
        ctx: &mut Ctx<'_>,
        page: usize,
        auto_play: bool,
        audio_active: bool,
    ) -> bool {
        if !(self.narration_done && self.video_done && auto_play) {
            return false;
        }
        if audio_active {
            debug!(page, "Auto-advance deferred, narration still active");
            return false;
        }

        let elapsed = ctx.now.saturating_duration_since(self.page_entered_at);
        let delay = advance_delay(
            elapsed,
            ctx.config.min_page_display(),
            ctx.config.transition_buffer(),
        );

        self.cancel(ctx);
        ctx.schedule(TimerKind::AutoAdvance, delay);
        self.deadline = Some(ctx.now + delay);
        ctx.emit(PlaybackEvent::AutoAdvanceScheduled {
            page,
            delay_ms: delay.as_millis() as u64,
        });
        debug!(
            page,
            elapsed_ms = elapsed.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            "Auto-advance scheduled"
        );
        true
    }

    /// Drop the pending advance
    pub(crate) fn cancel(&mut self, ctx: &mut Ctx<'_>) {
        ctx.timers.cancel(TimerKind::AutoAdvance);
        self.deadline = None;
    }

    /// The advance timer fired
    pub(crate) fn fired(&mut self) {
        self.deadline = None;
    }
}
