//! Engine-owned timer queue
//!
//! The engine never sleeps. Components schedule deadlines here and the host
//! calls `PlaybackSession::poll` once `next_deadline` has passed.

use crate::generation::Generation;
use crate::platform::ClipId;
use std::time::Instant;

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Inter-sentence gap elapsed, play the clip at `position`
    SentenceGap { epoch: u64, position: usize },

    /// Narration clip did not become ready in time
    ClipLoadTimeout { epoch: u64, clip: ClipId },

    /// Request the page video
    VideoLoad,

    /// Force video completion
    VideoFallback,

    /// Ask narration and music to resume after the video claimed playback
    VideoResumeNudge,

    /// Turn to the next page
    AutoAdvance,

    /// Leave the viewer after the last page
    EndOfStory,

    /// Save progress for a settled page
    ProgressDebounce { page: usize },
}

impl TimerKind {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            Self::SentenceGap { .. } => "sentence_gap",
            Self::ClipLoadTimeout { .. } => "clip_load_timeout",
            Self::VideoLoad => "video_load",
            Self::VideoFallback => "video_fallback",
            Self::VideoResumeNudge => "video_resume_nudge",
            Self::AutoAdvance => "auto_advance",
            Self::EndOfStory => "end_of_story",
            Self::ProgressDebounce { .. } => "progress_debounce",
        }
    }
}

/// A scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub deadline: Instant,
    pub kind: TimerKind,
    pub generation: Generation,
    seq: u64,
}

/// Deadline-ordered timer set
///
/// Timers with equal deadlines fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_seq: u64,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer
    pub fn schedule(&mut self, kind: TimerKind, deadline: Instant, generation: Generation) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            deadline,
            kind,
            generation,
            seq,
        });
    }

    /// Remove every timer matching the predicate
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerKind) -> bool) {
        self.timers.retain(|t| !predicate(&t.kind));
    }

    /// Remove every timer of exactly this kind
    pub fn cancel(&mut self, kind: TimerKind) {
        self.cancel_where(|k| *k == kind);
    }

    /// Whether a timer matching the predicate is pending
    pub fn contains(&self, mut predicate: impl FnMut(&TimerKind) -> bool) -> bool {
        self.timers.iter().any(|t| predicate(&t.kind))
    }

    /// Deadline of the timer matching the predicate, if any
    pub fn deadline_of(&self, mut predicate: impl FnMut(&TimerKind) -> bool) -> Option<Instant> {
        self.timers
            .iter()
            .filter(|t| predicate(&t.kind))
            .map(|t| t.deadline)
            .min()
    }

    /// Keep only current timers matching the predicate and stamp them with `next`
    ///
    /// Timers stamped with any generation other than `current` are dropped.
    pub fn carry_over(
        &mut self,
        current: Generation,
        next: Generation,
        mut keep: impl FnMut(&TimerKind) -> bool,
    ) {
        self.timers
            .retain(|t| t.generation.is_current(current) && keep(&t.kind));
        for timer in &mut self.timers {
            timer.generation = next;
        }
    }

    /// Drop all timers
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.swap_remove(index))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
