//! Shared engine state handed to components

use crate::events::PlaybackEvent;
use crate::generation::Generation;
use crate::platform::MediaPlatform;
use crate::timer::{TimerKind, TimerQueue};
use crate::types::PlaybackConfig;
use std::time::{Duration, Instant};

/// Everything a component may touch while handling one engine call
///
/// `now` is the logical time of the call. For timer callbacks it is the
/// timer's deadline, so follow-up work is scheduled relative to when the timer
/// was meant to fire rather than when the host got around to polling.
pub(crate) struct Ctx<'a> {
    pub platform: &'a mut dyn MediaPlatform,
    pub timers: &'a mut TimerQueue,
    pub events: &'a mut Vec<PlaybackEvent>,
    pub config: &'a PlaybackConfig,
    pub generation: Generation,
    pub now: Instant,
}

impl Ctx<'_> {
    /// Schedule a timer stamped with the current generation
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        tracing::trace!(
            timer = kind.label(),
            delay_ms = delay.as_millis() as u64,
            generation = self.generation.value(),
            "Scheduling timer"
        );
        self.timers.schedule(kind, self.now + delay, self.generation);
    }

    pub fn emit(&mut self, event: PlaybackEvent) {
        self.events.push(event);
    }
}

/// Engine-owned state shared by all components
pub(crate) struct Runtime {
    pub platform: Box<dyn MediaPlatform>,
    pub timers: TimerQueue,
    pub events: Vec<PlaybackEvent>,
    pub config: PlaybackConfig,
    pub generation: Generation,
}

impl Runtime {
    pub fn new(platform: Box<dyn MediaPlatform>, config: PlaybackConfig) -> Self {
        Self {
            platform,
            timers: TimerQueue::new(),
            events: Vec::new(),
            config,
            generation: Generation::new(),
        }
    }

    /// Borrow the runtime for a call at `now`
    pub fn at(&mut self, now: Instant) -> Ctx<'_> {
        Ctx {
            platform: self.platform.as_mut(),
            timers: &mut self.timers,
            events: &mut self.events,
            config: &self.config,
            generation: self.generation,
            now,
        }
    }

    /// Invalidate all in-flight work: advance the generation and drop every timer
    pub fn invalidate(&mut self) {
        let generation = self.generation.advance();
        self.timers.clear();
        tracing::debug!(generation = generation.value(), "Generation advanced");
    }

    /// Advance the generation but keep the timers matching `keep` alive
    pub fn invalidate_keeping(&mut self, keep: impl FnMut(&TimerKind) -> bool) {
        let previous = self.generation;
        let generation = self.generation.advance();
        self.timers.carry_over(previous, generation, keep);
        tracing::debug!(
            generation = generation.value(),
            kept = self.timers.len(),
            "Generation advanced"
        );
    }
}
