//! Playback session - composition root
//!
//! Owns the current page, language and per-track settings, and rewires every
//! component on each page or language change. The session is sans-IO: the
//! host passes the current time into every call, delivers platform media
//! events through `on_media_event`, and calls `poll` once `next_deadline`
//! has passed.

use crate::{
    auto_advance::AutoAdvance,
    backend::backend_for,
    context::Runtime,
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    generation::Generation,
    music::{MusicController, SuspendReason},
    platform::{MediaEvent, MediaPlatform},
    progress::ProgressTracker,
    sentence_queue::SentenceQueue,
    timer::TimerKind,
    types::{AudioPolicy, NarrationMode, PlaybackConfig, QueueState, Track},
    unlock::AudioUnlockGate,
    video::VideoController,
    volume::Volume,
};
use fable_core::{
    Language, Navigator, Page, PageProvider, ProgressStore, Story, StoryId, TransitionDirection,
    TransitionPlayer,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Host implementations the session drives
pub struct Collaborators {
    pub platform: Box<dyn MediaPlatform>,
    pub progress: Box<dyn ProgressStore>,
    pub navigator: Box<dyn Navigator>,
    pub transitions: Box<dyn TransitionPlayer>,
}

/// Session opening options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Ignore saved progress and start at the first page
    pub restart: bool,
}

/// Read-only view of the session for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub story_id: StoryId,
    pub page: usize,
    pub page_count: usize,
    /// Reading progress through the story (0-100)
    pub progress_percent: u8,
    pub language: Language,
    pub narration_state: QueueState,
    pub narration_mode: NarrationMode,
    pub sentence: Option<usize>,
    pub video_visible: bool,
    pub narration_enabled: bool,
    pub narration_volume: u8,
    pub music_enabled: bool,
    pub music_volume: u8,
    pub auto_play: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Story finished (or skipped past the last page)
    NextScreen,
    /// User closed the viewer
    Closed,
}

/// Story playback session
pub struct PlaybackSession {
    rt: Runtime,
    story: Story,
    pages: Vec<Page>,
    store: Box<dyn ProgressStore>,
    navigator: Box<dyn Navigator>,
    transitions: Box<dyn TransitionPlayer>,

    gate: AudioUnlockGate,
    narration: SentenceQueue,
    video: VideoController,
    music: MusicController,
    coordinator: AutoAdvance,
    progress: ProgressTracker,

    current_page: usize,
    language: Language,
    narration_enabled: bool,
    narration_volume: Volume,
    auto_play: bool,
    hidden: bool,
    /// End-of-story exit is pending
    ending: bool,
    closed: bool,
}

impl PlaybackSession {
    /// Open a session: fetch pages, restore progress, start music and the first page
    ///
    /// # Errors
    /// Fails if the configuration is invalid, the story is empty, or a page
    /// cannot be fetched. Nothing after opening surfaces errors.
    pub fn open(
        story: Story,
        provider: &dyn PageProvider,
        collaborators: Collaborators,
        config: PlaybackConfig,
        options: OpenOptions,
        now: Instant,
    ) -> Result<Self> {
        config.validate()?;
        if story.page_count == 0 {
            return Err(PlaybackError::EmptyStory);
        }

        let pages = (0..story.page_count)
            .map(|index| {
                provider.get_page(&story.id, index).map(|mut page| {
                    page.index = index;
                    page
                })
            })
            .collect::<fable_core::Result<Vec<_>>>()?;

        let Collaborators {
            platform,
            progress: store,
            navigator,
            transitions,
        } = collaborators;

        let narration_volume = Volume::new(config.narration_volume);
        let narration = SentenceQueue::new(
            backend_for(config.audio_policy),
            narration_volume.gain(),
        );
        let music = MusicController::new(
            config.music_volume,
            config.music_volume_ceiling,
            config.music_enabled,
        );
        let progress = ProgressTracker::new(story.id.clone(), story.page_count);
        let start_page = progress.restore(store.as_ref(), options.restart);

        info!(
            story = %story.id,
            pages = story.page_count,
            start_page,
            policy = ?config.audio_policy,
            backend = narration.backend_name(),
            "Playback session opened"
        );

        let mut session = Self {
            gate: AudioUnlockGate::new(config.audio_policy),
            language: config.language,
            narration_enabled: config.narration_enabled,
            auto_play: config.auto_play,
            rt: Runtime::new(platform, config),
            story,
            pages,
            store,
            navigator,
            transitions,
            narration,
            video: VideoController::new(),
            music,
            coordinator: AutoAdvance::new(now),
            progress,
            current_page: start_page,
            narration_volume,
            hidden: false,
            ending: false,
            closed: false,
        };

        let bgm = session.story.bgm.clone();
        session.music.start(&mut session.rt.at(now), bgm.as_ref());
        session.enter_page(start_page, None, now);
        Ok(session)
    }

    // ===== Host loop =====

    /// Earliest time `poll` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.closed {
            return None;
        }
        self.rt.timers.next_deadline()
    }

    /// Fire every timer due at `now`
    ///
    /// Timers fire one at a time in deadline order; each sees the session as
    /// left by the previous one, so a page change discards anything already
    /// due for the old page.
    pub fn poll(&mut self, now: Instant) {
        while !self.closed {
            let Some(timer) = self.rt.timers.pop_due(now) else {
                break;
            };
            if !self.rt.generation.is_current(timer.generation) {
                debug!(
                    timer = timer.kind.label(),
                    stamped = timer.generation.value(),
                    current = self.rt.generation.value(),
                    "Stale timer discarded"
                );
                continue;
            }
            self.fire(timer.kind, timer.deadline);
        }
    }

    /// Deliver a platform media event
    pub fn on_media_event(&mut self, event: MediaEvent, now: Instant) {
        if self.closed {
            return;
        }

        let mut ctx = self.rt.at(now);
        if self.narration.owns(event.clip) {
            self.narration.on_media_event(&mut ctx, &event);
        } else if self.video.owns(event.clip) {
            self.video.on_media_event(&mut ctx, &event);
        } else if self.music.owns(event.clip) {
            self.music.on_media_event(&mut ctx, &event);
        } else {
            debug!(clip = %event.clip, kind = ?event.kind, "Event for released clip ignored");
            return;
        }
        self.settle(now, false);
    }

    /// A user input event happened; gesture-gated platforms may unlock audio now
    pub fn on_user_gesture(&mut self, now: Instant) {
        if self.closed {
            return;
        }

        if self.gate.needs_unlock() {
            self.music.suspend(&mut self.rt.at(now), SuspendReason::Unlock);
            match self.gate.acquire(self.rt.platform.as_mut()) {
                Ok(Some(handle)) => {
                    self.narration.attach_output(handle);
                    self.restart_narration(now);
                }
                Ok(None) => {}
                Err(e) => {
                    self.rt.events.push(PlaybackEvent::NarrationUnavailable {
                        reason: e.to_string(),
                    });
                }
            }
            self.music.release(&mut self.rt.at(now), SuspendReason::Unlock);
        }

        if !self.hidden {
            self.music.nudge(&mut self.rt.at(now));
        }
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.rt.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.rt.events.is_empty()
    }

    // ===== Navigation =====

    /// Go to the previous page (no-op on the first page)
    pub fn previous(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if self.current_page == 0 {
            debug!("Already on first page");
            return;
        }
        self.enter_page(self.current_page - 1, Some(TransitionDirection::Backward), now);
    }

    /// Go to the next page; on the last page, leave the viewer immediately
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        match self.next_index() {
            Some(next) => self.enter_page(next, Some(TransitionDirection::Forward), now),
            None => self.shut_down(Exit::NextScreen, now),
        }
    }

    /// Jump to a page
    pub fn go_to_page(&mut self, index: usize, now: Instant) -> Result<()> {
        if self.closed {
            return Err(PlaybackError::SessionClosed);
        }
        if index >= self.pages.len() {
            return Err(PlaybackError::PageOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        let direction = if index >= self.current_page {
            TransitionDirection::Forward
        } else {
            TransitionDirection::Backward
        };
        self.enter_page(index, Some(direction), now);
        Ok(())
    }

    /// Restart the current page from scratch
    pub fn restart_page(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        self.enter_page(self.current_page, None, now);
    }

    /// Close the viewer: stop everything, flush progress, navigate out
    pub fn close(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        self.shut_down(Exit::Closed, now);
    }

    // ===== Playback controls =====

    /// Pause or resume narration
    pub fn toggle_play_pause(&mut self, now: Instant) {
        if self.closed || !self.narration_enabled {
            return;
        }
        match self.narration.state() {
            QueueState::Playing => {
                self.narration.pause(&mut self.rt.at(now));
            }
            QueueState::Paused => {
                self.narration.resume(&mut self.rt.at(now));
                self.settle(now, false);
            }
            QueueState::Idle | QueueState::PageComplete => {
                debug!(state = ?self.narration.state(), "Nothing to pause or resume");
            }
        }
    }

    /// Play narration from a sentence position of the current page
    ///
    /// Returns false if narration cannot play or the position is out of range.
    pub fn seek_sentence(&mut self, position: usize, now: Instant) -> bool {
        if self.closed || !self.narration_enabled || !self.narration.is_available() {
            return false;
        }

        let mut ctx = self.rt.at(now);
        if !self.narration.seek(&mut ctx, position) {
            return false;
        }
        self.coordinator.cancel(&mut ctx);
        self.coordinator.set_narration_done(false);
        self.settle(now, false);
        true
    }

    /// Switch between Korean and English
    pub fn toggle_language(&mut self, now: Instant) {
        let language = self.language.toggled();
        self.set_language(language, now);
    }

    pub fn set_language(&mut self, language: Language, now: Instant) {
        if self.closed || self.language == language {
            return;
        }
        self.language = language;
        self.rt.events.push(PlaybackEvent::LanguageChanged { language });
        info!(page = self.current_page, language = %language, "Language changed");

        // The page stays: its video and a pending exit carry over, narration reloads
        self.rt.invalidate_keeping(|kind| {
            matches!(
                kind,
                TimerKind::VideoLoad
                    | TimerKind::VideoFallback
                    | TimerKind::VideoResumeNudge
                    | TimerKind::EndOfStory
            )
        });
        self.video.adopt(self.rt.generation);
        self.coordinator.cancel(&mut self.rt.at(now));

        let narration_applies = self.start_narration(now);
        self.coordinator.set_narration_done(!narration_applies);
        self.progress.rearm(&mut self.rt.at(now));
        self.settle(now, true);
    }

    /// Flip a track's enabled flag
    pub fn toggle_track(&mut self, track: Track, now: Instant) {
        let enabled = !self.is_track_enabled(track);
        self.set_track_enabled(track, enabled, now);
    }

    pub fn set_track_enabled(&mut self, track: Track, enabled: bool, now: Instant) {
        if self.closed || self.is_track_enabled(track) == enabled {
            return;
        }
        self.rt
            .events
            .push(PlaybackEvent::TrackToggled { track, enabled });
        debug!(track = %track, enabled, "Track toggled");

        match track {
            Track::Music => self.music.set_enabled(&mut self.rt.at(now), enabled),
            Track::Narration => {
                self.narration_enabled = enabled;
                if enabled {
                    self.restart_narration(now);
                } else {
                    self.narration.stop(&mut self.rt.at(now));
                    self.coordinator.set_narration_done(true);
                    self.settle(now, true);
                }
            }
        }
    }

    /// Set a track's volume (0-100, clamped)
    pub fn set_volume(&mut self, track: Track, level: u8, now: Instant) {
        if self.closed {
            return;
        }
        let level = level.min(100);
        match track {
            Track::Narration => {
                self.narration_volume.set_level(level);
                let gain = self.narration_volume.gain();
                self.narration.set_volume(&mut self.rt.at(now), gain);
            }
            Track::Music => self.music.set_level(&mut self.rt.at(now), level),
        }
        self.rt
            .events
            .push(PlaybackEvent::VolumeChanged { track, level });
    }

    pub fn set_auto_play(&mut self, enabled: bool, now: Instant) {
        if self.closed || self.auto_play == enabled {
            return;
        }
        self.auto_play = enabled;
        self.rt
            .events
            .push(PlaybackEvent::AutoPlayChanged { enabled });

        if enabled {
            self.settle(now, true);
        } else {
            self.coordinator.cancel(&mut self.rt.at(now));
        }
    }

    pub fn toggle_auto_play(&mut self, now: Instant) {
        let enabled = !self.auto_play;
        self.set_auto_play(enabled, now);
    }

    /// Hosting surface hidden or shown again
    pub fn set_hidden(&mut self, hidden: bool, now: Instant) {
        if self.closed || self.hidden == hidden {
            return;
        }
        self.hidden = hidden;
        debug!(hidden, "Visibility changed");

        let mut ctx = self.rt.at(now);
        if hidden {
            self.music.suspend(&mut ctx, SuspendReason::Hidden);
            self.narration.suspend(&mut ctx);
        } else {
            self.music.release(&mut ctx, SuspendReason::Hidden);
            self.narration.unsuspend(&mut ctx);
            self.settle(now, false);
        }
    }

    // ===== Accessors =====

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self) -> &Page {
        &self.pages[self.current_page]
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn narration_state(&self) -> QueueState {
        self.narration.state()
    }

    pub fn narration_mode(&self) -> NarrationMode {
        self.narration.mode()
    }

    /// Sentence to highlight in the subtitles
    pub fn current_sentence(&self) -> Option<usize> {
        self.narration.current_sentence()
    }

    pub fn is_track_enabled(&self, track: Track) -> bool {
        match track {
            Track::Narration => self.narration_enabled,
            Track::Music => self.music.is_enabled(),
        }
    }

    pub fn volume(&self, track: Track) -> u8 {
        match track {
            Track::Narration => self.narration_volume.level(),
            Track::Music => self.music.level(),
        }
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn is_video_visible(&self) -> bool {
        self.video.is_visible()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn generation(&self) -> Generation {
        self.rt.generation
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.rt.config
    }

    /// When the pending auto-advance fires, if one is scheduled
    pub fn pending_advance(&self) -> Option<Instant> {
        self.coordinator.deadline()
    }

    /// When the end-of-story exit fires, if one is scheduled
    pub fn pending_exit(&self) -> Option<Instant> {
        self.rt
            .timers
            .deadline_of(|kind| *kind == TimerKind::EndOfStory)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let page_count = self.pages.len();
        SessionSnapshot {
            story_id: self.story.id.clone(),
            page: self.current_page,
            page_count,
            progress_percent: ((self.current_page + 1) * 100 / page_count) as u8,
            language: self.language,
            narration_state: self.narration.state(),
            narration_mode: self.narration.mode(),
            sentence: self.narration.current_sentence(),
            video_visible: self.video.is_visible(),
            narration_enabled: self.narration_enabled,
            narration_volume: self.narration_volume.level(),
            music_enabled: self.music.is_enabled(),
            music_volume: self.music.level(),
            auto_play: self.auto_play,
            hidden: self.hidden,
        }
    }

    // ===== Internals =====

    fn next_index(&self) -> Option<usize> {
        let next = self.current_page + 1;
        (next < self.pages.len()).then_some(next)
    }

    /// Make `index` the current page. Invalidates all in-flight work first.
    fn enter_page(&mut self, index: usize, direction: Option<TransitionDirection>, now: Instant) {
        self.rt.invalidate();
        self.ending = false;
        self.current_page = index;
        self.rt.events.push(PlaybackEvent::PageChanged {
            page: index,
            page_count: self.pages.len(),
        });
        info!(
            page = index,
            generation = self.rt.generation.value(),
            "Page entered"
        );

        if let Some(direction) = direction {
            self.transitions.play_transition(direction);
        }

        let narration_applies = self.start_narration(now);
        let video_applies = self.video.enter_page(&mut self.rt.at(now), &self.pages[index]);
        self.coordinator
            .enter_page(now, narration_applies, video_applies);
        self.progress.page_settled(&mut self.rt.at(now), index);
        self.settle(now, true);
    }

    /// Load the current page's narration in the active language and start it
    ///
    /// Returns whether narration takes part in auto-advance on this page.
    fn start_narration(&mut self, now: Instant) -> bool {
        let page = &self.pages[self.current_page];
        let mut ctx = self.rt.at(now);
        self.narration.load_page(&mut ctx, page, self.language);

        let has_audio = self.narration_enabled && self.narration.has_audio();
        let narration_applies = has_audio && self.narration.is_available();

        if narration_applies {
            self.narration.start(&mut ctx);
        } else if has_audio {
            ctx.emit(PlaybackEvent::NarrationUnavailable {
                reason: "audio output locked".to_string(),
            });
        }
        narration_applies
    }

    /// Start narration again on the current page (re-enabled or just unlocked)
    fn restart_narration(&mut self, now: Instant) {
        let mut ctx = self.rt.at(now);
        self.coordinator.cancel(&mut ctx);

        if self.narration_enabled
            && self.narration.has_audio()
            && self.narration.is_available()
        {
            self.coordinator.set_narration_done(false);
            self.narration.restart_current(&mut ctx);
            self.settle(now, false);
        } else {
            self.settle(now, true);
        }
    }

    /// Collect completion signals and let the coordinator decide
    ///
    /// `force` evaluates even without a new signal (page entry, toggles).
    fn settle(&mut self, now: Instant, force: bool) {
        let mut changed = force;
        if self.narration.take_completion() {
            self.coordinator.set_narration_done(true);
            changed = true;
        }
        if self.video.take_completion() {
            self.coordinator.set_video_done(true);
            changed = true;
        }

        if !changed || self.ending || self.closed {
            return;
        }

        let audio_active = self.rt.config.audio_policy == AudioPolicy::GestureGated
            && self.narration.should_be_playing();
        let page = self.current_page;
        let auto_play = self.auto_play;
        self.coordinator
            .evaluate(&mut self.rt.at(now), page, auto_play, audio_active);
    }

    fn fire(&mut self, kind: TimerKind, at: Instant) {
        match kind {
            TimerKind::SentenceGap { epoch, position } => {
                self.narration
                    .on_gap_elapsed(&mut self.rt.at(at), epoch, position);
                self.settle(at, false);
            }
            TimerKind::ClipLoadTimeout { epoch, clip } => {
                self.narration
                    .on_load_timeout(&mut self.rt.at(at), epoch, clip);
                self.settle(at, false);
            }
            TimerKind::VideoLoad => {
                self.video.on_load_timer(&mut self.rt.at(at));
                self.settle(at, false);
            }
            TimerKind::VideoFallback => {
                self.video.on_fallback(&mut self.rt.at(at));
                self.settle(at, false);
            }
            TimerKind::VideoResumeNudge => {
                if !self.hidden {
                    let mut ctx = self.rt.at(at);
                    self.narration.nudge(&mut ctx);
                    self.music.nudge(&mut ctx);
                }
            }
            TimerKind::AutoAdvance => {
                self.coordinator.fired();
                self.advance(at);
            }
            TimerKind::EndOfStory => self.shut_down(Exit::NextScreen, at),
            TimerKind::ProgressDebounce { page } => {
                self.progress.on_debounce(self.store.as_mut(), page);
            }
        }
    }

    /// Auto-advance: next page, or schedule the end-of-story exit
    fn advance(&mut self, now: Instant) {
        if let Some(next) = self.next_index() {
            info!(from = self.current_page, to = next, "Auto-advancing");
            self.enter_page(next, Some(TransitionDirection::Forward), now);
            return;
        }

        let delay = self.rt.config.end_of_story_delay();
        info!(
            page = self.current_page,
            delay_ms = delay.as_millis() as u64,
            "Last page finished, leaving viewer"
        );
        self.ending = true;
        self.rt.at(now).schedule(TimerKind::EndOfStory, delay);
    }

    /// Stop all media, flush progress, release the unlocked output
    fn teardown(&mut self, now: Instant) {
        self.rt.invalidate();
        let mut ctx = self.rt.at(now);
        self.narration.reset(&mut ctx);
        self.video.teardown(&mut ctx);
        self.music.teardown(&mut ctx);
        self.gate.release(ctx.platform);
        self.progress.flush(self.store.as_mut());
    }

    fn shut_down(&mut self, exit: Exit, now: Instant) {
        info!(page = self.current_page, exit = ?exit, "Playback session closing");
        self.teardown(now);
        self.closed = true;
        self.ending = false;

        if exit == Exit::NextScreen {
            self.rt.events.push(PlaybackEvent::StoryFinished);
        }
        self.rt.events.push(PlaybackEvent::SessionClosed);

        match exit {
            Exit::NextScreen => self.navigator.go_to_next_screen(),
            Exit::Closed => self.navigator.exit_viewer(),
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if !self.closed {
            debug!("Session dropped without close, tearing down");
            self.teardown(Instant::now());
            self.closed = true;
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("story", &self.story.id)
            .field("page", &self.current_page)
            .field("language", &self.language)
            .field("generation", &self.rt.generation)
            .field("narration", &self.narration)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
