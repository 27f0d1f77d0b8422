//! Shared test doubles for playback integration tests
//!
//! Everything records into `Rc<RefCell<_>>` state so tests keep a handle after
//! the boxed collaborator has moved into the session. Media never progresses
//! on its own: tests deliver `Ready`/`Ended`/`Failed` explicitly and move a
//! virtual clock forward.

#![allow(dead_code)]

use fable_core::{
    FableError, Language, MediaRef, Navigator, Page, PageProvider, ProgressRecord, ProgressStore,
    ProgressUpdate, Sentence, Story, StoryId, TransitionDirection, TransitionPlayer,
};
use fable_playback::{
    ClipId, Collaborators, LoadRequest, MediaEvent, MediaKind, MediaPlatform, OpenOptions,
    PlaybackConfig, PlaybackError, PlaybackEvent, PlaybackSession,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ============================================================================
// Media platform
// ============================================================================

#[derive(Debug, Clone)]
pub struct SimClip {
    pub kind: MediaKind,
    pub source: String,
    pub playing: bool,
    pub released: bool,
    pub volume: f32,
}

#[derive(Debug, Default)]
pub struct SimState {
    next_id: u64,
    pub clips: HashMap<ClipId, SimClip>,
    /// Narration sources in the order play() was accepted
    pub narration_plays: Vec<String>,
    /// Highest number of simultaneously playing narration clips ever seen
    pub max_narration_playing: usize,
    pub reject_play: bool,
    pub reject_unlock: bool,
    pub unlocks: usize,
    pub loads: Vec<(MediaKind, String)>,
}

impl SimState {
    fn narration_playing(&self) -> usize {
        self.clips
            .values()
            .filter(|c| c.kind == MediaKind::Narration && c.playing && !c.released)
            .count()
    }

    fn track_concurrency(&mut self) {
        self.max_narration_playing = self.max_narration_playing.max(self.narration_playing());
    }

    fn alloc(&mut self) -> ClipId {
        self.next_id += 1;
        ClipId::new(self.next_id)
    }
}

/// Simulated platform
#[derive(Clone, Default)]
pub struct SimPlatform {
    pub state: Rc<RefCell<SimState>>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent live clip whose source is `source`
    pub fn clip_for(&self, source: &str) -> ClipId {
        let state = self.state.borrow();
        state
            .clips
            .iter()
            .filter(|(_, c)| c.source == source && !c.released)
            .map(|(id, _)| *id)
            .max()
            .unwrap_or_else(|| panic!("no live clip for {source}"))
    }

    pub fn clip(&self, id: ClipId) -> SimClip {
        self.state.borrow().clips[&id].clone()
    }

    pub fn is_playing(&self, source: &str) -> bool {
        let id = self.clip_for(source);
        self.clip(id).playing
    }

    pub fn narration_plays(&self) -> Vec<String> {
        self.state.borrow().narration_plays.clone()
    }

    pub fn live_narration_clips(&self) -> usize {
        self.state
            .borrow()
            .clips
            .values()
            .filter(|c| c.kind == MediaKind::Narration && !c.released)
            .count()
    }

    pub fn max_narration_playing(&self) -> usize {
        self.state.borrow().max_narration_playing
    }

    pub fn loads_of(&self, kind: MediaKind) -> Vec<String> {
        self.state
            .borrow()
            .loads
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Pause behind the engine's back (another element claimed the media session)
    pub fn interrupt(&self, source: &str) {
        let id = self.clip_for(source);
        if let Some(clip) = self.state.borrow_mut().clips.get_mut(&id) {
            clip.playing = false;
        }
    }

    /// Mark a clip as finished before reporting `Ended`
    fn finish(&self, id: ClipId) {
        if let Some(clip) = self.state.borrow_mut().clips.get_mut(&id) {
            clip.playing = false;
        }
    }
}

impl MediaPlatform for SimPlatform {
    fn load(&mut self, request: LoadRequest) -> fable_playback::Result<ClipId> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state
            .loads
            .push((request.kind, request.source.url().to_string()));
        state.clips.insert(
            id,
            SimClip {
                kind: request.kind,
                source: request.source.url().to_string(),
                playing: false,
                released: false,
                volume: request.volume,
            },
        );
        Ok(id)
    }

    fn play(&mut self, clip: ClipId) -> fable_playback::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.reject_play {
            return Err(PlaybackError::media("NotAllowedError"));
        }
        let Some(entry) = state.clips.get_mut(&clip) else {
            return Err(PlaybackError::media("unknown clip"));
        };
        entry.playing = true;
        let (kind, source) = (entry.kind, entry.source.clone());
        if kind == MediaKind::Narration {
            state.narration_plays.push(source);
        }
        state.track_concurrency();
        Ok(())
    }

    fn pause(&mut self, clip: ClipId) {
        if let Some(entry) = self.state.borrow_mut().clips.get_mut(&clip) {
            entry.playing = false;
        }
    }

    fn restart(&mut self, clip: ClipId) -> fable_playback::Result<()> {
        if let Some(entry) = self.state.borrow_mut().clips.get_mut(&clip) {
            entry.playing = true;
        }
        Ok(())
    }

    fn set_source(&mut self, clip: ClipId, source: &MediaRef) -> fable_playback::Result<()> {
        let mut state = self.state.borrow_mut();
        state
            .loads
            .push((MediaKind::Narration, source.url().to_string()));
        if let Some(entry) = state.clips.get_mut(&clip) {
            entry.source = source.url().to_string();
            entry.playing = false;
        }
        Ok(())
    }

    fn set_volume(&mut self, clip: ClipId, volume: f32) {
        if let Some(entry) = self.state.borrow_mut().clips.get_mut(&clip) {
            entry.volume = volume;
        }
    }

    fn release(&mut self, clip: ClipId) {
        if let Some(entry) = self.state.borrow_mut().clips.get_mut(&clip) {
            entry.playing = false;
            entry.released = true;
        }
    }

    fn is_paused(&self, clip: ClipId) -> bool {
        self.state
            .borrow()
            .clips
            .get(&clip)
            .map_or(true, |c| !c.playing)
    }

    fn can_resume(&self, clip: ClipId) -> bool {
        self.state
            .borrow()
            .clips
            .get(&clip)
            .is_some_and(|c| !c.released)
    }

    fn unlock_output(&mut self) -> fable_playback::Result<ClipId> {
        let mut state = self.state.borrow_mut();
        if state.reject_unlock {
            return Err(PlaybackError::UnlockRejected("gesture required".into()));
        }
        state.unlocks += 1;
        let id = state.alloc();
        state.clips.insert(
            id,
            SimClip {
                kind: MediaKind::Narration,
                source: String::new(),
                playing: false,
                released: false,
                volume: 1.0,
            },
        );
        Ok(id)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

pub struct StaticPages {
    pub pages: Vec<Page>,
    pub fail_at: Option<usize>,
}

impl PageProvider for StaticPages {
    fn get_page(&self, story_id: &StoryId, page_index: usize) -> fable_core::Result<Page> {
        if self.fail_at == Some(page_index) {
            return Err(FableError::network("timeout"));
        }
        self.pages
            .get(page_index)
            .cloned()
            .ok_or_else(|| FableError::not_found("Page", format!("{story_id}/{page_index}")))
    }
}

#[derive(Debug, Default)]
pub struct StoreState {
    pub record: Option<ProgressRecord>,
    pub writes: Vec<ProgressUpdate>,
    pub fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn with_saved(current_page: usize, is_completed: bool) -> Self {
        let store = Self::default();
        store.state.borrow_mut().record = Some(ProgressRecord {
            story_id: StoryId::new("story-1"),
            current_page,
            is_completed,
            last_read_at: chrono::Utc::now(),
        });
        store
    }

    pub fn writes(&self) -> Vec<ProgressUpdate> {
        self.state.borrow().writes.clone()
    }
}

impl ProgressStore for MemoryStore {
    fn read_progress(&self, _story_id: &StoryId) -> fable_core::Result<Option<ProgressRecord>> {
        Ok(self.state.borrow().record.clone())
    }

    fn write_progress(
        &mut self,
        _story_id: &StoryId,
        update: ProgressUpdate,
    ) -> fable_core::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(FableError::storage("503"));
        }
        state.writes.push(update);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCall {
    NextScreen,
    Exit,
}

#[derive(Clone, Default)]
pub struct RecordingNavigator {
    pub calls: Rc<RefCell<Vec<NavCall>>>,
}

impl RecordingNavigator {
    pub fn calls(&self) -> Vec<NavCall> {
        self.calls.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to_next_screen(&mut self) {
        self.calls.borrow_mut().push(NavCall::NextScreen);
    }

    fn exit_viewer(&mut self) {
        self.calls.borrow_mut().push(NavCall::Exit);
    }
}

#[derive(Clone, Default)]
pub struct RecordingTransitions {
    pub calls: Rc<RefCell<Vec<TransitionDirection>>>,
}

impl TransitionPlayer for RecordingTransitions {
    fn play_transition(&mut self, direction: TransitionDirection) {
        self.calls.borrow_mut().push(direction);
    }
}

// ============================================================================
// Story builders
// ============================================================================

pub fn ko(name: &str) -> MediaRef {
    MediaRef::new(format!("{name}.ko.mp3"))
}

/// Page with `n` sentences, all narrated in Korean
pub fn narrated_page(index: usize, n: usize) -> Page {
    (0..n).fold(Page::new(index), |page, s| {
        page.with_sentence(
            Sentence::new(s, format!("문장 {s}"), format!("sentence {s}"))
                .with_audio(Language::Ko, ko(&format!("p{index}s{s}"))),
        )
    })
}

/// Page whose sentences have audio only where `mask` is true
pub fn masked_page(index: usize, mask: &[bool]) -> Page {
    mask.iter().enumerate().fold(Page::new(index), |page, (s, has)| {
        let sentence = Sentence::new(s, format!("문장 {s}"), format!("sentence {s}"));
        page.with_sentence(if *has {
            sentence.with_audio(Language::Ko, ko(&format!("p{index}s{s}")))
        } else {
            sentence
        })
    })
}

pub fn sentence_source(page: usize, sentence: usize) -> String {
    format!("p{page}s{sentence}.ko.mp3")
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub session: PlaybackSession,
    pub platform: SimPlatform,
    pub store: MemoryStore,
    pub navigator: RecordingNavigator,
    pub transitions: RecordingTransitions,
    pub t0: Instant,
    pub now: Instant,
    pub events: Vec<PlaybackEvent>,
}

pub struct HarnessBuilder {
    pages: Vec<Page>,
    config: PlaybackConfig,
    store: MemoryStore,
    platform: SimPlatform,
    bgm: Option<MediaRef>,
    options: OpenOptions,
}

impl HarnessBuilder {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            config: PlaybackConfig::default(),
            store: MemoryStore::default(),
            platform: SimPlatform::new(),
            bgm: None,
            options: OpenOptions::default(),
        }
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: MemoryStore) -> Self {
        self.store = store;
        self
    }

    pub fn platform(mut self, platform: SimPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn bgm(mut self, source: &str) -> Self {
        self.bgm = Some(MediaRef::new(source));
        self
    }

    pub fn restart(mut self) -> Self {
        self.options.restart = true;
        self
    }

    pub fn try_open(self) -> fable_playback::Result<Harness> {
        let mut story = Story::new("story-1", self.pages.len());
        story.bgm = self.bgm;
        let provider = StaticPages {
            pages: self.pages,
            fail_at: None,
        };
        let navigator = RecordingNavigator::default();
        let transitions = RecordingTransitions::default();
        let t0 = Instant::now();

        let session = PlaybackSession::open(
            story,
            &provider,
            Collaborators {
                platform: Box::new(self.platform.clone()),
                progress: Box::new(self.store.clone()),
                navigator: Box::new(navigator.clone()),
                transitions: Box::new(transitions.clone()),
            },
            self.config,
            self.options,
            t0,
        )?;

        let mut harness = Harness {
            session,
            platform: self.platform,
            store: self.store,
            navigator,
            transitions,
            t0,
            now: t0,
            events: Vec::new(),
        };
        harness.collect();
        Ok(harness)
    }

    pub fn open(self) -> Harness {
        self.try_open().expect("session opens")
    }
}

impl Harness {
    pub fn ms(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    /// Elapsed virtual time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        (self.now - self.t0).as_millis() as u64
    }

    fn collect(&mut self) {
        self.events.extend(self.session.drain_events());
    }

    /// Move the clock to `ms`, firing every timer on the way at its deadline
    pub fn advance_to(&mut self, ms: u64) {
        let target = self.ms(ms);
        while let Some(deadline) = self.session.next_deadline() {
            if deadline > target {
                break;
            }
            self.now = self.now.max(deadline);
            self.session.poll(self.now);
            self.collect();
        }
        self.now = self.now.max(target);
        self.session.poll(self.now);
        self.collect();
    }

    pub fn advance_by(&mut self, ms: u64) {
        let target = self.elapsed_ms() + ms;
        self.advance_to(target);
    }

    pub fn deliver(&mut self, event: MediaEvent) {
        self.session.on_media_event(event, self.now);
        self.collect();
    }

    pub fn ready(&mut self, source: &str) {
        let clip = self.platform.clip_for(source);
        self.deliver(MediaEvent::ready(clip));
    }

    /// Report natural end of the live clip playing `source`
    pub fn end(&mut self, source: &str) {
        let clip = self.platform.clip_for(source);
        self.platform.finish(clip);
        self.deliver(MediaEvent::ended(clip));
    }

    pub fn fail(&mut self, source: &str) {
        let clip = self.platform.clip_for(source);
        self.deliver(MediaEvent::failed(clip, "network error"));
    }

    /// Play a narrated page to completion: each clip lasts `clip_ms`
    pub fn narrate_page(&mut self, page: usize, sentences: usize, clip_ms: u64) {
        for s in 0..sentences {
            let source = sentence_source(page, s);
            self.ready(&source);
            self.advance_by(clip_ms);
            self.end(&source);
            if s + 1 < sentences {
                self.advance_by(self.session.config().sentence_gap_ms);
            }
        }
    }

    pub fn gesture(&mut self) {
        self.session.on_user_gesture(self.now);
        self.collect();
    }

    pub fn with_session<R>(&mut self, f: impl FnOnce(&mut PlaybackSession, Instant) -> R) -> R {
        let now = self.now;
        let result = f(&mut self.session, now);
        self.collect();
        result
    }

    pub fn page_changes(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::PageChanged { page, .. } => Some(*page),
                _ => None,
            })
            .collect()
    }

    pub fn has_event(&self, wanted: &PlaybackEvent) -> bool {
        self.events.contains(wanted)
    }
}
