/// Simulated media platform
///
/// Stands in for real audio and video elements. Clips become ready after a
/// fixed load latency and end after a fixed length per media kind; looping
/// music never ends. Time comes from the tokio clock so tests can run under
/// a paused runtime.
///
/// The simulator never calls back into the engine. The host asks for
/// `next_deadline()`, then collects events with `take_due()` and delivers them.
use crate::config::SimulationSettings;
use fable_core::MediaRef;
use fable_playback::{ClipId, LoadRequest, MediaEvent, MediaKind, MediaPlatform, PlaybackError};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Current time on the tokio clock
pub fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipState {
    Loading { ready_at: Instant },
    /// Loaded and not playing (fresh, paused or ended)
    Idle,
    Playing { since: Instant },
    Failed,
    Released,
}

#[derive(Debug, Clone)]
struct SimClip {
    kind: MediaKind,
    source: Option<String>,
    state: ClipState,
    play_requested: bool,
    /// Played time before the current `Playing` stretch
    position: Duration,
    /// `None` for looping media
    length: Option<Duration>,
    fails: bool,
    volume: f32,
}

impl SimClip {
    fn ends_at(&self) -> Option<Instant> {
        match (self.state, self.length) {
            (ClipState::Playing { since }, Some(length)) => {
                Some(since + length.saturating_sub(self.position))
            }
            _ => None,
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match self.state {
            ClipState::Loading { ready_at } => Some(ready_at),
            _ => self.ends_at(),
        }
    }
}

#[derive(Debug)]
struct Simulator {
    settings: SimulationSettings,
    next_id: u64,
    clips: BTreeMap<ClipId, SimClip>,
}

impl Simulator {
    fn length_for(&self, kind: MediaKind, looping: bool) -> Option<Duration> {
        if looping {
            return None;
        }
        match kind {
            MediaKind::Narration => Some(Duration::from_millis(self.settings.clip_ms)),
            MediaKind::Video => Some(Duration::from_millis(self.settings.video_ms)),
            MediaKind::Music => None,
        }
    }

    fn fails(&self, source: &str) -> bool {
        self.settings.failing_sources.iter().any(|s| s == source)
    }

    fn load_latency(&self) -> Duration {
        Duration::from_millis(self.settings.load_latency_ms)
    }

    fn clip_mut(&mut self, clip: ClipId) -> fable_playback::Result<&mut SimClip> {
        self.clips
            .get_mut(&clip)
            .ok_or_else(|| PlaybackError::media(format!("unknown {clip}")))
    }
}

/// Shared handle to the simulated platform
///
/// One clone is handed to the engine; the host keeps another to pump events.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    inner: Rc<RefCell<Simulator>>,
}

impl SimulatedPlatform {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Simulator {
                settings,
                next_id: 0,
                clips: BTreeMap::new(),
            })),
        }
    }

    /// Earliest pending ready/end event
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .borrow()
            .clips
            .values()
            .filter_map(SimClip::deadline)
            .min()
    }

    /// Advance every clip to `now` and return the events that happened, in time order
    pub fn take_due(&self, now: Instant) -> Vec<MediaEvent> {
        let mut sim = self.inner.borrow_mut();
        let mut due = Vec::new();

        for (id, clip) in &mut sim.clips {
            if let ClipState::Loading { ready_at } = clip.state {
                if ready_at > now {
                    continue;
                }
                if clip.fails {
                    clip.state = ClipState::Failed;
                    due.push((ready_at, MediaEvent::failed(*id, "simulated load failure")));
                    continue;
                }
                clip.state = if clip.play_requested {
                    ClipState::Playing { since: ready_at }
                } else {
                    ClipState::Idle
                };
                due.push((ready_at, MediaEvent::ready(*id)));
            }

            if let Some(ends_at) = clip.ends_at().filter(|at| *at <= now) {
                clip.state = ClipState::Idle;
                clip.play_requested = false;
                clip.position = clip.length.unwrap_or_default();
                due.push((ends_at, MediaEvent::ended(*id)));
            }
        }

        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, event)| event).collect()
    }

    /// Sources currently audible or visible
    pub fn playing_sources(&self) -> Vec<(MediaKind, String)> {
        self.inner
            .borrow()
            .clips
            .values()
            .filter(|clip| matches!(clip.state, ClipState::Playing { .. }))
            .filter_map(|clip| clip.source.clone().map(|source| (clip.kind, source)))
            .collect()
    }

    /// Clips not yet released
    pub fn live_clips(&self) -> usize {
        self.inner
            .borrow()
            .clips
            .values()
            .filter(|clip| clip.state != ClipState::Released)
            .count()
    }

    pub fn volume_of(&self, source: &str) -> Option<f32> {
        self.inner
            .borrow()
            .clips
            .values()
            .rev()
            .find(|clip| clip.source.as_deref() == Some(source))
            .map(|clip| clip.volume)
    }
}

impl MediaPlatform for SimulatedPlatform {
    fn load(&mut self, request: LoadRequest) -> fable_playback::Result<ClipId> {
        let now = clock();
        let mut sim = self.inner.borrow_mut();
        sim.next_id += 1;
        let id = ClipId::new(sim.next_id);

        let source = request.source.url().to_string();
        let clip = SimClip {
            kind: request.kind,
            state: ClipState::Loading {
                ready_at: now + sim.load_latency(),
            },
            play_requested: false,
            position: Duration::ZERO,
            length: sim.length_for(request.kind, request.looping),
            fails: sim.fails(&source),
            volume: request.volume,
            source: Some(source),
        };
        tracing::trace!(clip = %id, kind = ?request.kind, source = ?clip.source, "Simulated load");
        sim.clips.insert(id, clip);
        Ok(id)
    }

    fn play(&mut self, clip: ClipId) -> fable_playback::Result<()> {
        let now = clock();
        let mut sim = self.inner.borrow_mut();
        let entry = sim.clip_mut(clip)?;

        match entry.state {
            ClipState::Released | ClipState::Failed => {
                Err(PlaybackError::media(format!("{clip} cannot play")))
            }
            ClipState::Loading { .. } => {
                entry.play_requested = true;
                Ok(())
            }
            ClipState::Idle => {
                if entry.source.is_none() {
                    return Err(PlaybackError::media(format!("{clip} has no source")));
                }
                if entry.length.is_some_and(|length| entry.position >= length) {
                    entry.position = Duration::ZERO;
                }
                entry.state = ClipState::Playing { since: now };
                Ok(())
            }
            ClipState::Playing { .. } => Ok(()),
        }
    }

    fn pause(&mut self, clip: ClipId) {
        let now = clock();
        let mut sim = self.inner.borrow_mut();
        let Ok(entry) = sim.clip_mut(clip) else {
            return;
        };

        entry.play_requested = false;
        if let ClipState::Playing { since } = entry.state {
            entry.position += now.saturating_duration_since(since);
            entry.state = ClipState::Idle;
        }
    }

    fn restart(&mut self, clip: ClipId) -> fable_playback::Result<()> {
        {
            let mut sim = self.inner.borrow_mut();
            let entry = sim.clip_mut(clip)?;
            entry.position = Duration::ZERO;
            if matches!(entry.state, ClipState::Playing { .. }) {
                entry.state = ClipState::Idle;
            }
        }
        self.play(clip)
    }

    fn set_source(&mut self, clip: ClipId, source: &MediaRef) -> fable_playback::Result<()> {
        let now = clock();
        let mut sim = self.inner.borrow_mut();
        let latency = sim.load_latency();
        let fails = sim.fails(source.url());
        let length = sim.length_for(MediaKind::Narration, false);

        let entry = sim.clip_mut(clip)?;
        if entry.state == ClipState::Released {
            return Err(PlaybackError::media(format!("{clip} was released")));
        }
        entry.source = Some(source.url().to_string());
        entry.state = ClipState::Loading {
            ready_at: now + latency,
        };
        entry.play_requested = false;
        entry.position = Duration::ZERO;
        entry.length = length;
        entry.fails = fails;
        Ok(())
    }

    fn set_volume(&mut self, clip: ClipId, volume: f32) {
        if let Ok(entry) = self.inner.borrow_mut().clip_mut(clip) {
            entry.volume = volume;
        }
    }

    fn release(&mut self, clip: ClipId) {
        if let Ok(entry) = self.inner.borrow_mut().clip_mut(clip) {
            entry.state = ClipState::Released;
            entry.play_requested = false;
        }
    }

    fn is_paused(&self, clip: ClipId) -> bool {
        self.inner
            .borrow()
            .clips
            .get(&clip)
            .map_or(true, |entry| !matches!(entry.state, ClipState::Playing { .. }))
    }

    fn can_resume(&self, clip: ClipId) -> bool {
        self.inner.borrow().clips.get(&clip).is_some_and(|entry| {
            entry.source.is_some()
                && !matches!(entry.state, ClipState::Released | ClipState::Failed)
        })
    }

    fn unlock_output(&mut self) -> fable_playback::Result<ClipId> {
        let mut sim = self.inner.borrow_mut();
        sim.next_id += 1;
        let id = ClipId::new(sim.next_id);
        sim.clips.insert(
            id,
            SimClip {
                kind: MediaKind::Narration,
                source: None,
                state: ClipState::Idle,
                play_requested: false,
                position: Duration::ZERO,
                length: None,
                fails: false,
                volume: 1.0,
            },
        );
        tracing::debug!(clip = %id, "Simulated output unlocked");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fable_playback::MediaEventKind;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            load_latency_ms: 100,
            clip_ms: 1000,
            video_ms: 3000,
            failing_sources: vec!["broken.mp3".to_string()],
        }
    }

    fn narration(source: &str) -> LoadRequest {
        LoadRequest::narration(MediaRef::new(source), 0.6)
    }

    async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clip_becomes_ready_then_ends() {
        let mut platform = SimulatedPlatform::new(settings());
        let clip = platform.load(narration("a.mp3")).unwrap();
        platform.play(clip).unwrap();

        assert_eq!(platform.next_deadline(), Some(clock() + Duration::from_millis(100)));
        advance(100).await;
        let events = platform.take_due(clock());
        assert_eq!(events, vec![MediaEvent::ready(clip)]);
        assert!(!platform.is_paused(clip));

        advance(1000).await;
        let events = platform.take_due(clock());
        assert_eq!(events, vec![MediaEvent::ended(clip)]);
        assert!(platform.is_paused(clip));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_position() {
        let mut platform = SimulatedPlatform::new(settings());
        let clip = platform.load(narration("a.mp3")).unwrap();
        platform.play(clip).unwrap();
        advance(100).await;
        platform.take_due(clock());

        advance(600).await;
        platform.pause(clip);
        advance(5000).await;
        assert!(platform.take_due(clock()).is_empty());

        platform.play(clip).unwrap();
        assert_eq!(platform.next_deadline(), Some(clock() + Duration::from_millis(400)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_reports_failure() {
        let mut platform = SimulatedPlatform::new(settings());
        let clip = platform.load(narration("broken.mp3")).unwrap();

        advance(100).await;
        let events = platform.take_due(clock());
        assert!(matches!(events[0].kind, MediaEventKind::Failed(_)));
        assert!(platform.play(clip).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_music_loops_forever() {
        let mut platform = SimulatedPlatform::new(settings());
        let clip = platform
            .load(LoadRequest::music(MediaRef::new("bgm.mp3"), 0.06))
            .unwrap();
        platform.play(clip).unwrap();
        advance(100).await;
        platform.take_due(clock());

        assert_eq!(platform.next_deadline(), None);
        assert_eq!(
            platform.playing_sources(),
            vec![(MediaKind::Music, "bgm.mp3".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlocked_handle_takes_sources() {
        let mut platform = SimulatedPlatform::new(settings());
        let handle = platform.unlock_output().unwrap();
        assert!(platform.play(handle).is_err());

        platform.set_source(handle, &MediaRef::new("a.mp3")).unwrap();
        platform.play(handle).unwrap();
        advance(100).await;
        assert_eq!(platform.take_due(clock()), vec![MediaEvent::ready(handle)]);
        assert!(!platform.is_paused(handle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_clip_is_silent() {
        let mut platform = SimulatedPlatform::new(settings());
        let clip = platform.load(narration("a.mp3")).unwrap();
        platform.release(clip);

        advance(2000).await;
        assert!(platform.take_due(clock()).is_empty());
        assert_eq!(platform.live_clips(), 0);
        assert!(!platform.can_resume(clip));
    }
}
