//! Platform media primitives
//!
//! Abstracts the host's audio/video elements (native players, browser media
//! elements, a simulator in tests). The engine never blocks on the platform:
//! requests return immediately and progress is reported back through
//! `PlaybackSession::on_media_event`.

use crate::error::Result;
use fable_core::MediaRef;
use serde::{Deserialize, Serialize};

/// Opaque handle to one platform media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(u64);

impl ClipId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// What a media element is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Narration,
    Music,
    Video,
}

/// Request to create a media element for a source
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub kind: MediaKind,
    pub source: MediaRef,
    /// Linear gain (0.0-1.0)
    pub volume: f32,
    pub looping: bool,
    pub muted: bool,
}

impl LoadRequest {
    /// Narration clip, played once
    pub fn narration(source: MediaRef, volume: f32) -> Self {
        Self {
            kind: MediaKind::Narration,
            source,
            volume,
            looping: false,
            muted: false,
        }
    }

    /// Background music, looped by the platform
    pub fn music(source: MediaRef, volume: f32) -> Self {
        Self {
            kind: MediaKind::Music,
            source,
            volume,
            looping: true,
            muted: false,
        }
    }

    /// Page video, muted and not looped (cycles are driven by the engine)
    pub fn video(source: MediaRef) -> Self {
        Self {
            kind: MediaKind::Video,
            source,
            volume: 0.0,
            looping: false,
            muted: true,
        }
    }
}

/// Progress reported by the platform for one clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEventKind {
    /// Enough data is buffered to start playback
    Ready,

    /// Playback reached the end of the source
    Ended,

    /// Load or decode failed
    Failed(String),
}

/// Platform media callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEvent {
    pub clip: ClipId,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn ready(clip: ClipId) -> Self {
        Self {
            clip,
            kind: MediaEventKind::Ready,
        }
    }

    pub fn ended(clip: ClipId) -> Self {
        Self {
            clip,
            kind: MediaEventKind::Ended,
        }
    }

    pub fn failed(clip: ClipId, reason: impl Into<String>) -> Self {
        Self {
            clip,
            kind: MediaEventKind::Failed(reason.into()),
        }
    }
}

/// Host media platform
///
/// Implementors wrap whatever plays media on the device. Requests are
/// fire-and-forget; readiness, end of playback and failures are delivered
/// later as `MediaEvent`s.
///
/// Contract:
/// - `play` may be called before a clip is ready; the platform starts it once
///   it can.
/// - After `set_source` or `release`, no further events for the replaced
///   source are delivered.
pub trait MediaPlatform {
    /// Create a media element and start loading its source (unstarted)
    ///
    /// # Returns
    /// * `Ok(clip)` - Element created, `Ready`/`Failed` will follow
    /// * `Err(_)` - Element could not be created at all
    fn load(&mut self, request: LoadRequest) -> Result<ClipId>;

    /// Start or resume playback
    ///
    /// Gesture-gated platforms reject this outside an unlocked context.
    fn play(&mut self, clip: ClipId) -> Result<()>;

    /// Pause playback, keeping position
    fn pause(&mut self, clip: ClipId);

    /// Seek to the start and play
    fn restart(&mut self, clip: ClipId) -> Result<()>;

    /// Replace the element's source (unstarted)
    fn set_source(&mut self, clip: ClipId, source: &MediaRef) -> Result<()>;

    /// Set linear gain (0.0-1.0)
    fn set_volume(&mut self, clip: ClipId, volume: f32);

    /// Dispose of the element
    fn release(&mut self, clip: ClipId);

    /// Whether the element is currently paused (for any reason)
    fn is_paused(&self, clip: ClipId) -> bool;

    /// Whether the element still holds a loaded, unfinished source
    fn can_resume(&self, clip: ClipId) -> bool;

    /// Unlock handshake; must run inside a user gesture on gated platforms
    ///
    /// Returns a reusable narration output element.
    fn unlock_output(&mut self) -> Result<ClipId>;
}

/// Recording platform for unit tests
///
/// Every call is appended to `calls`; clips never report events on their own.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    pub calls: Vec<String>,
    pub next_id: u64,
    pub paused: std::collections::HashSet<ClipId>,
    pub resumable: bool,
    pub reject_play: bool,
    pub reject_unlock: bool,
}

#[cfg(test)]
impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            resumable: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl MediaPlatform for RecordingPlatform {
    fn load(&mut self, request: LoadRequest) -> Result<ClipId> {
        self.next_id += 1;
        let clip = ClipId::new(self.next_id);
        self.paused.insert(clip);
        self.calls.push(format!("load {} {}", clip, request.source));
        Ok(clip)
    }

    fn play(&mut self, clip: ClipId) -> Result<()> {
        self.calls.push(format!("play {clip}"));
        if self.reject_play {
            return Err(crate::error::PlaybackError::media("play rejected"));
        }
        self.paused.remove(&clip);
        Ok(())
    }

    fn pause(&mut self, clip: ClipId) {
        self.calls.push(format!("pause {clip}"));
        self.paused.insert(clip);
    }

    fn restart(&mut self, clip: ClipId) -> Result<()> {
        self.calls.push(format!("restart {clip}"));
        self.paused.remove(&clip);
        Ok(())
    }

    fn set_source(&mut self, clip: ClipId, source: &MediaRef) -> Result<()> {
        self.calls.push(format!("source {clip} {source}"));
        self.paused.insert(clip);
        Ok(())
    }

    fn set_volume(&mut self, clip: ClipId, volume: f32) {
        self.calls.push(format!("volume {clip} {volume:.2}"));
    }

    fn release(&mut self, clip: ClipId) {
        self.calls.push(format!("release {clip}"));
        self.paused.remove(&clip);
    }

    fn is_paused(&self, clip: ClipId) -> bool {
        self.paused.contains(&clip)
    }

    fn can_resume(&self, _clip: ClipId) -> bool {
        self.resumable
    }

    fn unlock_output(&mut self) -> Result<ClipId> {
        if self.reject_unlock {
            return Err(crate::error::PlaybackError::UnlockRejected(
                "not allowed".to_string(),
            ));
        }
        self.next_id += 1;
        let clip = ClipId::new(self.next_id);
        self.paused.insert(clip);
        self.calls.push(format!("unlock {clip}"));
        Ok(clip)
    }
}
