//! Core types for playback orchestration

use crate::error::{PlaybackError, Result};
use fable_core::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the platform lets the engine start audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioPolicy {
    /// Audio may start at any time and parallel audio resources are cheap
    #[default]
    Permissive,

    /// Audio may only start after an unlock handshake inside a user gesture
    GestureGated,
}

/// User-controllable audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Sentence or page narration
    Narration,

    /// Background music
    Music,
}

impl Track {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narration => "narration",
            Self::Music => "music",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "narration" | "tts" => Some(Self::Narration),
            "music" | "bgm" => Some(Self::Music),
            _ => None,
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Narration queue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// No clip scheduled
    #[default]
    Idle,

    /// A clip's playback has been requested (includes the gap between sentences)
    Playing,

    /// Explicitly paused
    Paused,

    /// Every audible clip of the page has finished
    PageComplete,
}

/// Which narration source a page uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationMode {
    /// Per-sentence clips
    #[default]
    Sentence,

    /// One legacy whole-page clip (or nothing)
    Page,
}

/// Playback orchestration configuration
///
/// Durations are stored in milliseconds so the struct maps directly onto
/// config files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Silence between two narrated sentences (default: 400)
    pub sentence_gap_ms: u64,

    /// Minimum time a page stays on screen before auto-advance (default: 3000)
    pub min_page_display_ms: u64,

    /// Extra wait after the display floor before turning the page (default: 400)
    pub transition_buffer_ms: u64,

    /// Wait after the last page before leaving the viewer (default: 2000)
    pub end_of_story_delay_ms: u64,

    /// Video completion is forced this long after page entry (default: 10000)
    pub video_fallback_ms: u64,

    /// Video load is requested this long after page entry (default: 500)
    pub video_load_delay_ms: u64,

    /// Delay between video ready and the narration/music resume nudge (default: 200)
    pub video_resume_nudge_ms: u64,

    /// Number of video cycles played before it stops (default: 2)
    pub video_max_cycles: u32,

    /// A narration clip that is not ready by then is skipped (default: 8000)
    pub clip_load_timeout_ms: u64,

    /// Time a page must stay current before progress is saved (default: 500)
    pub progress_debounce_ms: u64,

    /// Music gain at 100% slider (default: 0.2)
    pub music_volume_ceiling: f32,

    /// Initial narration volume (0-100, default: 60)
    pub narration_volume: u8,

    /// Initial music volume (0-100, default: 30)
    pub music_volume: u8,

    /// Narration enabled at start (default: true)
    pub narration_enabled: bool,

    /// Music enabled at start (default: true)
    pub music_enabled: bool,

    /// Auto-advance enabled at start (default: true)
    pub auto_play: bool,

    /// Initial narration language (default: Ko)
    pub language: Language,

    /// Platform audio policy (default: Permissive)
    pub audio_policy: AudioPolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sentence_gap_ms: 400,
            min_page_display_ms: 3000,
            transition_buffer_ms: 400,
            end_of_story_delay_ms: 2000,
            video_fallback_ms: 10_000,
            video_load_delay_ms: 500,
            video_resume_nudge_ms: 200,
            video_max_cycles: 2,
            clip_load_timeout_ms: 8000,
            progress_debounce_ms: 500,
            music_volume_ceiling: 0.2,
            narration_volume: 60,
            music_volume: 30,
            narration_enabled: true,
            music_enabled: true,
            auto_play: true,
            language: Language::Ko,
            audio_policy: AudioPolicy::Permissive,
        }
    }
}

impl PlaybackConfig {
    pub fn sentence_gap(&self) -> Duration {
        Duration::from_millis(self.sentence_gap_ms)
    }

    pub fn min_page_display(&self) -> Duration {
        Duration::from_millis(self.min_page_display_ms)
    }

    pub fn transition_buffer(&self) -> Duration {
        Duration::from_millis(self.transition_buffer_ms)
    }

    pub fn end_of_story_delay(&self) -> Duration {
        Duration::from_millis(self.end_of_story_delay_ms)
    }

    pub fn video_fallback(&self) -> Duration {
        Duration::from_millis(self.video_fallback_ms)
    }

    pub fn video_load_delay(&self) -> Duration {
        Duration::from_millis(self.video_load_delay_ms)
    }

    pub fn video_resume_nudge(&self) -> Duration {
        Duration::from_millis(self.video_resume_nudge_ms)
    }

    pub fn clip_load_timeout(&self) -> Duration {
        Duration::from_millis(self.clip_load_timeout_ms)
    }

    pub fn progress_debounce(&self) -> Duration {
        Duration::from_millis(self.progress_debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.music_volume_ceiling > 0.0 && self.music_volume_ceiling <= 1.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "music_volume_ceiling must be in (0, 1], got {}",
                self.music_volume_ceiling
            )));
        }

        if self.video_max_cycles == 0 {
            return Err(PlaybackError::InvalidConfig(
                "video_max_cycles must be at least 1".to_string(),
            ));
        }

        if self.narration_volume > 100 || self.music_volume > 100 {
            return Err(PlaybackError::InvalidConfig(
                "volumes must be within 0-100".to_string(),
            ));
        }

        if self.clip_load_timeout_ms == 0 || self.video_fallback_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "load timeouts must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
