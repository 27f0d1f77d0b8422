//! Playback Events
//!
//! Event-based communication for UI synchronization. The session queues events
//! as they happen; the host drains them after every call into the engine.

use crate::types::{QueueState, Track};
use fable_core::Language;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Current page changed (also emitted for the first page)
    PageChanged {
        /// New page index (0-based)
        page: usize,
        /// Total number of pages
        page_count: usize,
    },

    /// Sentence to highlight changed
    SentenceChanged {
        /// Sentence index, `None` in page mode or when nothing is narrated
        sentence: Option<usize>,
    },

    /// Narration queue state changed
    NarrationStateChanged { state: QueueState },

    /// Every narration clip of the page finished
    NarrationCompleted { page: usize },

    /// Narration cannot play (output not unlocked or unlock rejected)
    NarrationUnavailable { reason: String },

    /// Video became visible or was removed
    VideoVisibilityChanged { visible: bool },

    /// Page video reported completion
    VideoCompleted { page: usize },

    /// Track enabled or disabled
    TrackToggled { track: Track, enabled: bool },

    /// Track volume changed
    VolumeChanged {
        track: Track,
        /// Volume level (0-100)
        level: u8,
    },

    /// Narration language changed
    LanguageChanged { language: Language },

    /// Auto-advance enabled or disabled
    AutoPlayChanged { enabled: bool },

    /// Page turn scheduled
    AutoAdvanceScheduled {
        page: usize,
        /// Delay from now in milliseconds
        delay_ms: u64,
    },

    /// Last page finished, viewer is being left
    StoryFinished,

    /// Session torn down
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PlaybackEvent::PageChanged {
            page: 2,
            page_count: 5,
        })
        .unwrap();
        assert_eq!(json["type"], "page_changed");
        assert_eq!(json["page"], 2);

        let json = serde_json::to_value(PlaybackEvent::NarrationStateChanged {
            state: QueueState::PageComplete,
        })
        .unwrap();
        assert_eq!(json["state"], "page_complete");
    }
}
