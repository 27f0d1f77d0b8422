/// Story-level types
use super::{LocalizedText, MediaRef, StoryId};
use serde::{Deserialize, Serialize};

/// Story metadata needed by the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,

    #[serde(default)]
    pub title: LocalizedText,

    /// Number of pages; pages are indexed `0..page_count`
    pub page_count: usize,

    /// Looping background music for the whole story
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<MediaRef>,
}

impl Story {
    /// Create a story with the given page count and no music
    pub fn new(id: impl Into<StoryId>, page_count: usize) -> Self {
        Self {
            id: id.into(),
            title: LocalizedText::default(),
            page_count,
            bgm: None,
        }
    }

    /// Attach background music
    #[must_use]
    pub fn with_bgm(mut self, bgm: MediaRef) -> Self {
        self.bgm = Some(bgm);
        self
    }

    /// Index of the last page, `None` for an empty story
    pub fn last_page(&self) -> Option<usize> {
        self.page_count.checked_sub(1)
    }
}

/// Direction of a page-turn animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionDirection {
    Forward,
    Backward,
}

impl TransitionDirection {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}
