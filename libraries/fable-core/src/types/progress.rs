/// Reading progress types
use super::StoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Saved reading position for one story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub story_id: StoryId,

    /// Last settled page, 1-based (0 means never opened)
    pub current_page: usize,

    /// Whether the final page was reached and settled
    pub is_completed: bool,

    pub last_read_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// 0-based page to resume at, if the record says reading is in progress
    ///
    /// Completed stories and records without a page start from the beginning.
    /// The result is clamped to `page_count - 1`.
    pub fn resume_page(&self, page_count: usize) -> Option<usize> {
        if self.is_completed || self.current_page == 0 || page_count == 0 {
            return None;
        }
        Some((self.current_page - 1).min(page_count - 1))
    }

    /// Apply an update, stamping `last_read_at`
    pub fn apply(&mut self, update: &ProgressUpdate, at: DateTime<Utc>) {
        self.current_page = update.current_page;
        self.is_completed = update.is_completed;
        self.last_read_at = at;
    }
}

/// Progress write request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Settled page, 1-based
    pub current_page: usize,
    pub is_completed: bool,
}

impl ProgressUpdate {
    /// Update for a settled 0-based page index
    ///
    /// `is_completed` is set when the page is the last one of the story.
    pub fn settled(page_index: usize, page_count: usize) -> Self {
        let current_page = page_index + 1;
        Self {
            current_page,
            is_completed: current_page >= page_count,
        }
    }

    /// Forced write on teardown: never marks the story completed
    pub fn interrupted(page_index: usize) -> Self {
        Self {
            current_page: page_index + 1,
            is_completed: false,
        }
    }
}
