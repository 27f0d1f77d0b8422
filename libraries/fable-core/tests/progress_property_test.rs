//! Property tests for saved progress arithmetic

use chrono::Utc;
use fable_core::{ProgressRecord, ProgressUpdate, StoryId};
use proptest::prelude::*;

fn record(current_page: usize, is_completed: bool) -> ProgressRecord {
    ProgressRecord {
        story_id: StoryId::new("story-1"),
        current_page,
        is_completed,
        last_read_at: Utc::now(),
    }
}

proptest! {
    /// Property: a resume page is always a valid 0-based index
    #[test]
    fn prop_resume_page_in_range(current in 0usize..500, count in 0usize..100, completed in any::<bool>()) {
        match record(current, completed).resume_page(count) {
            Some(page) => {
                prop_assert!(!completed);
                prop_assert!(page < count);
            }
            None => prop_assert!(completed || current == 0 || count == 0),
        }
    }

    /// Property: a settled write read back resumes on the same page
    #[test]
    fn prop_settled_write_resumes_in_place(count in 2usize..100, page in 0usize..99) {
        prop_assume!(page + 1 < count);
        let update = ProgressUpdate::settled(page, count);
        prop_assert!(!update.is_completed);

        let mut saved = record(0, false);
        saved.apply(&update, Utc::now());
        prop_assert_eq!(saved.resume_page(count), Some(page));
    }

    /// Property: only the last page marks the story completed
    #[test]
    fn prop_completion_only_on_last_page(count in 1usize..100, page in 0usize..100) {
        prop_assume!(page < count);
        let update = ProgressUpdate::settled(page, count);
        prop_assert_eq!(update.is_completed, page + 1 == count);
        prop_assert!(!ProgressUpdate::interrupted(page).is_completed);
    }
}
