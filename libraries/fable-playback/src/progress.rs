//! Reading progress persistence
//!
//! The saved page is read once when the session opens. After that, a page is
//! written only once the reader has stayed on it for the debounce window. On
//! teardown a pending (not yet written) page gets one last write that never
//! marks the story completed; only the natural debounce path on the final
//! page may do that.

use crate::context::Ctx;
use crate::timer::TimerKind;
use fable_core::{ProgressStore, ProgressUpdate, StoryId};
use tracing::{debug, info, warn};

/// Progress tracker for one story
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    story_id: StoryId,
    page_count: usize,
    /// Settled page waiting for the debounce timer
    pending: Option<usize>,
    last_written: Option<ProgressUpdate>,
}

impl ProgressTracker {
    pub fn new(story_id: StoryId, page_count: usize) -> Self {
        Self {
            story_id,
            page_count,
            pending: None,
            last_written: None,
        }
    }

    /// Page waiting for the debounce timer
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Most recent successful write
    pub fn last_written(&self) -> Option<ProgressUpdate> {
        self.last_written
    }

    /// 0-based page to open the story at
    ///
    /// `restart` skips the read and starts at the first page. Read failures
    /// are logged and also start at the first page.
    pub fn restore(&self, store: &dyn ProgressStore, restart: bool) -> usize {
        if restart {
            info!(story = %self.story_id, "Restart requested, opening first page");
            return 0;
        }

        match store.read_progress(&self.story_id) {
            Ok(Some(record)) => {
                let page = record.resume_page(self.page_count).unwrap_or(0);
                info!(
                    story = %self.story_id,
                    saved = record.current_page,
                    completed = record.is_completed,
                    page,
                    "Progress restored"
                );
                page
            }
            Ok(None) => 0,
            Err(e) => {
                warn!(story = %self.story_id, error = %e, "Progress read failed");
                0
            }
        }
    }

    /// The reader moved to `page`; write it once the debounce window passes
    pub(crate) fn page_settled(&mut self, ctx: &mut Ctx<'_>, page: usize) {
        self.pending = Some(page);
        self.schedule(ctx, page);
    }

    /// Re-arm the debounce after timers were cleared without a page change
    pub(crate) fn rearm(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(page) = self.pending {
            self.schedule(ctx, page);
        }
    }

    /// Debounce timer fired for `page`
    pub(crate) fn on_debounce(&mut self, store: &mut dyn ProgressStore, page: usize) {
        if self.pending != Some(page) {
            debug!(page, "Stale progress debounce ignored");
            return;
        }
        self.pending = None;
        self.write(store, ProgressUpdate::settled(page, self.page_count));
    }

    /// Teardown: write a pending page, never as completed
    pub(crate) fn flush(&mut self, store: &mut dyn ProgressStore) {
        if let Some(page) = self.pending.take() {
            self.write(store, ProgressUpdate::interrupted(page));
        }
    }

    fn schedule(&self, ctx: &mut Ctx<'_>, page: usize) {
        ctx.timers
            .cancel_where(|kind| matches!(kind, TimerKind::ProgressDebounce { .. }));
        let debounce = ctx.config.progress_debounce();
        ctx.schedule(TimerKind::ProgressDebounce { page }, debounce);
    }

    fn write(&mut self, store: &mut dyn ProgressStore, update: ProgressUpdate) {
        match store.write_progress(&self.story_id, update) {
            Ok(()) => {
                debug!(
                    story = %self.story_id,
                    page = update.current_page,
                    completed = update.is_completed,
                    "Progress saved"
                );
                self.last_written = Some(update);
            }
            Err(e) => {
                warn!(story = %self.story_id, error = %e, "Progress write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Runtime;
    use crate::platform::RecordingPlatform;
    use crate::types::PlaybackConfig;
    use fable_core::{FableError, ProgressRecord};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct MemoryStore {
        record: Option<ProgressRecord>,
        writes: Vec<ProgressUpdate>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl ProgressStore for MemoryStore {
        fn read_progress(&self, _story_id: &StoryId) -> fable_core::Result<Option<ProgressRecord>> {
            if self.fail_reads {
                return Err(FableError::network("offline"));
            }
            Ok(self.record.clone())
        }

        fn write_progress(
            &mut self,
            _story_id: &StoryId,
            update: ProgressUpdate,
        ) -> fable_core::Result<()> {
            if self.fail_writes {
                return Err(FableError::storage("rejected"));
            }
            self.writes.push(update);
            Ok(())
        }
    }

    fn saved(current_page: usize, is_completed: bool) -> MemoryStore {
        MemoryStore {
            record: Some(ProgressRecord {
                story_id: StoryId::new("s1"),
                current_page,
                is_completed,
                last_read_at: chrono::Utc::now(),
            }),
            ..Default::default()
        }
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(StoryId::new("s1"), 5)
    }

    #[test]
    fn restore_resumes_saved_page() {
        assert_eq!(tracker().restore(&saved(3, false), false), 2);
    }

    #[test]
    fn restore_ignores_completed_story() {
        assert_eq!(tracker().restore(&saved(5, true), false), 0);
    }

    #[test]
    fn restart_skips_saved_page() {
        assert_eq!(tracker().restore(&saved(3, false), true), 0);
    }

    #[test]
    fn read_failure_starts_at_first_page() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        assert_eq!(tracker().restore(&store, false), 0);
    }

    #[test]
    fn debounce_writes_settled_page() {
        let mut rt = Runtime::new(Box::new(RecordingPlatform::new()), PlaybackConfig::default());
        let t0 = Instant::now();
        let mut store = MemoryStore::default();
        let mut progress = tracker();

        progress.page_settled(&mut rt.at(t0), 4);
        let timer = rt.timers.pop_due(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(timer.kind, TimerKind::ProgressDebounce { page: 4 });
        progress.on_debounce(&mut store, 4);

        assert_eq!(
            store.writes,
            vec![ProgressUpdate {
                current_page: 5,
                is_completed: true
            }]
        );
        progress.flush(&mut store);
        assert_eq!(store.writes.len(), 1);
    }

    #[test]
    fn flush_never_completes() {
        let mut rt = Runtime::new(Box::new(RecordingPlatform::new()), PlaybackConfig::default());
        let mut store = MemoryStore::default();
        let mut progress = tracker();

        progress.page_settled(&mut rt.at(Instant::now()), 4);
        progress.flush(&mut store);

        assert_eq!(
            store.writes,
            vec![ProgressUpdate {
                current_page: 5,
                is_completed: false
            }]
        );
    }

    #[test]
    fn write_failure_is_swallowed() {
        let mut rt = Runtime::new(Box::new(RecordingPlatform::new()), PlaybackConfig::default());
        let mut store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let mut progress = tracker();

        progress.page_settled(&mut rt.at(Instant::now()), 1);
        progress.on_debounce(&mut store, 1);

        assert_eq!(progress.last_written(), None);
        assert_eq!(progress.pending(), None);
    }
}
