/// Collaborator traits consumed by the playback engine
///
/// All collaborators are synchronous from the engine's point of view. Hosts
/// backed by a network API cache or block as they see fit; the engine only
/// calls them at well-defined points (session open, settled page, teardown).
use crate::error::Result;
use crate::types::{Page, ProgressRecord, ProgressUpdate, StoryId, TransitionDirection};

/// Story page data provider
pub trait PageProvider {
    /// Fetch one page of a story (0-based index)
    ///
    /// # Errors
    /// Returns an error if the page does not exist or cannot be fetched
    fn get_page(&self, story_id: &StoryId, page_index: usize) -> Result<Page>;
}

/// Reading progress persistence
pub trait ProgressStore {
    /// Read the saved progress for a story
    ///
    /// Returns `Ok(None)` if the story was never opened.
    fn read_progress(&self, story_id: &StoryId) -> Result<Option<ProgressRecord>>;

    /// Save progress for a story
    fn write_progress(&mut self, story_id: &StoryId, update: ProgressUpdate) -> Result<()>;
}

/// Screen navigation outside the viewer
pub trait Navigator {
    /// Leave the viewer after the story finished naturally
    fn go_to_next_screen(&mut self);

    /// Leave the viewer because the user closed it
    fn exit_viewer(&mut self);
}

/// Page-turn animation primitive
///
/// Must return immediately; the engine does not wait for the animation.
pub trait TransitionPlayer {
    /// Start a page-turn animation
    fn play_transition(&mut self, direction: TransitionDirection);
}
