mod ids;
mod language;
mod page;
mod progress;
mod story;

pub use ids::StoryId;
pub use language::{Language, Localized, LocalizedText};
pub use page::{MediaRef, MediaType, Page, PageMedia, Sentence};
pub use progress::{ProgressRecord, ProgressUpdate};
pub use story::{Story, TransitionDirection};
