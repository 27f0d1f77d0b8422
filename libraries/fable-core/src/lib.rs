//! Fable Viewer Core
//!
//! Platform-agnostic story types, collaborator traits, and error handling for
//! Fable Viewer.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Story`, `Page`, `Sentence`, `ProgressRecord`, etc.
//! - **Collaborator Traits**: `PageProvider`, `ProgressStore`, `Navigator`, `TransitionPlayer`
//! - **Error Handling**: Unified `FableError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use fable_core::types::{Language, MediaRef, Page, Sentence};
//!
//! let page = Page::new(0).with_sentence(
//!     Sentence::new(0, "옛날 옛적에", "Once upon a time")
//!         .with_audio(Language::Ko, MediaRef::new("https://cdn.example/p0s0.ko.mp3")),
//! );
//!
//! assert!(page.has_sentence_audio(Language::Ko));
//! assert!(!page.has_sentence_audio(Language::En));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{FableError, Result};
pub use traits::{Navigator, PageProvider, ProgressStore, TransitionPlayer};

pub use types::{
    Language, Localized, LocalizedText, MediaRef, MediaType, Page, PageMedia, ProgressRecord,
    ProgressUpdate, Sentence, Story, StoryId, TransitionDirection,
};
