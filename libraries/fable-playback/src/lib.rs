//! Fable Viewer - Playback Orchestration
//!
//! Platform-agnostic story playback for Fable Viewer.
//!
//! This crate provides:
//! - Sentence-level narration queue (ordered clips, inter-sentence gap, prefetch)
//! - Page video completion (two cycles, fallback timer)
//! - Background music (looping, volume ceiling, suspend/resume)
//! - Auto-advance (both media done + minimum display time)
//! - Progress persistence (debounced writes, restore on open, flush on close)
//! - Audio unlock handshake for gesture-gated platforms
//!
//! # Architecture
//!
//! `fable-playback` is sans-IO:
//! - No audio device, no UI toolkit, no network
//! - Time is passed into every call as an `Instant`
//! - Timers live in the engine; the host asks for `next_deadline()` and calls `poll()`
//! - Platform media callbacks are delivered with `on_media_event()`
//!
//! Every timer and every clip request is stamped with a session generation.
//! Page changes, language changes, resets and teardown advance the
//! generation, so late callbacks for the old state are silently dropped.
//!
//! # Example: Host Loop
//!
//! ```rust,no_run
//! use fable_playback::{
//!     Collaborators, MediaEvent, OpenOptions, PlaybackConfig, PlaybackSession,
//! };
//! use fable_core::{PageProvider, Story};
//! use std::time::Instant;
//!
//! fn run(story: Story, pages: &dyn PageProvider, collaborators: Collaborators) {
//!     let mut session = PlaybackSession::open(
//!         story,
//!         pages,
//!         collaborators,
//!         PlaybackConfig::default(),
//!         OpenOptions::default(),
//!         Instant::now(),
//!     )
//!     .expect("story opens");
//!
//!     while !session.is_closed() {
//!         // Sleep until session.next_deadline() or a media/user event arrives...
//!         session.poll(Instant::now());
//!         for event in session.drain_events() {
//!             println!("{event:?}");
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

pub mod auto_advance;
pub mod backend;
mod context;
pub mod error;
pub mod events;
pub mod generation;
pub mod music;
pub mod platform;
pub mod progress;
pub mod sentence_queue;
pub mod session;
pub mod timer;
pub mod types;
pub mod unlock;
pub mod video;
pub mod volume;

// Re-export main types
pub use auto_advance::{advance_delay, AutoAdvance};
pub use backend::{AudioBackend, DoubleBufferedBackend, SingleHandleBackend};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use generation::Generation;
pub use music::{MusicController, SuspendReason};
pub use platform::{ClipId, LoadRequest, MediaEvent, MediaEventKind, MediaKind, MediaPlatform};
pub use progress::ProgressTracker;
pub use sentence_queue::SentenceQueue;
pub use session::{Collaborators, OpenOptions, PlaybackSession, SessionSnapshot};
pub use timer::{TimerKind, TimerQueue};
pub use types::{AudioPolicy, NarrationMode, PlaybackConfig, QueueState, Track};
pub use unlock::{AudioUnlockGate, UnlockState};
pub use video::{VideoController, VideoPhase};
pub use volume::Volume;
