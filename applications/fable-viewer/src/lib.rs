//! Fable Viewer Library
//!
//! Command-line host for the playback engine: story bundles, a JSON progress
//! file, a simulated media platform and the tokio host loop.
//!
//! This library exposes the components for testing purposes.

pub mod config;
pub mod error;
pub mod host;
pub mod progress_store;
pub mod simulator;
pub mod story;

// Re-export commonly used types for convenience
pub use config::{SimulationSettings, StorageSettings, ViewerConfig};
pub use error::{Result, ViewerError};
pub use host::{run_story, RunReport, ViewerCommand, ViewerExit, ViewerOptions};
pub use progress_store::JsonProgressStore;
pub use simulator::SimulatedPlatform;
pub use story::StoryBundle;
