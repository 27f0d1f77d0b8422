/// Viewer configuration
use crate::error::{Result, ViewerError};
use fable_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for overrides, e.g. `FABLE_PLAYBACK__SENTENCE_GAP_MS=250`
pub const ENV_PREFIX: &str = "FABLE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    /// Engine timing and defaults
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,
}

/// How the simulated media platform behaves
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Time from load request to ready
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    /// Length of every narration clip
    #[serde(default = "default_clip_ms")]
    pub clip_ms: u64,

    /// Length of one video cycle
    #[serde(default = "default_video_ms")]
    pub video_ms: u64,

    /// Sources that fail to load
    #[serde(default)]
    pub failing_sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_progress_path")]
    pub progress_path: PathBuf,
}

impl ViewerConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Default file in the working directory unless one was given
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("fable-viewer.toml"));
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(ViewerError::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        // Nested keys use a double underscore since field names contain single ones
        settings = settings.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("simulation.failing_sources")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .map_err(|e| ViewerError::Config(e.to_string()))?;

        if self.simulation.clip_ms == 0 || self.simulation.video_ms == 0 {
            return Err(ViewerError::Config(
                "simulated clip and video lengths must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            simulation: default_simulation(),
            storage: default_storage(),
        }
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        load_latency_ms: default_load_latency_ms(),
        clip_ms: default_clip_ms(),
        video_ms: default_video_ms(),
        failing_sources: Vec::new(),
    }
}

fn default_load_latency_ms() -> u64 {
    150
}

fn default_clip_ms() -> u64 {
    1800
}

fn default_video_ms() -> u64 {
    4000
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        progress_path: default_progress_path(),
    }
}

fn default_progress_path() -> PathBuf {
    PathBuf::from("./data/progress.json")
}

impl Default for SimulationSettings {
    fn default() -> Self {
        default_simulation()
    }
}
