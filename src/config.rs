//! Configuration for the EEG stress agent.

use crate::core::classifier::LinearClassifierConfig;
use crate::core::smoothing::{
    DEFAULT_DECISION_THRESHOLD, DEFAULT_PREDICTION_WINDOW, DEFAULT_PROBABILITY_WINDOW,
};
use crate::core::stability::DEFAULT_STABILITY_THRESHOLD;
use crate::core::window::DEFAULT_WINDOW_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default interval between inference ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(200);

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Windowing, smoothing and scheduling parameters
    pub pipeline: PipelineConfig,

    /// Where raw payloads come from
    pub source: SourceConfig,

    /// Parameters of the built-in linear classifier
    pub classifier: LinearClassifierConfig,

    /// Path for exporting session events
    pub export_path: PathBuf,

    /// Path for storing state and statistics
    pub data_path: PathBuf,

    /// Whether inference is currently paused
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eeg-stress-agent");

        Self {
            pipeline: PipelineConfig::default(),
            source: SourceConfig::default(),
            classifier: LinearClassifierConfig::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if it is missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eeg-stress-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Recognized pipeline options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames kept in the sliding window (C_w)
    pub window_capacity: usize,
    /// Probabilities averaged by the smoother (C_p)
    pub probability_window_size: usize,
    /// Labels voted over (C_d)
    pub prediction_window_size: usize,
    /// Consecutive repeats before a verdict is emitted
    pub stability_threshold: u32,
    /// Averaged probability above which a tick counts as Stress
    pub decision_threshold: f64,
    /// Interval between inference ticks
    #[serde(with = "duration_millis", rename = "tick_period_ms")]
    pub tick_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            probability_window_size: DEFAULT_PROBABILITY_WINDOW,
            prediction_window_size: DEFAULT_PREDICTION_WINDOW,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("window_capacity", self.window_capacity),
            ("probability_window_size", self.probability_window_size),
            ("prediction_window_size", self.prediction_window_size),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }

        if !self.decision_threshold.is_finite() || !(0.0..=1.0).contains(&self.decision_threshold)
        {
            return Err(ConfigError::Invalid(format!(
                "decision_threshold must be within [0, 1], got {}",
                self.decision_threshold
            )));
        }

        if self.tick_period.is_zero() {
            return Err(ConfigError::Invalid(
                "tick_period must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Kind of payload source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Generated sinusoids
    Synthetic,
    /// A recorded binary file
    Replay,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "synthetic" | "sim" => Ok(SourceKind::Synthetic),
            "replay" | "file" => Ok(SourceKind::Replay),
            other => Err(ConfigError::Invalid(format!("unknown source '{other}'"))),
        }
    }
}

/// Configuration for the payload source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Interval between delivered payloads
    #[serde(with = "duration_millis", rename = "sample_interval_ms")]
    pub sample_interval: Duration,
    /// Recording to replay (replay sources only)
    pub replay_file: Option<PathBuf>,
    /// Generate high-amplitude "stressed" signal (synthetic sources only)
    pub stress: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            sample_interval: Duration::from_millis(200),
            replay_file: None,
            stress: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
