//! Configuration for the antifraud sensor.
//!
//! Every threshold the scoring engine and tracker use lives here. The
//! defaults are uncalibrated starting points; deployments are expected to
//! retune them against their own traffic.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behavior tracker buffer sizes and sampling ratios
    pub tracker: TrackerConfig,
    /// Bot/human scoring thresholds and weights
    pub scoring: ScoringThresholds,
    /// Fingerprint probe settings
    pub collector: CollectorConfig,
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, or defaults if absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("antifraud-sensor")
            .join("config.json")
    }

    /// Reject values that would make the tracker or collector meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracker;
        let capacities = [
            ("event_log_capacity", t.event_log_capacity),
            ("key_interval_capacity", t.key_interval_capacity),
            ("click_capacity", t.click_capacity),
            ("mouse_move_sample_every", t.mouse_move_sample_every as usize),
            ("scroll_sample_every", t.scroll_sample_every as usize),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }

        if self.collector.audio_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "audio_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Behavior tracker buffer sizes and sampling ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Generic event log ring capacity
    pub event_log_capacity: usize,
    /// Key-interval ring capacity
    pub key_interval_capacity: usize,
    /// Click-timestamp ring capacity
    pub click_capacity: usize,
    /// Persist one MouseMove out of this many
    pub mouse_move_sample_every: u64,
    /// Persist one Scroll out of this many
    pub scroll_sample_every: u64,
    /// Number of inter-event gaps included in a report
    pub recent_gaps: usize,
    /// Number of event-type tags included in a report
    pub recent_sequence: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: 1000,
            key_interval_capacity: 1000,
            click_capacity: 1000,
            mouse_move_sample_every: 100,
            scroll_sample_every: 10,
            recent_gaps: 100,
            recent_sequence: 50,
        }
    }
}

/// Thresholds and weights for the bot/human heuristics.
///
/// Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub regularity_min_samples: usize,
    pub regularity_max_std_dev_ms: f64,
    pub regularity_weight: f64,

    pub too_fast_min_samples: usize,
    pub too_fast_max_mean_ms: f64,
    pub too_fast_weight: f64,

    pub no_mouse_min_events: usize,
    pub no_mouse_weight: f64,

    pub click_min_count: usize,
    pub click_max_std_dev_ms: f64,
    pub click_weight: f64,

    /// Key intervals needed before variability affects normalcy; with
    /// the default of 1 only an empty sample is exempt
    pub variability_min_samples: usize,
    pub zero_variability_penalty: f64,
    pub low_variability_max_std_dev_ms: f64,
    pub low_variability_penalty: f64,
    pub mouse_bonus: f64,
    pub scroll_bonus: f64,

    pub human_min_normalcy: f64,
    pub human_max_bot_score: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            regularity_min_samples: 10,
            regularity_max_std_dev_ms: 10.0,
            regularity_weight: 0.3,

            too_fast_min_samples: 5,
            too_fast_max_mean_ms: 20.0,
            too_fast_weight: 0.3,

            no_mouse_min_events: 50,
            no_mouse_weight: 0.2,

            click_min_count: 5,
            click_max_std_dev_ms: 50.0,
            click_weight: 0.2,

            variability_min_samples: 1,
            zero_variability_penalty: 0.5,
            low_variability_max_std_dev_ms: 20.0,
            low_variability_penalty: 0.3,
            mouse_bonus: 0.2,
            scroll_bonus: 0.1,

            human_min_normalcy: 0.6,
            human_max_bot_score: 0.4,
        }
    }
}

/// Fingerprint probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// How long the audio probe waits for its first processed buffer
    #[serde(with = "duration_ms")]
    pub audio_timeout: Duration,
    /// Number of leading samples taken from the processed buffer
    pub audio_sample_count: usize,
    /// Candidate font families for width probing
    pub font_candidates: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            audio_timeout: Duration::from_secs(1),
            audio_sample_count: 30,
            font_candidates: DEFAULT_FONT_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Fonts probed by default.
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "Arial",
    "Verdana",
    "Times New Roman",
    "Courier New",
    "Georgia",
    "Palatino",
    "Garamond",
    "Bookman",
    "Comic Sans MS",
    "Trebuchet MS",
    "Arial Black",
    "Impact",
    "Lucida Sans Unicode",
    "Tahoma",
    "Lucida Console",
    "Monaco",
    "Courier",
    "Helvetica",
    "Calibri",
    "Cambria",
    "Consolas",
    "Segoe UI",
    "Roboto",
    "Ubuntu",
    "Open Sans",
    "Montserrat",
];

/// Serde support for Duration as milliseconds.
mod duration_ms {
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
