//! Error types for the antifraud sensor.

use thiserror::Error;

/// Failure of a whole fingerprint collection.
///
/// Individual probes never surface here; they degrade to sentinel values.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Environment unsupported: {0}")]
    EnvironmentUnsupported(String),
}

/// Failure inside a single probe. Never leaves the probe that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("Probe surface unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Probe failed: {0}")]
    Failed(String),

    #[error("Probe timed out")]
    Timeout,
}

/// Configuration load/save errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Digest helper errors.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Failed to serialize value for digest: {0}")]
    Serialize(#[from] serde_json::Error),
}
