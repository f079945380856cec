//! Audio DSP probe.
//!
//! A silent triangle oscillator runs through an analyser and a script
//! processor. The floating-point output of the first processed buffer
//! differs slightly across audio stacks.
//!
//! The graph is owned by a guard that releases it on drop, so it is closed
//! whether the processing callback or the timeout wins the race.

use crate::env::{AudioGraph, AudioGraphSpec, EnvironmentProbe, Waveform};
use crate::error::ProbeError;
use std::time::Duration;
use tracing::debug;

pub const SENTINEL_UNSUPPORTED: &str = "audio-not-supported";
pub const SENTINEL_TIMEOUT: &str = "audio-timeout";
pub const SENTINEL_ERROR: &str = "audio-error";

/// The graph every device renders.
pub fn graph_spec() -> AudioGraphSpec {
    AudioGraphSpec {
        waveform: Waveform::Triangle,
        frequency_hz: 10_000.0,
        gain: 0.0,
        buffer_size: 4096,
    }
}

/// Releases the wrapped graph when dropped.
struct GraphGuard {
    graph: Box<dyn AudioGraph>,
}

impl Drop for GraphGuard {
    fn drop(&mut self) {
        self.graph.release();
    }
}

/// Render the graph and encode the first `sample_count` output samples.
///
/// Resolves with [`ProbeError::Timeout`] if no buffer arrives within
/// `timeout`.
pub async fn probe(
    env: &dyn EnvironmentProbe,
    sample_count: usize,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let mut guard = GraphGuard {
        graph: env.audio_graph(&graph_spec())?,
    };

    let samples = tokio::select! {
        biased;
        output = guard.graph.first_output() => output?,
        _ = env.sleep(timeout) => {
            debug!(timeout_ms = timeout.as_millis() as u64, "audio probe timed out");
            return Err(ProbeError::Timeout);
        }
    };

    Ok(encode_samples(&samples, sample_count))
}

/// Absolute values with ten decimals, concatenated.
pub fn encode_samples(samples: &[f32], sample_count: usize) -> String {
    samples
        .iter()
        .take(sample_count)
        .map(|s| format!("{:.10}", s.abs()))
        .collect()
}

/// Sentinel for a failed audio probe.
pub fn sentinel(error: &ProbeError) -> String {
    match error {
        ProbeError::Unavailable(_) => SENTINEL_UNSUPPORTED,
        ProbeError::Timeout => SENTINEL_TIMEOUT,
        ProbeError::Failed(_) => SENTINEL_ERROR,
    }
    .to_string()
}
