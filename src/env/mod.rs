//! Measurement surfaces the fingerprint probes read from.
//!
//! A host environment is chosen once, at construction, and handed to the
//! collector. Probes only see the [`EnvironmentProbe`] trait; they never
//! check for themselves whether they run inside a browser.

pub mod degraded;

#[cfg(not(target_arch = "wasm32"))]
pub mod recorded;

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub mod browser;

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use degraded::DegradedEnvironment;

#[cfg(not(target_arch = "wasm32"))]
pub use recorded::{EnvironmentProfile, RecordedEnvironment};

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub use browser::BrowserEnvironment;

/// A future local to the host's main thread.
pub type ProbeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A 2D drawing surface. Dropping it releases the backing canvas.
pub trait Canvas2d {
    fn set_text_baseline(&mut self, baseline: &str);
    fn set_fill_style(&mut self, style: &str);
    fn set_font(&mut self, font: &str);
    fn set_composite_operation(&mut self, operation: &str) -> Result<(), ProbeError>;
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError>;
    /// Fill a full circle as a closed path.
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<(), ProbeError>;
    /// Rendered width of `text` in the current font, in pixels.
    fn measure_text(&mut self, text: &str) -> Result<f64, ProbeError>;
    /// Encoded pixel contents (a data URL in browsers).
    fn encode(&mut self) -> Result<String, ProbeError>;
}

/// WebGL parameters the probe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlParameter {
    Vendor,
    Renderer,
    UnmaskedVendor,
    UnmaskedRenderer,
    Version,
    ShadingLanguageVersion,
    MaxTextureSize,
    MaxVertexAttribs,
    MaxVertexUniformVectors,
    MaxVaryingVectors,
    MaxFragmentUniformVectors,
}

/// A WebGL context. Dropping it releases the backing canvas.
pub trait WebGlSurface {
    /// Whether `WEBGL_debug_renderer_info` is exposed.
    fn has_debug_renderer_info(&self) -> bool;
    /// A parameter rendered as a string.
    fn parameter(&self, parameter: GlParameter) -> Result<String, ProbeError>;
}

/// Oscillator waveform for the audio probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Shape of the oscillator -> analyser -> processor -> gain -> destination graph.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGraphSpec {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub gain: f32,
    pub buffer_size: u32,
}

/// A live audio graph.
///
/// `release` stops the oscillator, disconnects the processor and closes the
/// context. It must be safe to call more than once.
pub trait AudioGraph {
    /// Resolves with channel 0 of the first processed output buffer.
    fn first_output(&mut self) -> ProbeFuture<'_, Result<Vec<f32>, ProbeError>>;
    fn release(&mut self);
}

/// Navigator readouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorInfo {
    pub user_agent: String,
    pub platform: String,
    pub language: String,
    pub hardware_concurrency: u32,
    pub device_memory_gb: Option<f64>,
    pub max_touch_points: u32,
    /// `ontouchstart` present on the window
    pub touch_events: bool,
    pub plugins: Vec<String>,
}

impl Default for NavigatorInfo {
    fn default() -> Self {
        Self {
            user_agent: "unknown".to_string(),
            platform: "unknown".to_string(),
            language: "unknown".to_string(),
            hardware_concurrency: 0,
            device_memory_gb: None,
            max_touch_points: 0,
            touch_events: false,
            plugins: Vec::new(),
        }
    }
}

/// Screen readouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
}

/// Capability interface over the host's measurement surfaces.
///
/// Every accessor reports a missing surface as an error instead of
/// panicking; the probes turn those errors into sentinels.
pub trait EnvironmentProbe {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether any measurement surface exists at all.
    fn is_supported(&self) -> bool;

    fn canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, ProbeError>;

    fn webgl(&self) -> Result<Box<dyn WebGlSurface>, ProbeError>;

    fn audio_graph(&self, spec: &AudioGraphSpec) -> Result<Box<dyn AudioGraph>, ProbeError>;

    fn navigator(&self) -> Result<NavigatorInfo, ProbeError>;

    fn screen(&self) -> Result<ScreenInfo, ProbeError>;

    /// IANA timezone name reported by the host.
    fn timezone(&self) -> Result<String, ProbeError>;

    /// Resolves after `duration` on the host's event loop.
    fn sleep(&self, duration: Duration) -> ProbeFuture<'_, ()>;
}

/// Run `build` against a freshly opened host resource, closing the
/// resource when the build fails.
///
/// Until the built value owns the resource nothing else will release it.
pub fn close_on_error<R, T>(
    resource: &R,
    build: impl FnOnce(&R) -> Result<T, ProbeError>,
    close: impl FnOnce(&R),
) -> Result<T, ProbeError> {
    build(resource).map_err(|e| {
        close(resource);
        e
    })
}

/// Pick the environment for the current host.
///
/// Browsers get the DOM-backed environment; everything else gets the
/// degraded one.
pub fn detect() -> Box<dyn EnvironmentProbe> {
    #[cfg(all(target_arch = "wasm32", feature = "browser"))]
    {
        if let Some(env) = BrowserEnvironment::new() {
            return Box::new(env);
        }
    }

    Box::new(DegradedEnvironment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_detect_outside_browser_is_degraded() {
        let env = detect();
        assert_eq!(env.name(), "degraded");
        assert!(!env.is_supported());
    }

    #[test]
    fn test_close_on_error_closes_only_on_failure() {
        use std::cell::Cell;

        let closed = Cell::new(0);
        let built = close_on_error(&closed, |_| Ok(7), |c| c.set(c.get() + 1));
        assert_eq!(built, Ok(7));
        assert_eq!(closed.get(), 0);

        let failed: Result<(), ProbeError> = close_on_error(
            &closed,
            |_| Err(ProbeError::Failed("createScriptProcessor".to_string())),
            |c| c.set(c.get() + 1),
        );
        assert!(failed.is_err());
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_navigator_defaults_are_sentinels() {
        let info = NavigatorInfo::default();
        assert_eq!(info.user_agent, "unknown");
        assert_eq!(info.hardware_concurrency, 0);
        assert!(info.plugins.is_empty());
    }

    #[test]
    fn test_gl_parameter_serialization() {
        let json = serde_json::to_string(&GlParameter::MaxTextureSize).unwrap();
        assert_eq!(json, "\"MAX_TEXTURE_SIZE\"");
    }
}
