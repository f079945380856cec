//! Environment replayed from a recorded device profile.
//!
//! Native hosts have no DOM, so the CLI and the test suite drive the
//! probes through a profile captured from a real device (or written by
//! hand). The recorded surfaces also account for every handle they hand
//! out, which lets callers verify that probes release what they open.

use crate::env::{
    close_on_error, AudioGraph, AudioGraphSpec, Canvas2d, EnvironmentProbe, GlParameter,
    NavigatorInfo, ProbeFuture, ScreenInfo, WebGlSurface,
};
use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// A recorded device. Any `None` surface is reported as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentProfile {
    /// False models a host with no measurement surface at all
    pub supported: bool,
    pub canvas: Option<CanvasProfile>,
    pub webgl: Option<WebGlProfile>,
    pub audio: Option<AudioProfile>,
    pub navigator: Option<NavigatorInfo>,
    pub screen: Option<ScreenInfo>,
    pub timezone: Option<String>,
}

impl Default for EnvironmentProfile {
    fn default() -> Self {
        Self {
            supported: true,
            canvas: None,
            webgl: None,
            audio: None,
            navigator: None,
            screen: None,
            timezone: None,
        }
    }
}

impl EnvironmentProfile {
    /// Load a profile from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Rasterizer behavior of a recorded canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasProfile {
    /// Stands in for the GPU/driver/font-stack differences between devices
    pub raster_id: String,
    /// Per-character advance at the probe size for installed families
    pub installed_fonts: BTreeMap<String, f64>,
    /// Per-character advance of the monospace fallback
    pub monospace_width: f64,
    /// Simulate a canvas whose pixel readback throws
    pub fail_encode: bool,
}

impl Default for CanvasProfile {
    fn default() -> Self {
        Self {
            raster_id: "default".to_string(),
            installed_fonts: BTreeMap::new(),
            monospace_width: 43.2,
            fail_encode: false,
        }
    }
}

/// Recorded WebGL context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebGlProfile {
    pub debug_renderer_info: bool,
    pub parameters: HashMap<GlParameter, String>,
}

/// Recorded audio processing behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProfile {
    /// First processed output buffer, channel 0
    pub samples: Vec<f32>,
    /// Delay before the processing callback fires
    pub delay_ms: u64,
    /// The processing callback never fires
    pub never_fires: bool,
    /// Node creation throws after the context has been opened
    pub fail_nodes: bool,
}

#[derive(Debug, Default)]
struct ResourceLedger {
    canvases_open: Cell<i64>,
    audio_open: Cell<i64>,
    audio_releases: Cell<u32>,
}

/// Environment backed by an [`EnvironmentProfile`].
#[derive(Debug, Clone)]
pub struct RecordedEnvironment {
    profile: EnvironmentProfile,
    ledger: Rc<ResourceLedger>,
}

impl RecordedEnvironment {
    pub fn new(profile: EnvironmentProfile) -> Self {
        Self {
            profile,
            ledger: Rc::new(ResourceLedger::default()),
        }
    }

    pub fn profile(&self) -> &EnvironmentProfile {
        &self.profile
    }

    /// Canvases (2D and WebGL) created and not yet dropped.
    pub fn open_canvases(&self) -> i64 {
        self.ledger.canvases_open.get()
    }

    /// Audio graphs opened and not yet released.
    pub fn open_audio_graphs(&self) -> i64 {
        self.ledger.audio_open.get()
    }

    /// Number of audio graphs released so far.
    pub fn audio_releases(&self) -> u32 {
        self.ledger.audio_releases.get()
    }

    fn open_canvas(&self) {
        self.ledger
            .canvases_open
            .set(self.ledger.canvases_open.get() + 1);
    }
}

impl EnvironmentProbe for RecordedEnvironment {
    fn name(&self) -> &'static str {
        "recorded"
    }

    fn is_supported(&self) -> bool {
        self.profile.supported
    }

    fn canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, ProbeError> {
        let profile = self
            .profile
            .canvas
            .clone()
            .ok_or(ProbeError::Unavailable("canvas"))?;
        self.open_canvas();
        Ok(Box::new(RecordedCanvas {
            profile,
            ledger: self.ledger.clone(),
            ops: vec![format!("size {width}x{height}")],
            font: "10px sans-serif".to_string(),
        }))
    }

    fn webgl(&self) -> Result<Box<dyn WebGlSurface>, ProbeError> {
        let profile = self
            .profile
            .webgl
            .clone()
            .ok_or(ProbeError::Unavailable("webgl"))?;
        self.open_canvas();
        Ok(Box::new(RecordedWebGl {
            profile,
            ledger: self.ledger.clone(),
        }))
    }

    fn audio_graph(&self, _spec: &AudioGraphSpec) -> Result<Box<dyn AudioGraph>, ProbeError> {
        let profile = self
            .profile
            .audio
            .clone()
            .ok_or(ProbeError::Unavailable("audio"))?;
        self.ledger.audio_open.set(self.ledger.audio_open.get() + 1);
        close_on_error(
            &self.ledger,
            |_| {
                if profile.fail_nodes {
                    Err(ProbeError::Failed(
                        "createScriptProcessor: not supported".to_string(),
                    ))
                } else {
                    Ok(())
                }
            },
            |ledger| ledger.audio_open.set(ledger.audio_open.get() - 1),
        )?;
        Ok(Box::new(RecordedAudioGraph {
            profile,
            ledger: self.ledger.clone(),
            released: false,
        }))
    }

    fn navigator(&self) -> Result<NavigatorInfo, ProbeError> {
        self.profile
            .navigator
            .clone()
            .ok_or(ProbeError::Unavailable("navigator"))
    }

    fn screen(&self) -> Result<ScreenInfo, ProbeError> {
        self.profile.screen.ok_or(ProbeError::Unavailable("screen"))
    }

    fn timezone(&self) -> Result<String, ProbeError> {
        self.profile
            .timezone
            .clone()
            .ok_or(ProbeError::Unavailable("intl"))
    }

    fn sleep(&self, duration: Duration) -> ProbeFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct RecordedCanvas {
    profile: CanvasProfile,
    ledger: Rc<ResourceLedger>,
    ops: Vec<String>,
    font: String,
}

impl RecordedCanvas {
    /// Per-character advance for the current font stack.
    fn advance(&self) -> f64 {
        // "72px \"Arial\", monospace" -> ["Arial", "monospace"]
        let families = self
            .font
            .split_once(' ')
            .map(|(_, rest)| rest)
            .unwrap_or("");
        for family in families.split(',') {
            let family = family.trim().trim_matches('"').trim_matches('\'');
            if let Some(width) = self.profile.installed_fonts.get(family) {
                return *width;
            }
            if family == "monospace" {
                break;
            }
        }
        self.profile.monospace_width
    }
}

impl Canvas2d for RecordedCanvas {
    fn set_text_baseline(&mut self, baseline: &str) {
        self.ops.push(format!("baseline {baseline}"));
    }

    fn set_fill_style(&mut self, style: &str) {
        self.ops.push(format!("fill {style}"));
    }

    fn set_font(&mut self, font: &str) {
        self.font = font.to_string();
        self.ops.push(format!("font {font}"));
    }

    fn set_composite_operation(&mut self, operation: &str) -> Result<(), ProbeError> {
        self.ops.push(format!("composite {operation}"));
        Ok(())
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(format!("rect {x},{y},{width},{height}"));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError> {
        let advance = self.advance();
        self.ops.push(format!("text {text}@{x},{y}/{advance}"));
        Ok(())
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<(), ProbeError> {
        self.ops.push(format!("circle {x},{y},{radius}"));
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> Result<f64, ProbeError> {
        Ok(self.advance() * text.chars().count() as f64)
    }

    fn encode(&mut self) -> Result<String, ProbeError> {
        if self.profile.fail_encode {
            return Err(ProbeError::Failed("canvas readback blocked".to_string()));
        }
        let raster = format!("{}|{}", self.profile.raster_id, self.ops.join(";"));
        Ok(format!(
            "data:image/png;base64,{}",
            crate::digest::digest(&raster)
        ))
    }
}

impl Drop for RecordedCanvas {
    fn drop(&mut self) {
        self.ledger
            .canvases_open
            .set(self.ledger.canvases_open.get() - 1);
    }
}

struct RecordedWebGl {
    profile: WebGlProfile,
    ledger: Rc<ResourceLedger>,
}

impl WebGlSurface for RecordedWebGl {
    fn has_debug_renderer_info(&self) -> bool {
        self.profile.debug_renderer_info
    }

    fn parameter(&self, parameter: GlParameter) -> Result<String, ProbeError> {
        self.profile
            .parameters
            .get(&parameter)
            .cloned()
            .ok_or_else(|| ProbeError::Failed(format!("getParameter({parameter:?}) threw")))
    }
}

impl Drop for RecordedWebGl {
    fn drop(&mut self) {
        self.ledger
            .canvases_open
            .set(self.ledger.canvases_open.get() - 1);
    }
}

struct RecordedAudioGraph {
    profile: AudioProfile,
    ledger: Rc<ResourceLedger>,
    released: bool,
}

impl AudioGraph for RecordedAudioGraph {
    fn first_output(&mut self) -> ProbeFuture<'_, Result<Vec<f32>, ProbeError>> {
        if self.profile.never_fires {
            return Box::pin(std::future::pending());
        }
        let samples = self.profile.samples.clone();
        let delay = Duration::from_millis(self.profile.delay_ms);
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(samples)
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.ledger.audio_open.set(self.ledger.audio_open.get() - 1);
        self.ledger
            .audio_releases
            .set(self.ledger.audio_releases.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_profile() -> CanvasProfile {
        let mut installed_fonts = BTreeMap::new();
        installed_fonts.insert("Arial".to_string(), 40.0);
        CanvasProfile {
            raster_id: "gpu-a".to_string(),
            installed_fonts,
            monospace_width: 43.2,
            fail_encode: false,
        }
    }

    #[test]
    fn test_malformed_profile_is_invalid_data() {
        let path = std::env::temp_dir().join(format!("profile-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = EnvironmentProfile::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        std::fs::write(&path, r#"{"timezone": "Europe/Paris"}"#).unwrap();
        let profile = EnvironmentProfile::from_file(&path).unwrap();
        assert_eq!(profile.timezone.as_deref(), Some("Europe/Paris"));
        assert!(profile.supported);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_measure_text_uses_first_installed_family() {
        let env = RecordedEnvironment::new(EnvironmentProfile {
            canvas: Some(canvas_profile()),
            ..Default::default()
        });
        let mut canvas = env.canvas(10, 10).unwrap();

        canvas.set_font("72px monospace");
        assert!((canvas.measure_text("abcd").unwrap() - 172.8).abs() < 1e-9);

        canvas.set_font("72px \"Arial\", monospace");
        assert!((canvas.measure_text("abcd").unwrap() - 160.0).abs() < 1e-9);

        canvas.set_font("72px \"Missing\", monospace");
        assert!((canvas.measure_text("abcd").unwrap() - 172.8).abs() < 1e-9);
    }

    #[test]
    fn test_canvas_handles_are_accounted() {
        let env = RecordedEnvironment::new(EnvironmentProfile {
            canvas: Some(canvas_profile()),
            ..Default::default()
        });
        let canvas = env.canvas(10, 10).unwrap();
        assert_eq!(env.open_canvases(), 1);
        drop(canvas);
        assert_eq!(env.open_canvases(), 0);
    }

    #[test]
    fn test_audio_release_is_idempotent() {
        let env = RecordedEnvironment::new(EnvironmentProfile {
            audio: Some(AudioProfile::default()),
            ..Default::default()
        });
        let spec = AudioGraphSpec {
            waveform: crate::env::Waveform::Triangle,
            frequency_hz: 10_000.0,
            gain: 0.0,
            buffer_size: 4096,
        };
        let mut graph = env.audio_graph(&spec).unwrap();
        assert_eq!(env.open_audio_graphs(), 1);
        graph.release();
        graph.release();
        assert_eq!(env.open_audio_graphs(), 0);
        assert_eq!(env.audio_releases(), 1);
    }

    #[test]
    fn test_profile_json_roundtrip_with_gl_keys() {
        let mut parameters = HashMap::new();
        parameters.insert(GlParameter::MaxTextureSize, "16384".to_string());
        let profile = EnvironmentProfile {
            webgl: Some(WebGlProfile {
                debug_renderer_info: true,
                parameters,
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("MAX_TEXTURE_SIZE"));
        let back: EnvironmentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_empty_json_profile_is_supported_with_no_surfaces() {
        let profile: EnvironmentProfile = serde_json::from_str("{}").unwrap();
        let env = RecordedEnvironment::new(profile);
        assert!(env.is_supported());
        assert!(env.navigator().is_err());
    }
}
