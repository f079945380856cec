//! Device fingerprint collection.
//!
//! The collector fans out to independent probes and waits for every one of
//! them to settle. A probe that fails settles with its sentinel value
//! instead of failing the collection; only an environment without any
//! measurement surface makes [`FingerprintCollector::collect`] fail.
//!
//! # Example
//!
//! ```no_run
//! use antifraud_sensor::{env, CollectorConfig, FingerprintCollector};
//!
//! # async fn run() -> Result<(), antifraud_sensor::CollectError> {
//! let collector = FingerprintCollector::new(env::detect(), CollectorConfig::default());
//! let fingerprint = collector.collect().await?;
//! println!("{}", fingerprint.raw_digest);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod canvas;
pub mod fonts;
pub mod navigator;
pub mod webgl;

use crate::config::CollectorConfig;
use crate::digest::digest;
use crate::env::EnvironmentProbe;
use crate::error::{CollectError, ProbeError};
use chrono::{DateTime, Utc};
use navigator::{BrowserInfo, DeviceType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use webgl::WebGlSignal;

/// Which probe produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Canvas,
    WebGl,
    Audio,
    Fonts,
}

/// One settled probe output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSignal<T> {
    pub probe: ProbeKind,
    pub value: T,
    /// The probe failed and `value` is its sentinel
    pub fallback: bool,
}

impl<T> FingerprintSignal<T> {
    /// Settle a probe result, substituting `sentinel` on failure.
    pub fn settle(
        probe: ProbeKind,
        result: Result<T, ProbeError>,
        sentinel: impl FnOnce(&ProbeError) -> T,
    ) -> Self {
        match result {
            Ok(value) => Self {
                probe,
                value,
                fallback: false,
            },
            Err(e) => {
                debug!(probe = ?probe, error = %e, "probe fell back to sentinel");
                Self {
                    probe,
                    value: sentinel(&e),
                    fallback: true,
                }
            }
        }
    }
}

/// Aggregate of every probe and readout, plus their joint digest.
///
/// Never mutated after creation; collect again for a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    pub canvas_fingerprint: String,
    pub webgl_fingerprint: String,
    pub audio_fingerprint: String,
    pub fonts_detected: Vec<String>,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    /// Probes that settled with a sentinel
    pub fallback_probes: Vec<ProbeKind>,

    pub platform: String,
    pub cpu_cores: u32,
    pub device_memory_gb: Option<f64>,
    pub screen_resolution: String,
    pub color_depth: u32,
    pub timezone: String,
    pub language: String,
    pub user_agent: String,
    pub plugins: Vec<String>,
    pub browser: BrowserInfo,
    pub operating_system: String,
    pub device_type: DeviceType,
    pub touch_support: bool,

    /// When the collection ran; not part of the digest
    pub collected_at: DateTime<Utc>,
    /// SHA-256 over every field above except `collected_at`
    pub raw_digest: String,
}

impl DeviceFingerprint {
    /// Length-prefixed join of every identity field.
    ///
    /// Length prefixes keep values containing the separator from
    /// colliding with neighbouring fields.
    pub fn canonical_string(&self) -> String {
        let memory = self
            .device_memory_gb
            .map(|m| m.to_string())
            .unwrap_or_else(|| "null".to_string());
        let fallbacks = self
            .fallback_probes
            .iter()
            .map(|p| format!("{p:?}"))
            .collect::<Vec<_>>()
            .join(",");

        let fields = [
            self.canvas_fingerprint.clone(),
            self.webgl_fingerprint.clone(),
            self.audio_fingerprint.clone(),
            self.fonts_detected.join(","),
            self.webgl_vendor.clone(),
            self.webgl_renderer.clone(),
            fallbacks,
            self.platform.clone(),
            self.cpu_cores.to_string(),
            memory,
            self.screen_resolution.clone(),
            self.color_depth.to_string(),
            self.timezone.clone(),
            self.language.clone(),
            self.user_agent.clone(),
            self.plugins.join(","),
            format!("{}/{}", self.browser.name, self.browser.version),
            self.operating_system.clone(),
            format!("{:?}", self.device_type),
            self.touch_support.to_string(),
        ];

        fields
            .iter()
            .map(|f| format!("{}:{}", f.len(), f))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Recompute the digest from the current field values.
    pub fn compute_digest(&self) -> String {
        digest(&self.canonical_string())
    }
}

/// Runs every probe against one environment.
pub struct FingerprintCollector {
    env: Box<dyn EnvironmentProbe>,
    config: CollectorConfig,
}

impl FingerprintCollector {
    pub fn new(env: Box<dyn EnvironmentProbe>, config: CollectorConfig) -> Self {
        Self { env, config }
    }

    pub fn environment(&self) -> &dyn EnvironmentProbe {
        self.env.as_ref()
    }

    /// Collect one fingerprint.
    ///
    /// Fails only with [`CollectError::EnvironmentUnsupported`].
    pub async fn collect(&self) -> Result<DeviceFingerprint, CollectError> {
        let env = self.env.as_ref();
        if !env.is_supported() {
            warn!(environment = env.name(), "fingerprint collection refused");
            return Err(CollectError::EnvironmentUnsupported(env.name().to_string()));
        }

        let (canvas, webgl, audio, fonts) = tokio::join!(
            canvas::probe(env),
            webgl::probe(env),
            audio::probe(env, self.config.audio_sample_count, self.config.audio_timeout),
            fonts::probe(env, &self.config.font_candidates),
        );

        let canvas = FingerprintSignal::settle(ProbeKind::Canvas, canvas, canvas::sentinel);
        let webgl = FingerprintSignal::settle(ProbeKind::WebGl, webgl, WebGlSignal::sentinel);
        let audio = FingerprintSignal::settle(ProbeKind::Audio, audio, audio::sentinel);
        let fonts = FingerprintSignal::settle(ProbeKind::Fonts, fonts, |_| Vec::new());

        let fallback_probes = [
            (canvas.probe, canvas.fallback),
            (webgl.probe, webgl.fallback),
            (audio.probe, audio.fallback),
            (fonts.probe, fonts.fallback),
        ]
        .into_iter()
        .filter(|(_, fallback)| *fallback)
        .map(|(probe, _)| probe)
        .collect();

        let host = navigator::read(env);

        let mut fingerprint = DeviceFingerprint {
            canvas_fingerprint: canvas.value,
            webgl_fingerprint: webgl.value.fingerprint,
            audio_fingerprint: audio.value,
            fonts_detected: fonts.value,
            webgl_vendor: webgl.value.vendor,
            webgl_renderer: webgl.value.renderer,
            fallback_probes,
            platform: host.navigator.platform,
            cpu_cores: host.navigator.hardware_concurrency,
            device_memory_gb: host.navigator.device_memory_gb,
            screen_resolution: format!("{}x{}", host.screen.width, host.screen.height),
            color_depth: host.screen.color_depth,
            timezone: host.timezone,
            language: host.navigator.language,
            user_agent: host.navigator.user_agent,
            plugins: host.navigator.plugins,
            browser: host.browser,
            operating_system: host.operating_system,
            device_type: host.device_type,
            touch_support: host.touch_support,
            collected_at: Utc::now(),
            raw_digest: String::new(),
        };
        fingerprint.raw_digest = fingerprint.compute_digest();

        info!(
            environment = env.name(),
            fallbacks = fingerprint.fallback_probes.len(),
            digest = %&fingerprint.raw_digest[..12],
            "fingerprint collected"
        );

        Ok(fingerprint)
    }
}

/// Collect a fingerprint from the detected host environment.
pub async fn collect_fingerprint() -> Result<DeviceFingerprint, CollectError> {
    FingerprintCollector::new(crate::env::detect(), CollectorConfig::default())
        .collect()
        .await
}

/// Only the digest of a fresh fingerprint.
pub async fn fingerprint_digest(collector: &FingerprintCollector) -> Result<String, CollectError> {
    Ok(collector.collect().await?.raw_digest)
}
