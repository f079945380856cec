//! Antifraud Sensor - device fingerprinting and behavioral bot scoring.
//!
//! This library runs inside a client application and produces two signals
//! for a downstream risk decision: a stable device digest and a report on
//! how human the current session's interaction timing looks.
//!
//! # Guarantees
//!
//! - **Probe isolation**: one failing probe settles to a sentinel, never
//!   failing or cancelling the others
//! - **Bounded memory**: every per-session buffer is a fixed-capacity ring
//! - **Guaranteed release**: audio graphs and canvases are released on every
//!   exit path, including the audio timeout
//! - **Quiet handlers**: event handlers never panic into the host
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Antifraud Sensor                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │ Environment │──▶│   Probes    │──▶│   Digest    │         │
//! │  │  (env::*)   │   │ (join all)  │   │ (SHA-256)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                                                              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │ EventSource │──▶│   Tracker   │──▶│  Scoring +  │         │
//! │  │ (collector) │   │  (session)  │   │   Report    │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use chrono::Utc;
//! use antifraud_sensor::{create_tracker, InteractionEvent, LocalEventBus};
//!
//! let bus = Rc::new(LocalEventBus::new());
//! let tracker = create_tracker(bus.clone());
//!
//! bus.dispatch(&InteractionEvent::key_down(Utc::now(), "a"));
//! tracker.on_page_visited("/checkout");
//!
//! let report = tracker.snapshot();
//! assert_eq!(report.pages_visited, 1);
//! tracker.stop();
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod digest;
pub mod env;
pub mod error;
pub mod fingerprint;

// Re-export key types at crate root for convenience
pub use collector::{EventKind, EventSource, InteractionEvent, LocalEventBus};
pub use config::{CollectorConfig, Config, ScoringThresholds, TrackerConfig};
pub use self::core::{
    assess, create_tracker, BehaviorTracker, BehavioralReport, BotAssessment, TrackerState,
};
pub use digest::{anonymize, digest, same_device, unique_id};
pub use env::{detect, EnvironmentProbe};
pub use error::{CollectError, ConfigError, DigestError, ProbeError};
pub use fingerprint::{
    collect_fingerprint, fingerprint_digest, DeviceFingerprint, FingerprintCollector,
};

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub use collector::DomEventSource;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
