//! Behavioral core.
//!
//! This module contains:
//! - Bounded session state fed by interaction events
//! - The tracker that owns a session and listens to an event source
//! - The bot/human scoring engine
//! - Report assembly for the risk service

pub mod clock;
pub mod report;
pub mod ring;
pub mod scoring;
pub mod session;
pub mod tracker;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use report::{BehavioralReport, ClickPattern};
pub use ring::RingBuffer;
pub use scoring::{assess, BotAssessment, IntervalStats, ScoringInput};
pub use session::BehaviorSession;
pub use tracker::{create_tracker, BehaviorTracker, TrackerState};
