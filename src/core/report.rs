//! Point-in-time behavioral report.
//!
//! A report is a projection over a [`BehaviorSession`] plus the scoring
//! engine's output. It is rebuilt on every snapshot and never stored.

use crate::collector::types::EventKind;
use crate::config::{ScoringThresholds, TrackerConfig};
use crate::core::scoring::{assess, IntervalStats, ScoringInput};
use crate::core::session::BehaviorSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Click timing summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickPattern {
    pub total: usize,
    pub mean_interval_ms: f64,
    pub std_dev_interval_ms: f64,
}

/// Flat, JSON-serializable report handed to the risk service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,

    // Velocity
    pub key_interval_mean_ms: f64,
    pub key_interval_std_dev_ms: f64,
    /// Mouse moves per second of session time
    pub mouse_activity_rate: f64,

    pub click_pattern: ClickPattern,

    // Pattern inspection
    pub recent_gaps_ms: Vec<f64>,
    pub recent_sequence: Vec<EventKind>,

    // Totals
    pub total_events: usize,
    pub session_duration_secs: f64,
    pub pages_visited: usize,
    pub key_frequency: BTreeMap<String, u64>,
    pub mouse_moves: u64,
    pub scrolls: u64,

    // Verdict
    pub regularity_excessive: bool,
    pub actions_too_fast: bool,
    pub human_pattern: bool,
    pub bot_score: f64,
    pub normalcy_score: f64,
}

impl BehavioralReport {
    /// Build a report from the current session state.
    pub fn build(
        session: &BehaviorSession,
        now: DateTime<Utc>,
        tracker: &TrackerConfig,
        thresholds: &ScoringThresholds,
    ) -> Self {
        let key_stats = IntervalStats::from_samples(&session.key_intervals().to_vec());
        let click_count = session.clicks().len();
        let click_stats = if click_count >= 2 {
            IntervalStats::from_samples(&session.click_intervals())
        } else {
            IntervalStats::default()
        };

        let input = ScoringInput {
            key_intervals: key_stats,
            click_intervals: click_stats,
            click_count,
            mouse_moves: session.mouse_moves(),
            scrolls: session.scrolls(),
            total_events: session.events().len(),
        };
        let verdict = assess(&input, thresholds);

        // Whole seconds elapsed
        let session_duration_secs = (now - session.started_at()).num_seconds().max(0) as f64;

        Self {
            session_id: session.session_id(),
            generated_at: now,
            key_interval_mean_ms: key_stats.mean,
            key_interval_std_dev_ms: key_stats.std_dev,
            mouse_activity_rate: session.mouse_moves() as f64 / session_duration_secs.max(1.0),
            click_pattern: ClickPattern {
                total: click_count,
                mean_interval_ms: click_stats.mean,
                std_dev_interval_ms: click_stats.std_dev,
            },
            recent_gaps_ms: session.recent_gaps(tracker.recent_gaps),
            recent_sequence: session.recent_sequence(tracker.recent_sequence),
            total_events: input.total_events,
            session_duration_secs,
            pages_visited: session.pages_visited(),
            key_frequency: session.key_frequency().clone(),
            mouse_moves: session.mouse_moves(),
            scrolls: session.scrolls(),
            regularity_excessive: verdict.regularity_excessive,
            actions_too_fast: verdict.actions_too_fast,
            human_pattern: verdict.human_pattern,
            bot_score: verdict.bot_score,
            normalcy_score: verdict.normalcy_score,
        }
    }
}
