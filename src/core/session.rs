//! Bounded per-session interaction state.
//!
//! Every handler here is constant time: ring pushes, counter bumps and a
//! map increment. High-frequency events are counted on every occurrence
//! but only sampled into the event log.

use crate::collector::types::{EventKind, InteractionEvent};
use crate::config::TrackerConfig;
use crate::core::ring::RingBuffer;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;
use uuid::Uuid;

/// Mutable state behind one tracker.
#[derive(Debug, Clone)]
pub struct BehaviorSession {
    /// Regenerated on every reset
    session_id: Uuid,
    /// Start of the session clock
    started_at: DateTime<Utc>,
    /// Bounded log of recorded and sampled events
    events: RingBuffer<InteractionEvent>,
    /// Milliseconds between consecutive KeyDowns
    key_intervals: RingBuffer<f64>,
    /// Timestamp of the previous KeyDown
    last_key_down: Option<DateTime<Utc>>,
    /// Timestamps of the newest clicks
    clicks: RingBuffer<DateTime<Utc>>,
    /// KeyDown count per key name
    key_frequency: BTreeMap<String, u64>,
    /// Distinct page URLs reported by the host
    pages: HashSet<String>,
    /// Every mouse move, sampled or not
    mouse_moves: u64,
    /// Every scroll, sampled or not
    scrolls: u64,
    /// Log one mouse move out of this many
    mouse_move_sample_every: u64,
    /// Log one scroll out of this many
    scroll_sample_every: u64,
}

impl BehaviorSession {
    /// Create an empty session sized by `config`.
    pub fn new(config: &TrackerConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at,
            events: RingBuffer::new(config.event_log_capacity),
            key_intervals: RingBuffer::new(config.key_interval_capacity),
            last_key_down: None,
            clicks: RingBuffer::new(config.click_capacity),
            key_frequency: BTreeMap::new(),
            pages: HashSet::new(),
            mouse_moves: 0,
            scrolls: 0,
            mouse_move_sample_every: config.mouse_move_sample_every.max(1),
            scroll_sample_every: config.scroll_sample_every.max(1),
        }
    }

    /// Fold one event into the session.
    pub fn record(&mut self, event: &InteractionEvent) {
        match event {
            InteractionEvent::KeyDown { timestamp, key } => {
                if let Some(previous) = self.last_key_down {
                    let gap = (*timestamp - previous).num_milliseconds() as f64;
                    self.key_intervals.push(gap);
                }
                self.last_key_down = Some(*timestamp);

                let key = if key.is_empty() { "unknown" } else { key.as_str() };
                match self.key_frequency.get_mut(key) {
                    Some(count) => *count += 1,
                    None => {
                        self.key_frequency.insert(key.to_string(), 1);
                    }
                }
                self.events.push(event.clone());
            }
            InteractionEvent::Click { timestamp, .. } => {
                self.clicks.push(*timestamp);
                self.events.push(event.clone());
            }
            InteractionEvent::MouseMove { .. } => {
                self.mouse_moves += 1;
                if self.mouse_moves % self.mouse_move_sample_every == 0 {
                    trace!(count = self.mouse_moves, "sampled mouse move");
                    self.events.push(event.clone());
                }
            }
            InteractionEvent::Scroll { .. } => {
                self.scrolls += 1;
                if self.scrolls % self.scroll_sample_every == 0 {
                    trace!(count = self.scrolls, "sampled scroll");
                    self.events.push(event.clone());
                }
            }
            InteractionEvent::KeyUp { .. }
            | InteractionEvent::Focus { .. }
            | InteractionEvent::Blur { .. }
            | InteractionEvent::Paste { .. }
            | InteractionEvent::Copy { .. } => {
                self.events.push(event.clone());
            }
        }
    }

    /// Add `url` to the distinct-page set.
    pub fn visit_page(&mut self, url: &str) {
        if !self.pages.contains(url) {
            self.pages.insert(url.to_string());
        }
    }

    /// Drop all collected data and restart the session clock.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.session_id = Uuid::new_v4();
        self.started_at = now;
        self.events.clear();
        self.key_intervals.clear();
        self.last_key_down = None;
        self.clicks.clear();
        self.key_frequency.clear();
        self.pages.clear();
        self.mouse_moves = 0;
        self.scrolls = 0;
    }

    /// Identifier of the current session.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// When the session clock started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The bounded event log.
    pub fn events(&self) -> &RingBuffer<InteractionEvent> {
        &self.events
    }

    /// Milliseconds between consecutive KeyDowns, newest last.
    pub fn key_intervals(&self) -> &RingBuffer<f64> {
        &self.key_intervals
    }

    /// Retained click timestamps.
    pub fn clicks(&self) -> &RingBuffer<DateTime<Utc>> {
        &self.clicks
    }

    /// Milliseconds between consecutive retained clicks.
    pub fn click_intervals(&self) -> Vec<f64> {
        let clicks = self.clicks.to_vec();
        clicks
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
            .collect()
    }

    /// KeyDown count per key name.
    pub fn key_frequency(&self) -> &BTreeMap<String, u64> {
        &self.key_frequency
    }

    /// Number of distinct pages visited.
    pub fn pages_visited(&self) -> usize {
        self.pages.len()
    }

    /// Total mouse moves seen.
    pub fn mouse_moves(&self) -> u64 {
        self.mouse_moves
    }

    /// Total scrolls seen.
    pub fn scrolls(&self) -> u64 {
        self.scrolls
    }

    /// Positive gaps (ms) between the newest `n + 1` logged events.
    pub fn recent_gaps(&self, n: usize) -> Vec<f64> {
        let timestamps: Vec<DateTime<Utc>> = self
            .events
            .newest(n.saturating_add(1))
            .map(InteractionEvent::timestamp)
            .collect();
        timestamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
            .filter(|gap| *gap > 0.0)
            .collect()
    }

    /// Type tags of the newest `n` logged events, oldest first.
    pub fn recent_sequence(&self, n: usize) -> Vec<EventKind> {
        self.events.newest(n).map(InteractionEvent::kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> BehaviorSession {
        BehaviorSession::new(&TrackerConfig::default(), Utc::now())
    }

    #[test]
    fn test_first_key_has_no_interval() {
        let mut s = session();
        let t0 = Utc::now();
        s.record(&InteractionEvent::key_down(t0, "a"));
        assert!(s.key_intervals().is_empty());

        s.record(&InteractionEvent::key_down(t0 + Duration::milliseconds(120), "b"));
        assert_eq!(s.key_intervals().to_vec(), vec![120.0]);
        assert_eq!(s.key_frequency().get("a"), Some(&1));
        assert_eq!(s.events().len(), 2);
    }

    #[test]
    fn test_empty_key_name_counts_as_unknown() {
        let mut s = session();
        s.record(&InteractionEvent::key_down(Utc::now(), ""));
        assert_eq!(s.key_frequency().get("unknown"), Some(&1));
    }

    #[test]
    fn test_mouse_move_sampling() {
        let mut s = session();
        let t0 = Utc::now();
        for i in 0..250 {
            s.record(&InteractionEvent::mouse_move(
                t0 + Duration::milliseconds(i),
                i as f64,
                0.0,
            ));
        }
        assert_eq!(s.mouse_moves(), 250);
        assert_eq!(s.events().len(), 2);
        let logged: Vec<_> = s.events().iter().map(|e| e.timestamp()).collect();
        assert_eq!(
            logged,
            vec![t0 + Duration::milliseconds(99), t0 + Duration::milliseconds(199)]
        );
    }

    #[test]
    fn test_scroll_sampling() {
        let mut s = session();
        for _ in 0..25 {
            s.record(&InteractionEvent::scroll(Utc::now(), 100.0));
        }
        assert_eq!(s.scrolls(), 25);
        assert_eq!(s.events().len(), 2);
    }

    #[test]
    fn test_low_frequency_events_always_logged() {
        let mut s = session();
        let now = Utc::now();
        s.record(&InteractionEvent::Focus { timestamp: now });
        s.record(&InteractionEvent::Blur { timestamp: now });
        s.record(&InteractionEvent::Paste { timestamp: now });
        s.record(&InteractionEvent::Copy { timestamp: now });
        assert_eq!(
            s.recent_sequence(10),
            vec![EventKind::Focus, EventKind::Blur, EventKind::Paste, EventKind::Copy]
        );
    }

    #[test]
    fn test_interval_lists_are_bounded() {
        let config = TrackerConfig {
            key_interval_capacity: 16,
            click_capacity: 8,
            ..TrackerConfig::default()
        };
        let mut s = BehaviorSession::new(&config, Utc::now());
        let t0 = Utc::now();
        for i in 0..500 {
            let t = t0 + Duration::milliseconds(i * 10);
            s.record(&InteractionEvent::key_down(t, "k"));
            s.record(&InteractionEvent::click(t, 0.0, 0.0));
        }
        assert_eq!(s.key_intervals().len(), 16);
        assert_eq!(s.clicks().len(), 8);
        assert_eq!(s.click_intervals().len(), 7);
    }

    #[test]
    fn test_pages_are_deduplicated() {
        let mut s = session();
        s.visit_page("/login");
        s.visit_page("/login");
        s.visit_page("/home");
        assert_eq!(s.pages_visited(), 2);
    }

    #[test]
    fn test_recent_gaps_skip_zero() {
        let mut s = session();
        let t0 = Utc::now();
        s.record(&InteractionEvent::Focus { timestamp: t0 });
        s.record(&InteractionEvent::Blur { timestamp: t0 });
        s.record(&InteractionEvent::Copy {
            timestamp: t0 + Duration::milliseconds(40),
        });
        assert_eq!(s.recent_gaps(100), vec![40.0]);
    }

    #[test]
    fn test_reset() {
        let mut s = session();
        let old_id = s.session_id();
        s.record(&InteractionEvent::key_down(Utc::now(), "a"));
        s.record(&InteractionEvent::mouse_move(Utc::now(), 0.0, 0.0));
        s.visit_page("/x");

        let later = Utc::now() + Duration::seconds(5);
        s.reset(later);
        assert_ne!(s.session_id(), old_id);
        assert_eq!(s.started_at(), later);
        assert!(s.events().is_empty());
        assert_eq!(s.mouse_moves(), 0);
        assert_eq!(s.pages_visited(), 0);

        // First key after reset starts a fresh interval chain
        s.record(&InteractionEvent::key_down(later, "a"));
        assert!(s.key_intervals().is_empty());
    }
}
