//! Behavior tracker driven end to end through an in-process event bus.

use antifraud_sensor::core::{
    assess, BehaviorTracker, IntervalStats, ManualClock, ScoringInput, TrackerState,
};
use antifraud_sensor::{
    create_tracker, Config, EventKind, InteractionEvent, LocalEventBus, ScoringThresholds,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn setup() -> (Rc<LocalEventBus>, Rc<ManualClock>, BehaviorTracker) {
    let bus = Rc::new(LocalEventBus::new());
    let clock = Rc::new(ManualClock::new(t0()));
    let tracker = BehaviorTracker::with_clock(bus.clone(), &Config::default(), clock.clone());
    (bus, clock, tracker)
}

#[test]
fn test_machine_typing_is_flagged() {
    let (bus, clock, tracker) = setup();
    for i in 0..20 {
        bus.dispatch(&InteractionEvent::key_down(
            t0() + Duration::milliseconds(i * 5),
            "x",
        ));
    }
    clock.advance(Duration::milliseconds(100));

    let report = tracker.snapshot();
    assert!(report.regularity_excessive);
    assert!(report.actions_too_fast);
    assert!(report.bot_score >= 0.6);
    assert!(!report.human_pattern);
    assert_eq!(report.key_interval_mean_ms, 5.0);
    assert_eq!(report.key_interval_std_dev_ms, 0.0);
}

#[test]
fn test_human_typing_is_accepted() {
    let (bus, clock, tracker) = setup();
    let mut at = t0();
    bus.dispatch(&InteractionEvent::key_down(at, "h"));
    for i in 0..20 {
        // Alternating 120/240 ms: mean 180, standard deviation 60
        at += Duration::milliseconds(if i % 2 == 0 { 120 } else { 240 });
        bus.dispatch(&InteractionEvent::key_down(at, "e"));
    }
    bus.dispatch(&InteractionEvent::mouse_move(at, 10.0, 20.0));
    bus.dispatch(&InteractionEvent::scroll(at, 300.0));
    clock.set(at);

    let report = tracker.snapshot();
    assert!((report.key_interval_mean_ms - 180.0).abs() < 1e-9);
    assert!((report.key_interval_std_dev_ms - 60.0).abs() < 1e-9);
    assert!(!report.regularity_excessive);
    assert!(!report.actions_too_fast);
    assert!(report.human_pattern);
    assert_eq!(report.bot_score, 0.0);
    assert_eq!(report.normalcy_score, 1.0);
}

#[test]
fn test_event_log_is_bounded() {
    let (bus, _clock, tracker) = setup();
    for i in 0..100_000 {
        bus.dispatch(&InteractionEvent::key_down(
            t0() + Duration::milliseconds(i),
            "k",
        ));
    }

    let report = tracker.snapshot();
    assert_eq!(report.total_events, 1000);
    assert_eq!(report.key_frequency.get("k"), Some(&100_000));
    assert_eq!(report.recent_sequence.len(), 50);
    assert_eq!(report.recent_gaps_ms.len(), 100);
}

#[test]
fn test_mouse_moves_are_sampled() {
    let (bus, _clock, tracker) = setup();
    for i in 0..250 {
        bus.dispatch(&InteractionEvent::mouse_move(
            t0() + Duration::milliseconds(i * 16),
            i as f64,
            i as f64,
        ));
    }

    let report = tracker.snapshot();
    assert_eq!(report.mouse_moves, 250);
    assert_eq!(report.total_events, 2);
    assert_eq!(
        report.recent_sequence,
        vec![EventKind::MouseMove, EventKind::MouseMove]
    );
    // 100th and 200th moves, 1600 ms apart
    assert_eq!(report.recent_gaps_ms, vec![1600.0]);
}

#[test]
fn test_stop_twice_then_silence() {
    let (bus, _clock, tracker) = setup();
    bus.dispatch(&InteractionEvent::click(t0(), 1.0, 1.0));

    tracker.stop();
    tracker.stop();
    assert_eq!(tracker.state(), TrackerState::Stopped);

    for _ in 0..10 {
        bus.dispatch(&InteractionEvent::click(t0(), 1.0, 1.0));
    }
    let report = tracker.snapshot();
    assert_eq!(report.click_pattern.total, 1);
    assert_eq!(report.total_events, 1);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_clicks_feed_click_pattern() {
    let (bus, _clock, tracker) = setup();
    for i in 0..8 {
        bus.dispatch(&InteractionEvent::click(
            t0() + Duration::milliseconds(i * 300),
            5.0,
            5.0,
        ));
    }

    let report = tracker.snapshot();
    assert_eq!(report.click_pattern.total, 8);
    assert_eq!(report.click_pattern.mean_interval_ms, 300.0);
    assert_eq!(report.click_pattern.std_dev_interval_ms, 0.0);
    // More than five perfectly even clicks
    assert!((report.bot_score - 0.2).abs() < 1e-9);
}

#[test]
fn test_pages_and_clear() {
    let bus = Rc::new(LocalEventBus::new());
    let tracker = create_tracker(bus.clone());
    tracker.on_page_visited("/login");
    tracker.on_page_visited("/login");
    tracker.on_page_visited("/account");
    bus.dispatch(&InteractionEvent::Paste { timestamp: t0() });
    assert_eq!(tracker.snapshot().pages_visited, 2);

    tracker.clear();
    let report = tracker.snapshot();
    assert_eq!(report.pages_visited, 0);
    assert_eq!(report.total_events, 0);
    assert_eq!(tracker.state(), TrackerState::Monitoring);
}

#[test]
fn test_report_json_shape() {
    let (bus, clock, tracker) = setup();
    bus.dispatch(&InteractionEvent::Focus { timestamp: t0() });
    clock.advance(Duration::seconds(30));

    let json = serde_json::to_value(tracker.snapshot()).unwrap();
    for field in [
        "session_id",
        "key_interval_mean_ms",
        "key_interval_std_dev_ms",
        "mouse_activity_rate",
        "click_pattern",
        "recent_gaps_ms",
        "recent_sequence",
        "total_events",
        "session_duration_secs",
        "pages_visited",
        "key_frequency",
        "mouse_moves",
        "scrolls",
        "regularity_excessive",
        "actions_too_fast",
        "human_pattern",
        "bot_score",
        "normalcy_score",
    ] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert_eq!(json["session_duration_secs"], 30.0);
    assert_eq!(json["recent_sequence"][0], "focus");
}

#[test]
fn test_scores_stay_in_unit_range() {
    let thresholds = ScoringThresholds::default();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..10_000 {
        let stats = |rng: &mut StdRng| IntervalStats {
            count: rng.gen_range(0..2000),
            mean: rng.gen_range(0.0..5000.0),
            std_dev: if rng.gen_bool(0.1) {
                0.0
            } else {
                rng.gen_range(0.0..2000.0)
            },
        };
        let input = ScoringInput {
            key_intervals: stats(&mut rng),
            click_intervals: stats(&mut rng),
            click_count: rng.gen_range(0..1000),
            mouse_moves: rng.gen_range(0..3),
            scrolls: rng.gen_range(0..3),
            total_events: rng.gen_range(0..1001),
        };
        let verdict = assess(&input, &thresholds);
        assert!((0.0..=1.0).contains(&verdict.bot_score));
        assert!((0.0..=1.0).contains(&verdict.normalcy_score));
    }
}
