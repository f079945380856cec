//! Bot/human heuristics over tracker aggregates.
//!
//! Pure and total: any finite input, including empty samples, yields a
//! bot score and a normalcy score in `[0, 1]`.

use crate::config::ScoringThresholds;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Count, mean and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl IntervalStats {
    /// Statistics of `samples`; all zero when empty.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        Self {
            count: samples.len(),
            mean: samples.mean(),
            std_dev: samples.population_std_dev(),
        }
    }
}

/// Everything the engine looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringInput {
    pub key_intervals: IntervalStats,
    pub click_intervals: IntervalStats,
    /// Retained clicks (one more than the number of click intervals)
    pub click_count: usize,
    pub mouse_moves: u64,
    pub scrolls: u64,
    /// Retained event-log length
    pub total_events: usize,
}

/// Engine output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotAssessment {
    pub regularity_excessive: bool,
    pub actions_too_fast: bool,
    pub bot_score: f64,
    pub normalcy_score: f64,
    pub human_pattern: bool,
}

/// Score a session.
pub fn assess(input: &ScoringInput, t: &ScoringThresholds) -> BotAssessment {
    let keys = &input.key_intervals;

    let regularity_excessive =
        keys.count >= t.regularity_min_samples && keys.std_dev < t.regularity_max_std_dev_ms;
    let actions_too_fast = keys.count >= t.too_fast_min_samples && keys.mean < t.too_fast_max_mean_ms;

    let mut bot_score = 0.0;
    if regularity_excessive {
        bot_score += t.regularity_weight;
    }
    if actions_too_fast {
        bot_score += t.too_fast_weight;
    }
    if input.total_events > t.no_mouse_min_events && input.mouse_moves == 0 {
        bot_score += t.no_mouse_weight;
    }
    if input.click_count > t.click_min_count
        && input.click_intervals.std_dev < t.click_max_std_dev_ms
    {
        bot_score += t.click_weight;
    }
    let bot_score = clamp_unit(bot_score);

    let mut normalcy_score = 1.0;
    if keys.count >= t.variability_min_samples {
        if keys.std_dev == 0.0 {
            normalcy_score -= t.zero_variability_penalty;
        } else if keys.std_dev < t.low_variability_max_std_dev_ms {
            normalcy_score -= t.low_variability_penalty;
        }
    }
    if input.mouse_moves > 0 {
        normalcy_score += t.mouse_bonus;
    }
    if input.scrolls > 0 {
        normalcy_score += t.scroll_bonus;
    }
    let normalcy_score = clamp_unit(normalcy_score);

    BotAssessment {
        regularity_excessive,
        actions_too_fast,
        bot_score,
        normalcy_score,
        human_pattern: normalcy_score > t.human_min_normalcy && bot_score < t.human_max_bot_score,
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(count: usize, mean: f64, std_dev: f64) -> IntervalStats {
        IntervalStats {
            count,
            mean,
            std_dev,
        }
    }

    #[test]
    fn test_interval_stats() {
        let s = IntervalStats::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-9);
        assert!((s.std_dev - 2.0).abs() < 1e-9);

        assert_eq!(IntervalStats::from_samples(&[]), IntervalStats::default());
        assert_eq!(IntervalStats::from_samples(&[7.0]).std_dev, 0.0);
    }

    #[test]
    fn test_empty_input_is_degenerate_human() {
        let a = assess(&ScoringInput::default(), &ScoringThresholds::default());
        assert_eq!(a.bot_score, 0.0);
        assert_eq!(a.normalcy_score, 1.0);
        assert!(!a.regularity_excessive);
        assert!(!a.actions_too_fast);
        assert!(a.human_pattern);
    }

    #[test]
    fn test_machine_typing() {
        let input = ScoringInput {
            key_intervals: stats(19, 5.0, 0.0),
            ..Default::default()
        };
        let a = assess(&input, &ScoringThresholds::default());
        assert!(a.regularity_excessive);
        assert!(a.actions_too_fast);
        assert!((a.bot_score - 0.6).abs() < 1e-9);
        assert!((a.normalcy_score - 0.5).abs() < 1e-9);
        assert!(!a.human_pattern);
    }

    #[test]
    fn test_all_bot_signals_cap_at_one() {
        let input = ScoringInput {
            key_intervals: stats(30, 5.0, 1.0),
            click_intervals: stats(9, 100.0, 0.0),
            click_count: 10,
            mouse_moves: 0,
            scrolls: 0,
            total_events: 200,
        };
        let a = assess(&input, &ScoringThresholds::default());
        assert_eq!(a.bot_score, 1.0);
    }

    #[test]
    fn test_scores_are_independent() {
        // Regular fast typing plus mouse and scroll activity
        let input = ScoringInput {
            key_intervals: stats(20, 15.0, 25.0),
            mouse_moves: 10,
            scrolls: 3,
            ..Default::default()
        };
        let a = assess(&input, &ScoringThresholds::default());
        assert!(a.actions_too_fast);
        assert!((a.bot_score - 0.3).abs() < 1e-9);
        assert_eq!(a.normalcy_score, 1.0);
        assert!(a.human_pattern);
    }

    #[test]
    fn test_single_interval_has_zero_variability() {
        let t = ScoringThresholds::default();
        let keys_only = ScoringInput {
            key_intervals: stats(1, 150.0, 0.0),
            ..Default::default()
        };
        let a = assess(&keys_only, &t);
        assert!((a.normalcy_score - 0.5).abs() < 1e-9);
        assert!(!a.human_pattern);

        let with_mouse = ScoringInput {
            mouse_moves: 1,
            ..keys_only
        };
        let a = assess(&with_mouse, &t);
        assert!((a.normalcy_score - 0.7).abs() < 1e-9);
        assert!(a.human_pattern);
    }

    #[test]
    fn test_low_variability_penalty() {
        let input = ScoringInput {
            key_intervals: stats(20, 150.0, 15.0),
            ..Default::default()
        };
        let a = assess(&input, &ScoringThresholds::default());
        assert!((a.normalcy_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_scores_bounded_over_grid() {
        let t = ScoringThresholds::default();
        let values = [0.0, 0.5, 9.9, 10.0, 19.9, 50.0, 1e6];
        for &mean in &values {
            for &std_dev in &values {
                for &count in &[0usize, 1, 5, 10, 1000] {
                    for &moves in &[0u64, 1] {
                        let input = ScoringInput {
                            key_intervals: stats(count, mean, std_dev),
                            click_intervals: stats(count, mean, std_dev),
                            click_count: count,
                            mouse_moves: moves,
                            scrolls: moves,
                            total_events: count * 10,
                        };
                        let a = assess(&input, &t);
                        assert!((0.0..=1.0).contains(&a.bot_score));
                        assert!((0.0..=1.0).contains(&a.normalcy_score));
                    }
                }
            }
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let t = ScoringThresholds {
            too_fast_max_mean_ms: 200.0,
            ..ScoringThresholds::default()
        };
        let input = ScoringInput {
            key_intervals: stats(10, 150.0, 60.0),
            ..Default::default()
        };
        assert!(assess(&input, &t).actions_too_fast);
        assert!(!assess(&input, &ScoringThresholds::default()).actions_too_fast);
    }
}
