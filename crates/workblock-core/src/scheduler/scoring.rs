//! Placement scoring.
//!
//! Higher is better. Scores are only ever compared between candidates of the
//! same task, so no normalization across tasks is attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conflict::{continuous_space, ConflictOracle};
use super::slots::CandidateSlot;
use crate::error::SyncError;

const MINUTES_PER_DAY: f64 = 1440.0;

/// Every constant the scorer uses. Defaults reproduce the tuned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Score for a slot starting after the deadline.
    pub late_score: f64,
    /// Score for a slot ending up less than `tight_deadline_days` before the deadline.
    pub tight_deadline_score: f64,
    pub tight_deadline_days: f64,

    pub base_score: f64,
    /// Deadlines further away than this use the far bucket.
    pub far_deadline_days: f64,
    /// Deadlines further away than this (but not far) use the medium bucket.
    pub medium_deadline_days: f64,
    /// Per-day earliness decay of each bucket.
    pub far_decay: f64,
    pub medium_decay: f64,
    pub near_decay: f64,

    /// Far bucket: penalty per unit of distance from the target position.
    pub spread_penalty: f64,
    /// Days that map to position 1.0.
    pub spread_horizon_days: f64,
    /// Slack days that map to target position 1.0.
    pub spread_slack_days: f64,
    pub spread_target_cap: f64,

    pub buffer_days: f64,
    pub buffer_bonus: f64,

    /// Tasks at least this long get the fit bonuses.
    pub long_task_minutes: f64,
    pub fit_band_low: f64,
    pub fit_band_high: f64,
    pub fit_bonus: f64,
    pub fit_bonus_per_hour: f64,
    pub spare_room_ratio: f64,
    pub spare_room_bonus: f64,
    pub spare_room_bonus_per_hour: f64,

    /// Short tasks are discouraged from spans longer than this.
    pub large_span_minutes: f64,
    pub large_span_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            late_score: -1000.0,
            tight_deadline_score: -500.0,
            tight_deadline_days: 0.5,
            base_score: 100.0,
            far_deadline_days: 7.0,
            medium_deadline_days: 3.0,
            far_decay: 5.0,
            medium_decay: 7.0,
            near_decay: 15.0,
            spread_penalty: 30.0,
            spread_horizon_days: 7.0,
            spread_slack_days: 14.0,
            spread_target_cap: 0.7,
            buffer_days: 1.0,
            buffer_bonus: 20.0,
            long_task_minutes: 60.0,
            fit_band_low: 0.3,
            fit_band_high: 0.8,
            fit_bonus: 30.0,
            fit_bonus_per_hour: 10.0,
            spare_room_ratio: 1.5,
            spare_room_bonus: 20.0,
            spare_room_bonus_per_hour: 5.0,
            large_span_minutes: 120.0,
            large_span_penalty: 10.0,
        }
    }
}

/// Scores (task, slot) pairs.
#[derive(Debug, Clone, Default)]
pub struct PlacementScorer {
    weights: ScoringWeights,
}

impl PlacementScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score `slot` for a task due at `due`, measuring the continuous space
    /// behind the slot through `oracle`.
    pub fn score<O: ConflictOracle + ?Sized>(
        &self,
        oracle: &O,
        due: DateTime<Utc>,
        slot: &CandidateSlot,
        rounded_now: DateTime<Utc>,
        duration_minutes: i64,
        granularity_minutes: i64,
    ) -> Result<f64, SyncError> {
        let remaining = continuous_space(oracle, slot, granularity_minutes)?;
        Ok(self.score_with_space(due, slot.start, rounded_now, duration_minutes, remaining))
    }

    /// The scoring formula proper, given the continuous space in minutes.
    pub fn score_with_space(
        &self,
        due: DateTime<Utc>,
        start: DateTime<Utc>,
        rounded_now: DateTime<Utc>,
        duration_minutes: i64,
        remaining_minutes: f64,
    ) -> f64 {
        let w = &self.weights;
        let days_until_deadline = days_between(start, due);
        let days_from_now = days_between(rounded_now, start);

        if start > due {
            return w.late_score;
        }
        if days_until_deadline < w.tight_deadline_days {
            return w.tight_deadline_score;
        }

        let mut score = if days_until_deadline > w.far_deadline_days {
            // Far deadlines drift toward a position proportional to their slack
            // instead of taking the first opening.
            let position = days_from_now / w.spread_horizon_days;
            let target = (days_until_deadline / w.spread_slack_days).min(w.spread_target_cap);
            w.base_score - w.far_decay * days_from_now - w.spread_penalty * (position - target).abs()
        } else if days_until_deadline > w.medium_deadline_days {
            w.base_score - w.medium_decay * days_from_now
        } else {
            w.base_score - w.near_decay * days_from_now
        };

        if days_until_deadline > w.buffer_days {
            score += w.buffer_bonus;
        }

        let duration = duration_minutes as f64;
        let hours = duration / 60.0;
        if duration >= w.long_task_minutes {
            let utilization = duration / remaining_minutes;
            if utilization > w.fit_band_low && utilization < w.fit_band_high {
                score += w.fit_bonus + w.fit_bonus_per_hour * hours;
            } else if remaining_minutes >= w.spare_room_ratio * duration {
                score += w.spare_room_bonus + w.spare_room_bonus_per_hour * hours;
            }
        } else if remaining_minutes > w.large_span_minutes {
            score -= w.large_span_penalty;
        }

        score
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 60.0 / MINUTES_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn slot_after_deadline_gets_late_score() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(1);
        let score = scorer.score_with_space(due, due + Duration::minutes(15), now(), 30, 60.0);
        approx(score, -1000.0);
    }

    #[test]
    fn slot_within_half_a_day_of_deadline_gets_tight_score() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::hours(10);
        approx(scorer.score_with_space(due, now(), now(), 30, 60.0), -500.0);
        // Exactly at the deadline is still tight, not late.
        approx(scorer.score_with_space(due, due, now(), 30, 60.0), -500.0);
    }

    #[test]
    fn near_bucket_decays_fastest() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(2);
        let start = now() + Duration::hours(12);
        // 100 - 15 * 0.5 + 20 (buffer, 1.5 days left)
        approx(scorer.score_with_space(due, start, now(), 30, 60.0), 112.5);
    }

    #[test]
    fn medium_bucket() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(6);
        let start = now() + Duration::days(1);
        // 100 - 7 * 1 + 20
        approx(scorer.score_with_space(due, start, now(), 30, 60.0), 113.0);
    }

    #[test]
    fn far_bucket_applies_spread_penalty() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(15);
        let start = now() + Duration::days(1);
        // d = 14 -> target = min(1.0, 0.7) = 0.7; position = 1/7
        let expected = 100.0 - 5.0 - 30.0 * (1.0 / 7.0 - 0.7_f64).abs() + 20.0;
        approx(scorer.score_with_space(due, start, now(), 30, 60.0), expected);
    }

    #[test]
    fn buffer_bonus_needs_more_than_a_day() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::hours(20);
        // d = 20/24 < 1: no bonus; 100 - 0
        approx(scorer.score_with_space(due, now(), now(), 30, 60.0), 100.0);
    }

    #[test]
    fn long_task_good_fit_bonus() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(2);
        // utilization 60 / 120 = 0.5 -> 30 + 10 * 1
        approx(scorer.score_with_space(due, now(), now(), 60, 120.0), 100.0 + 20.0 + 40.0);
    }

    #[test]
    fn long_task_spare_room_bonus_when_outside_band() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(2);
        // utilization 60 / 240 = 0.25 (below band), 240 >= 90 -> 20 + 5 * 1
        approx(scorer.score_with_space(due, now(), now(), 60, 240.0), 100.0 + 20.0 + 25.0);
    }

    #[test]
    fn long_task_tight_fit_gets_nothing() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(2);
        approx(scorer.score_with_space(due, now(), now(), 60, 60.0), 120.0);
        // zero space: utilization is infinite, no bonus
        approx(scorer.score_with_space(due, now(), now(), 60, 0.0), 120.0);
    }

    #[test]
    fn short_task_avoids_large_spans() {
        let scorer = PlacementScorer::default();
        let due = now() + Duration::days(2);
        approx(scorer.score_with_space(due, now(), now(), 30, 121.0), 110.0);
        approx(scorer.score_with_space(due, now(), now(), 30, 120.0), 120.0);
    }

    #[test]
    fn weights_are_configurable() {
        let scorer = PlacementScorer::new(ScoringWeights {
            buffer_bonus: 0.0,
            near_decay: 0.0,
            ..ScoringWeights::default()
        });
        let due = now() + Duration::days(2);
        approx(scorer.score_with_space(due, now() + Duration::days(1), now(), 30, 60.0), 100.0);
    }
}
