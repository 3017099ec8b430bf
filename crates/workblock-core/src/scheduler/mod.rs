//! Slot-allocation engine.
//!
//! This module places tasks into work windows:
//! - Collects live work windows from the calendar ([`window`])
//! - Discretizes them into candidate start slots ([`slots`])
//! - Filters candidates against existing commitments ([`conflict`])
//! - Scores each valid (task, slot) pair ([`scoring`])
//! - Greedily commits the best slot per task, earliest deadline first

pub mod conflict;
pub mod scoring;
pub mod slots;
pub mod window;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarStore, NewEntry};
use crate::error::SyncError;
use crate::task::{self, DurationResolver, DurationTier, Task};

pub use conflict::{continuous_space, ConflictOracle, LiveConflictOracle, SnapshotConflictOracle};
pub use scoring::{PlacementScorer, ScoringWeights};
pub use slots::{CandidateSlot, SlotPool};
pub use window::{WindowCollector, WorkWindow};

/// How the best slot for a task is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Highest score wins.
    #[default]
    Scored,
    /// First valid slot in pool order wins; no deadline spreading and no
    /// fragmentation awareness.
    FirstFit,
}

/// Where conflict answers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Load blocking entries once per run.
    #[default]
    Snapshot,
    /// Query the calendar store for every check.
    Live,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Candidate slot spacing (minutes)
    pub granularity_minutes: i64,
    /// How far ahead windows and existing entries are considered (days)
    pub lookahead_days: i64,
    /// Title that marks a calendar entry as a work window
    pub work_block_title: String,
    pub policy: PlacementPolicy,
    pub conflict_mode: ConflictMode,
    pub tiers: Vec<DurationTier>,
    pub weights: ScoringWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            granularity_minutes: 15,
            lookahead_days: 14,
            work_block_title: "Work Block".to_string(),
            policy: PlacementPolicy::default(),
            conflict_mode: ConflictMode::default(),
            tiers: task::duration::default_tiers(),
            weights: ScoringWeights::default(),
        }
    }
}

/// Longest lookahead a config may ask for.
pub const MAX_LOOKAHEAD_DAYS: i64 = 366;

impl SchedulerConfig {
    /// Lookahead span, clamped to `0..=MAX_LOOKAHEAD_DAYS` days.
    pub fn lookahead(&self) -> Duration {
        Duration::days(self.lookahead_days.clamp(0, MAX_LOOKAHEAD_DAYS))
    }
}

/// Round `now` up to the next multiple of `granularity_minutes` since the epoch.
pub fn round_up(now: DateTime<Utc>, granularity_minutes: i64) -> DateTime<Utc> {
    let step = granularity_minutes.max(1) * 60_000;
    let millis = now.timestamp_millis();
    let rounded = (millis + step - 1).div_euclid(step) * step;
    DateTime::from_timestamp_millis(rounded).unwrap_or(now)
}

/// A committed placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub entry_id: String,
    pub window_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `None` under the first-fit policy.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnschedulableReason {
    /// No slot has enough conflict-free room for the task.
    NoFreeSlot,
    /// Every slot with room starts after the deadline.
    PastDeadline,
}

/// What happened to one task during scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Scheduled(Placement),
    Unschedulable { reason: UnschedulableReason },
    MissingDeadline,
    WriteFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: String,
    pub content: String,
    pub duration_minutes: i64,
    pub due: Option<DateTime<Utc>>,
    pub result: TaskResult,
}

impl TaskReport {
    pub fn placement(&self) -> Option<&Placement> {
        match &self.result {
            TaskResult::Scheduled(p) => Some(p),
            _ => None,
        }
    }
}

/// Result of one scheduling pass.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// One report per input task, in processing (deadline) order.
    pub reports: Vec<TaskReport>,
    /// Slots nobody took.
    pub remaining: SlotPool,
}

/// Earliest-deadline-first greedy scheduler.
pub struct GreedyEdfScheduler {
    config: SchedulerConfig,
    resolver: DurationResolver,
    scorer: PlacementScorer,
}

impl GreedyEdfScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let resolver = DurationResolver::new(config.tiers.clone());
        let scorer = PlacementScorer::new(config.weights.clone());
        Self {
            config,
            resolver,
            scorer,
        }
    }

    /// Place `tasks` into `pool`, writing each placement to `store`.
    ///
    /// Tasks are processed in deadline order. The pool is consumed as
    /// placements are made and handed back in the outcome. Query failures
    /// abort the pass; a failed create is reported against its task and the
    /// pass moves on.
    pub fn schedule<O: ConflictOracle + ?Sized>(
        &self,
        tasks: &[Task],
        mut pool: SlotPool,
        oracle: &mut O,
        store: &dyn CalendarStore,
        rounded_now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, SyncError> {
        let mut ordered = tasks.to_vec();
        task::sort_by_deadline(&mut ordered);

        let mut reports = Vec::with_capacity(ordered.len());
        for task in &ordered {
            let duration = self.resolver.resolve(task);
            let result = match task.due {
                None => TaskResult::MissingDeadline,
                Some(due) => {
                    self.place(task, due, duration, &mut pool, oracle, store, rounded_now)?
                }
            };
            reports.push(TaskReport {
                task_id: task.id.clone(),
                content: task.content.clone(),
                duration_minutes: duration,
                due: task.due,
                result,
            });
        }

        Ok(ScheduleOutcome {
            reports,
            remaining: pool,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn place<O: ConflictOracle + ?Sized>(
        &self,
        task: &Task,
        due: DateTime<Utc>,
        duration: i64,
        pool: &mut SlotPool,
        oracle: &mut O,
        store: &dyn CalendarStore,
        rounded_now: DateTime<Utc>,
    ) -> Result<TaskResult, SyncError> {
        let length = Duration::minutes(duration);

        let mut valid = Vec::new();
        for slot in pool.iter() {
            if slot.fits(duration) && !oracle.has_conflict(slot.start, slot.start + length, &slot.window_id)? {
                valid.push(slot.clone());
            }
        }

        if valid.is_empty() {
            tracing::warn!(task = %task.content, duration, "no available slot");
            return Ok(TaskResult::Unschedulable {
                reason: UnschedulableReason::NoFreeSlot,
            });
        }

        valid.retain(|slot| slot.start <= due);
        if valid.is_empty() {
            tracing::warn!(task = %task.content, %due, "every free slot is past the deadline");
            return Ok(TaskResult::Unschedulable {
                reason: UnschedulableReason::PastDeadline,
            });
        }

        let (chosen, score) = match self.config.policy {
            PlacementPolicy::FirstFit => (valid.swap_remove(0), None),
            PlacementPolicy::Scored => {
                let (slot, score) = self.best_slot(valid, oracle, due, duration, rounded_now)?;
                (slot, Some(score))
            }
        };

        let end = chosen.start + length;
        let draft = NewEntry {
            title: task.calendar_title(),
            start: chosen.start,
            end,
            marker: task.id.clone(),
        };

        match store.create_event(&draft) {
            Ok(entry) => {
                oracle.record_commit(&entry);
                let freed = pool.consume(chosen.start, end);
                tracing::info!(
                    task = %task.content,
                    start = %chosen.start,
                    duration,
                    score = score.unwrap_or_default(),
                    slots_consumed = freed,
                    "scheduled"
                );
                Ok(TaskResult::Scheduled(Placement {
                    entry_id: entry.id,
                    window_id: chosen.window_id,
                    title: draft.title,
                    start: chosen.start,
                    end,
                    score,
                }))
            }
            Err(err) => {
                tracing::warn!(task = %task.content, error = %err, "failed to create calendar entry");
                Ok(TaskResult::WriteFailed {
                    error: err.to_string(),
                })
            }
        }
    }

    /// Highest-scoring slot; the earliest in pool order wins ties.
    fn best_slot<O: ConflictOracle + ?Sized>(
        &self,
        candidates: Vec<CandidateSlot>,
        oracle: &O,
        due: DateTime<Utc>,
        duration: i64,
        rounded_now: DateTime<Utc>,
    ) -> Result<(CandidateSlot, f64), SyncError> {
        let mut best: Option<(CandidateSlot, f64)> = None;
        for slot in candidates {
            let score = self.scorer.score(
                oracle,
                due,
                &slot,
                rounded_now,
                duration,
                self.config.granularity_minutes,
            )?;
            tracing::debug!(start = %slot.start, score, "candidate");
            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((slot, score));
            }
        }
        best.ok_or_else(|| SyncError::CalendarApi("no candidate to score".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    fn run(
        cal: &InMemoryCalendar,
        config: SchedulerConfig,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let rounded = round_up(now, config.granularity_minutes);
        let windows = WindowCollector::new(cal, &config.work_block_title)
            .collect(now, rounded, now + config.lookahead())
            .unwrap();
        let pool = SlotPool::generate(&windows, config.granularity_minutes);
        let mut oracle = LiveConflictOracle::new(cal);
        GreedyEdfScheduler::new(config)
            .schedule(tasks, pool, &mut oracle, cal, rounded)
            .unwrap()
    }

    #[test]
    fn round_up_aligns_to_granularity() {
        assert_eq!(round_up(at(19, 9, 0), 15), at(19, 9, 0));
        assert_eq!(round_up(at(19, 9, 1), 15), at(19, 9, 15));
        assert_eq!(round_up(at(19, 9, 52), 5), at(19, 9, 55));
        let just_after = at(19, 9, 0) + Duration::milliseconds(1);
        assert_eq!(round_up(just_after, 15), at(19, 9, 15));
    }

    #[test]
    fn lookahead_is_clamped() {
        let mut config = SchedulerConfig::default();
        assert_eq!(config.lookahead(), Duration::days(14));

        config.lookahead_days = 999_999_999_999;
        assert_eq!(config.lookahead(), Duration::days(MAX_LOOKAHEAD_DAYS));

        config.lookahead_days = -3;
        assert_eq!(config.lookahead(), Duration::zero());
    }

    #[test]
    fn task_without_deadline_is_reported_not_placed() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));
        let outcome = run(&cal, SchedulerConfig::default(), &[Task::new("1", "Loose")], at(19, 8, 0));
        assert_eq!(outcome.reports[0].result, TaskResult::MissingDeadline);
        assert!(cal.created().is_empty());
    }

    #[test]
    fn first_fit_takes_first_valid_slot() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));
        cal.add("Standup", at(19, 9, 0), at(19, 9, 30));
        let config = SchedulerConfig {
            policy: PlacementPolicy::FirstFit,
            ..SchedulerConfig::default()
        };
        let task = Task::new("1", "Email").with_due(at(25, 0, 0)).with_label("m");

        let outcome = run(&cal, config, &[task], at(19, 8, 0));

        let placement = outcome.reports[0].placement().unwrap();
        assert_eq!(placement.start, at(19, 9, 30));
        assert_eq!(placement.end, at(19, 10, 0));
        assert!(placement.score.is_none());
    }

    #[test]
    fn late_only_slots_are_never_chosen() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(21, 9, 0), at(21, 12, 0));
        let task = Task::new("1", "Overdue").with_due(at(20, 0, 0));

        let outcome = run(&cal, SchedulerConfig::default(), &[task], at(19, 8, 0));

        assert_eq!(
            outcome.reports[0].result,
            TaskResult::Unschedulable {
                reason: UnschedulableReason::PastDeadline
            }
        );
        assert!(cal.created().is_empty());
    }

    #[test]
    fn write_failure_is_reported_and_leaves_pool_untouched() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 10, 0));
        cal.reject_creates_titled("Task: Broken");
        let tasks = vec![
            Task::new("1", "Broken").with_due(at(20, 0, 0)).with_label("l"),
            Task::new("2", "Fine").with_due(at(21, 0, 0)).with_label("l"),
        ];

        let outcome = run(&cal, SchedulerConfig::default(), &tasks, at(19, 8, 0));

        assert!(matches!(outcome.reports[0].result, TaskResult::WriteFailed { .. }));
        let placement = outcome.reports[1].placement().unwrap();
        assert_eq!(placement.start, at(19, 9, 0));
        assert_eq!(cal.created().len(), 1);
    }

    #[test]
    fn commit_consumes_covered_slots_only() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 10, 0));
        let config = SchedulerConfig {
            policy: PlacementPolicy::FirstFit,
            ..SchedulerConfig::default()
        };
        let task = Task::new("1", "Half").with_due(at(25, 0, 0)).with_label("m");

        let outcome = run(&cal, config, &[task], at(19, 8, 0));

        let left: Vec<_> = outcome.remaining.iter().map(|s| s.start).collect();
        assert_eq!(left, vec![at(19, 9, 30), at(19, 9, 45)]);
    }
}
