//! One-shot sync pass: tasks in, calendar placements out.

use chrono::{DateTime, Utc};

use super::reconciler::SyncReconciler;
use super::types::{ReconcileDecision, SkippedTask, SyncSummary};
use crate::calendar::CalendarStore;
use crate::error::SyncError;
use crate::scheduler::{
    round_up, ConflictMode, GreedyEdfScheduler, LiveConflictOracle, ScheduleOutcome,
    SchedulerConfig, SlotPool, SnapshotConflictOracle, WindowCollector,
};
use crate::task::{Task, TaskSource};

/// Drives a sync pass against a calendar store and a task source.
///
/// The engine keeps no state between passes; everything is re-read from the
/// two collaborators, so running a pass twice in a row is a no-op the second
/// time.
pub struct SyncEngine<S, T> {
    store: S,
    source: T,
    config: SchedulerConfig,
}

impl<S: CalendarStore, T: TaskSource> SyncEngine<S, T> {
    pub fn new(store: S, source: T, config: SchedulerConfig) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a pass anchored at the current instant.
    pub fn run_pass(&self) -> Result<SyncSummary, SyncError> {
        self.run_pass_at(Utc::now())
    }

    /// Run a pass anchored at `now`.
    ///
    /// Query failures abort the pass. Entries created before the failure
    /// stay on the calendar; the next pass reconciles them.
    pub fn run_pass_at(&self, now: DateTime<Utc>) -> Result<SyncSummary, SyncError> {
        let rounded_now = round_up(now, self.config.granularity_minutes);
        let lookahead_end = now + self.config.lookahead();
        let mut summary = SyncSummary::empty(now, rounded_now);

        let windows = WindowCollector::new(&self.store, &self.config.work_block_title)
            .collect(now, rounded_now, lookahead_end)?;
        summary.windows_found = windows.len();
        if windows.is_empty() {
            tracing::warn!(
                title = %self.config.work_block_title,
                "no work windows found in lookahead range"
            );
            return Ok(summary);
        }
        tracing::info!(windows = windows.len(), "found work windows");

        let tasks = self.source.list_active_tasks()?;
        summary.tasks_found = tasks.len();
        tracing::info!(tasks = tasks.len(), "fetched active tasks");

        let reconciler = SyncReconciler::new(&self.store, now, lookahead_end);
        let mut pending: Vec<Task> = Vec::new();
        for task in tasks {
            match reconciler.reconcile(&task)? {
                ReconcileDecision::Proceed => pending.push(task),
                ReconcileDecision::Skip(reason) => summary.skipped.push(SkippedTask {
                    task_id: task.id,
                    content: task.content,
                    reason,
                }),
            }
        }

        let pool = SlotPool::generate(&windows, self.config.granularity_minutes);
        tracing::debug!(slots = pool.len(), pending = pending.len(), "scheduling");

        // The snapshot has to cover windows ending after the lookahead too.
        let horizon_end = windows
            .iter()
            .map(|w| w.end)
            .max()
            .map_or(lookahead_end, |end| end.max(lookahead_end));

        let scheduler = GreedyEdfScheduler::new(self.config.clone());
        let ScheduleOutcome { reports, .. } = match self.config.conflict_mode {
            ConflictMode::Snapshot => {
                let mut oracle = SnapshotConflictOracle::load(&self.store, rounded_now, horizon_end)?;
                tracing::debug!(busy = oracle.len(), "loaded conflict snapshot");
                scheduler.schedule(&pending, pool, &mut oracle, &self.store, rounded_now)?
            }
            ConflictMode::Live => {
                let mut oracle = LiveConflictOracle::new(&self.store);
                scheduler.schedule(&pending, pool, &mut oracle, &self.store, rounded_now)?
            }
        };
        summary.reports = reports;

        tracing::info!(
            scheduled = summary.scheduled_count(),
            skipped = summary.skipped.len(),
            unschedulable = summary.unschedulable().count(),
            failed = summary.write_failures().count(),
            "sync pass complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::scheduler::TaskResult;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    struct FailingSource;

    impl TaskSource for FailingSource {
        fn list_active_tasks(&self) -> Result<Vec<Task>, SyncError> {
            Err(SyncError::TaskSource("503 Service Unavailable".into()))
        }
    }

    #[test]
    fn no_windows_ends_pass_early() {
        let cal = InMemoryCalendar::new();
        let engine = SyncEngine::new(&cal, FailingSource, SchedulerConfig::default());

        // The task source is never consulted.
        let summary = engine.run_pass_at(at(19, 8, 0)).unwrap();
        assert_eq!(summary.windows_found, 0);
        assert!(summary.reports.is_empty());
    }

    #[test]
    fn task_source_failure_is_fatal() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));
        let engine = SyncEngine::new(&cal, FailingSource, SchedulerConfig::default());

        let err = engine.run_pass_at(at(19, 8, 0)).unwrap_err();
        assert!(matches!(err, SyncError::TaskSource(_)));
        assert!(cal.writes().is_empty());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));
        let tasks = vec![Task::new("1", "Draft").with_due(at(22, 0, 0)).with_label("m")];
        let engine = SyncEngine::new(&cal, tasks, SchedulerConfig::default());

        let first = engine.run_pass_at(at(19, 8, 0)).unwrap();
        assert_eq!(first.scheduled_count(), 1);
        cal.clear_writes();

        let second = engine.run_pass_at(at(19, 8, 0)).unwrap();
        assert_eq!(second.scheduled_count(), 0);
        assert_eq!(second.skipped.len(), 1);
        assert!(cal.writes().is_empty());
    }

    #[test]
    fn live_mode_places_like_snapshot_mode() {
        let tasks = vec![
            Task::new("a", "A").with_due(at(21, 0, 0)).with_label("m"),
            Task::new("b", "B").with_due(at(23, 0, 0)).with_label("l"),
        ];
        let mut starts = Vec::new();
        for mode in [ConflictMode::Snapshot, ConflictMode::Live] {
            let cal = InMemoryCalendar::new();
            cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));
            cal.add("Standup", at(19, 10, 0), at(19, 10, 15));
            let config = SchedulerConfig {
                conflict_mode: mode,
                ..SchedulerConfig::default()
            };
            let summary = SyncEngine::new(&cal, tasks.clone(), config)
                .run_pass_at(at(19, 8, 0))
                .unwrap();
            let placed: Vec<_> = summary
                .reports
                .iter()
                .map(|r| match &r.result {
                    TaskResult::Scheduled(p) => Some(p.start),
                    _ => None,
                })
                .collect();
            starts.push(placed);
        }
        assert_eq!(starts[0], starts[1]);
    }
}
