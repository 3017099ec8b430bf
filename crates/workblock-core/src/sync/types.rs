//! Result types of a sync pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{TaskReport, TaskResult, UnschedulableReason};

/// Why a task never reached the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A calendar entry already carries the task's marker.
    AlreadyScheduled {
        entry_id: String,
        /// The entry's title had drifted and was rewritten.
        title_updated: bool,
    },
    /// Not on the calendar and no deadline to schedule against.
    MissingDeadline,
}

/// Outcome of reconciling one task against the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileDecision {
    Skip(SkipReason),
    Proceed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub task_id: String,
    pub content: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What one sync pass did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub started_at: DateTime<Utc>,
    /// `started_at` rounded up to the scheduling granularity.
    pub rounded_now: DateTime<Utc>,
    pub windows_found: usize,
    pub tasks_found: usize,
    pub skipped: Vec<SkippedTask>,
    /// One report per task handed to the scheduler, in deadline order.
    pub reports: Vec<TaskReport>,
}

impl SyncSummary {
    pub(crate) fn empty(started_at: DateTime<Utc>, rounded_now: DateTime<Utc>) -> Self {
        Self {
            started_at,
            rounded_now,
            windows_found: 0,
            tasks_found: 0,
            skipped: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn scheduled(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| r.placement().is_some())
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled().count()
    }

    pub fn unschedulable(&self) -> impl Iterator<Item = (&TaskReport, UnschedulableReason)> {
        self.reports.iter().filter_map(|r| match r.result {
            TaskResult::Unschedulable { reason } => Some((r, reason)),
            _ => None,
        })
    }

    pub fn write_failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.result, TaskResult::WriteFailed { .. }))
    }

    pub fn titles_updated(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| {
                matches!(
                    s.reason,
                    SkipReason::AlreadyScheduled {
                        title_updated: true,
                        ..
                    }
                )
            })
            .count()
    }
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub deleted: usize,
    pub failed: usize,
    /// Entries examined in the cleanup range.
    pub checked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_serializes_flat() {
        let skipped = SkippedTask {
            task_id: "42".into(),
            content: "Write report".into(),
            reason: SkipReason::AlreadyScheduled {
                entry_id: "evt".into(),
                title_updated: true,
            },
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"], "already_scheduled");
        assert_eq!(json["entry_id"], "evt");
        assert_eq!(json["task_id"], "42");
    }

    #[test]
    fn counts_title_updates() {
        let now = Utc::now();
        let mut summary = SyncSummary::empty(now, now);
        summary.skipped.push(SkippedTask {
            task_id: "1".into(),
            content: "a".into(),
            reason: SkipReason::MissingDeadline,
        });
        summary.skipped.push(SkippedTask {
            task_id: "2".into(),
            content: "b".into(),
            reason: SkipReason::AlreadyScheduled {
                entry_id: "e".into(),
                title_updated: true,
            },
        });
        assert_eq!(summary.titles_updated(), 1);
        assert_eq!(summary.scheduled_count(), 0);
    }
}
