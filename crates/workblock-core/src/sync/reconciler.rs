//! Detects tasks that already live on the calendar.

use chrono::{DateTime, Utc};

use super::types::{ReconcileDecision, SkipReason};
use crate::calendar::CalendarStore;
use crate::error::SyncError;
use crate::task::Task;

/// Matches tasks to calendar entries through their embedded marker.
pub struct SyncReconciler<'a> {
    store: &'a dyn CalendarStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl<'a> SyncReconciler<'a> {
    /// Look for markers in `[start, end)`.
    pub fn new(store: &'a dyn CalendarStore, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { store, start, end }
    }

    /// Decide whether `task` still needs scheduling.
    ///
    /// An entry carrying the task id means the task is already placed; its
    /// title is rewritten when it no longer matches the task content. A
    /// failed rewrite is logged and the task is still skipped.
    pub fn reconcile(&self, task: &Task) -> Result<ReconcileDecision, SyncError> {
        let existing = self
            .store
            .query_events(self.start, self.end, Some(&task.id))?
            .into_iter()
            .find(|e| e.is_marked_with(&task.id));

        let Some(entry) = existing else {
            if task.due.is_none() {
                tracing::warn!(task = %task.content, "no deadline, skipping");
                return Ok(ReconcileDecision::Skip(SkipReason::MissingDeadline));
            }
            return Ok(ReconcileDecision::Proceed);
        };

        let expected = task.calendar_title();
        let mut title_updated = false;
        if entry.title != expected {
            match self.store.update_event_title(&entry.id, &expected) {
                Ok(()) => {
                    tracing::info!(from = %entry.title, to = %expected, "updated entry title");
                    title_updated = true;
                }
                Err(err) => {
                    tracing::warn!(entry = %entry.id, error = %err, "failed to update entry title");
                }
            }
        } else {
            tracing::debug!(task = %task.content, "already scheduled");
        }

        Ok(ReconcileDecision::Skip(SkipReason::AlreadyScheduled {
            entry_id: entry.id,
            title_updated,
        }))
    }
}
