//! Removal of entries created by earlier sync passes.

use chrono::{DateTime, Utc};

use super::types::CleanupSummary;
use crate::calendar::CalendarStore;
use crate::error::SyncError;

/// Delete every entry in `[start, end)` that carries a task marker.
///
/// Only the initial query can fail the call. Individual deletes that fail
/// are logged and counted.
pub fn cleanup_synced_entries(
    store: &dyn CalendarStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<CleanupSummary, SyncError> {
    let entries = store.query_events(start, end, None)?;
    let mut summary = CleanupSummary {
        checked: entries.len(),
        ..CleanupSummary::default()
    };

    for entry in entries.iter().filter(|e| e.marker.is_some()) {
        match store.delete_event(&entry.id) {
            Ok(()) => {
                tracing::info!(title = %entry.title, start = %entry.start, "deleted synced entry");
                summary.deleted += 1;
            }
            Err(err) => {
                tracing::warn!(title = %entry.title, error = %err, "failed to delete synced entry");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        deleted = summary.deleted,
        failed = summary.failed,
        checked = summary.checked,
        "cleanup complete"
    );
    Ok(summary)
}
