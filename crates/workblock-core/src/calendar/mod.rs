//! Calendar store abstraction.
//!
//! The engine never talks to a concrete calendar. Everything goes through
//! [`CalendarStore`], which the Google adapter, the in-memory store and the
//! dry-run wrapper implement.

pub mod dry_run;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub use dry_run::DryRunCalendar;
pub use memory::InMemoryCalendar;

/// The caller's relationship to a calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participation {
    /// The caller created / organizes the entry.
    Owner,
    Accepted,
    Tentative,
    Declined,
    /// Invited, no response yet.
    Invited,
}

impl Participation {
    /// Whether an entry with this status occupies the caller's time.
    pub fn blocks_time(&self) -> bool {
        matches!(self, Participation::Owner | Participation::Accepted)
    }
}

/// An entry read from the calendar store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub participation: Participation,
    /// Task id embedded by a previous sync, if any.
    pub marker: Option<String>,
}

impl CalendarEntry {
    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    pub fn is_marked_with(&self, task_id: &str) -> bool {
        self.marker.as_deref() == Some(task_id)
    }

    /// Case-insensitive free-text match on title and marker, like the
    /// calendar's own search.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self
                .marker
                .as_deref()
                .is_some_and(|m| m.to_lowercase().contains(&needle))
    }
}

/// An entry to be created by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Task id to embed so later runs can find the entry again.
    pub marker: String,
}

/// Backing calendar consumed by the engine.
///
/// Every call is a blocking request/response; implementations that need
/// interior state (the in-memory store) synchronize it themselves.
pub trait CalendarStore {
    /// Entries overlapping `[start, end)`. `search` narrows the result to
    /// entries whose text (title, description, marker) contains it.
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError>;

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError>;

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError>;

    fn delete_event(&self, id: &str) -> Result<(), SyncError>;
}

impl<S: CalendarStore + ?Sized> CalendarStore for &S {
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        (**self).query_events(start, end, search)
    }

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError> {
        (**self).create_event(entry)
    }

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError> {
        (**self).update_event_title(id, title)
    }

    fn delete_event(&self, id: &str) -> Result<(), SyncError> {
        (**self).delete_event(id)
    }
}

impl<S: CalendarStore + ?Sized> CalendarStore for Box<S> {
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        (**self).query_events(start, end, search)
    }

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError> {
        (**self).create_event(entry)
    }

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError> {
        (**self).update_event_title(id, title)
    }

    fn delete_event(&self, id: &str) -> Result<(), SyncError> {
        (**self).delete_event(id)
    }
}
