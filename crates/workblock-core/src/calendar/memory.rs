//! In-memory calendar store.
//!
//! Behaves like the remote calendar as far as the engine can tell: overlap
//! queries, free-text search, participation status. Every write is also
//! appended to a log so callers can assert on exactly what a run did.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{CalendarEntry, CalendarStore, NewEntry, Participation};
use crate::error::SyncError;

/// A write issued against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    Created(CalendarEntry),
    TitleUpdated { id: String, title: String },
    Deleted(String),
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<CalendarEntry>,
    writes: Vec<WriteRecord>,
    rejected_titles: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    state: Mutex<State>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an existing entry. Seeding is not recorded as a write.
    pub fn insert(&self, entry: CalendarEntry) {
        self.lock().entries.push(entry);
    }

    /// Seed an owned entry with a generated id and return the id.
    pub fn add(&self, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        self.add_with_status(title, start, end, Participation::Owner)
    }

    pub fn add_with_status(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        participation: Participation,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert(CalendarEntry {
            id: id.clone(),
            title: title.to_string(),
            start,
            end,
            participation,
            marker: None,
        });
        id
    }

    /// Make every create with this title fail, to exercise write-failure paths.
    pub fn reject_creates_titled(&self, title: &str) {
        self.lock().rejected_titles.insert(title.to_string());
    }

    pub fn entries(&self) -> Vec<CalendarEntry> {
        self.lock().entries.clone()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    pub fn created(&self) -> Vec<CalendarEntry> {
        self.lock()
            .writes
            .iter()
            .filter_map(|w| match w {
                WriteRecord::Created(entry) => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn title_updates(&self) -> Vec<(String, String)> {
        self.lock()
            .writes
            .iter()
            .filter_map(|w| match w {
                WriteRecord::TitleUpdated { id, title } => Some((id.clone(), title.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }
}

impl CalendarStore for InMemoryCalendar {
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        let state = self.lock();
        let mut found: Vec<CalendarEntry> = state
            .entries
            .iter()
            .filter(|e| e.overlaps(start, end))
            .filter(|e| search.map_or(true, |s| e.matches_search(s)))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.start);
        Ok(found)
    }

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError> {
        let mut state = self.lock();
        if state.rejected_titles.contains(&entry.title) {
            return Err(SyncError::CalendarApi(format!(
                "create rejected for '{}'",
                entry.title
            )));
        }

        let created = CalendarEntry {
            id: uuid::Uuid::new_v4().to_string(),
            title: entry.title.clone(),
            start: entry.start,
            end: entry.end,
            participation: Participation::Owner,
            marker: Some(entry.marker.clone()),
        };
        state.entries.push(created.clone());
        state.writes.push(WriteRecord::Created(created.clone()));
        Ok(created)
    }

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError> {
        let mut state = self.lock();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| SyncError::EntryNotFound(id.to_string()))?;
        entry.title = title.to_string();
        state.writes.push(WriteRecord::TitleUpdated {
            id: id.to_string(),
            title: title.to_string(),
        });
        Ok(())
    }

    fn delete_event(&self, id: &str) -> Result<(), SyncError> {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() == before {
            return Err(SyncError::EntryNotFound(id.to_string()));
        }
        state.writes.push(WriteRecord::Deleted(id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    #[test]
    fn query_returns_overlapping_entries_sorted() {
        let cal = InMemoryCalendar::new();
        cal.add("Later", at(14, 0), at(15, 0));
        cal.add("Earlier", at(9, 0), at(10, 0));
        cal.add("Outside", at(18, 0), at(19, 0));

        let found = cal.query_events(at(8, 0), at(16, 0), None).unwrap();
        let titles: Vec<_> = found.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Later"]);
    }

    #[test]
    fn search_matches_marker() {
        let cal = InMemoryCalendar::new();
        let created = cal
            .create_event(&NewEntry {
                title: "Task: Write".into(),
                start: at(9, 0),
                end: at(9, 30),
                marker: "8842".into(),
            })
            .unwrap();

        let found = cal.query_events(at(0, 0), at(23, 0), Some("8842")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);
        assert!(cal.query_events(at(0, 0), at(23, 0), Some("9999")).unwrap().is_empty());
    }

    #[test]
    fn writes_are_logged_but_seeding_is_not() {
        let cal = InMemoryCalendar::new();
        let id = cal.add("Work Block", at(9, 0), at(12, 0));
        assert!(cal.writes().is_empty());

        cal.update_event_title(&id, "Focus").unwrap();
        cal.delete_event(&id).unwrap();
        assert_eq!(cal.writes().len(), 2);
        assert_eq!(cal.title_updates(), vec![(id.clone(), "Focus".to_string())]);
        assert!(cal.entries().is_empty());
    }

    #[test]
    fn rejected_titles_fail_to_create() {
        let cal = InMemoryCalendar::new();
        cal.reject_creates_titled("Task: Broken");
        let result = cal.create_event(&NewEntry {
            title: "Task: Broken".into(),
            start: at(9, 0),
            end: at(9, 30),
            marker: "1".into(),
        });
        assert!(result.is_err());
        assert!(cal.created().is_empty());
    }

    #[test]
    fn update_of_missing_entry_errors() {
        let cal = InMemoryCalendar::new();
        assert!(matches!(
            cal.update_event_title("nope", "x"),
            Err(SyncError::EntryNotFound(_))
        ));
    }
}
