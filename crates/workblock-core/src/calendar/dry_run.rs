//! Dry-run wrapper around a calendar store.
//!
//! Reads go to the wrapped store; writes are staged in memory and folded
//! back into later reads, so a dry run makes the same decisions a real run
//! would without touching the backing calendar.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::memory::WriteRecord;
use super::{CalendarEntry, CalendarStore, NewEntry, Participation};
use crate::error::SyncError;

#[derive(Debug, Default)]
struct Staged {
    created: Vec<CalendarEntry>,
    renamed: HashMap<String, String>,
    deleted: HashSet<String>,
    log: Vec<WriteRecord>,
}

pub struct DryRunCalendar<S> {
    inner: S,
    staged: Mutex<Staged>,
}

impl<S: CalendarStore> DryRunCalendar<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            staged: Mutex::new(Staged::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Staged> {
        self.staged.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes that would have been issued, in order.
    pub fn planned_writes(&self) -> Vec<WriteRecord> {
        self.lock().log.clone()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: CalendarStore> CalendarStore for DryRunCalendar<S> {
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        let remote = self.inner.query_events(start, end, search)?;
        let staged = self.lock();

        let mut merged: Vec<CalendarEntry> = remote
            .into_iter()
            .filter(|e| !staged.deleted.contains(&e.id))
            .map(|mut e| {
                if let Some(title) = staged.renamed.get(&e.id) {
                    e.title = title.clone();
                }
                e
            })
            .collect();

        merged.extend(
            staged
                .created
                .iter()
                .filter(|e| e.overlaps(start, end))
                .filter(|e| search.map_or(true, |s| e.matches_search(s)))
                .cloned(),
        );
        merged.sort_by_key(|e| e.start);
        Ok(merged)
    }

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError> {
        let mut staged = self.lock();
        let created = CalendarEntry {
            id: format!("dry-run-{}", staged.created.len() + 1),
            title: entry.title.clone(),
            start: entry.start,
            end: entry.end,
            participation: Participation::Owner,
            marker: Some(entry.marker.clone()),
        };
        staged.created.push(created.clone());
        staged.log.push(WriteRecord::Created(created.clone()));
        Ok(created)
    }

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError> {
        let mut guard = self.lock();
        let staged = &mut *guard;
        match staged.created.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.title = title.to_string(),
            None => {
                staged.renamed.insert(id.to_string(), title.to_string());
            }
        }
        staged.log.push(WriteRecord::TitleUpdated {
            id: id.to_string(),
            title: title.to_string(),
        });
        Ok(())
    }

    fn delete_event(&self, id: &str) -> Result<(), SyncError> {
        let mut staged = self.lock();
        let before = staged.created.len();
        staged.created.retain(|e| e.id != id);
        if staged.created.len() == before {
            staged.deleted.insert(id.to_string());
        }
        staged.log.push(WriteRecord::Deleted(id.to_string()));
        Ok(())
    }
}
