//! Conflict detection and continuous-space measurement.
//!
//! An interval conflicts when some calendar entry other than the owning work
//! window overlaps it and the caller owns or accepted that entry. Declined,
//! tentative and unanswered invitations never block a placement.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::slots::CandidateSlot;
use crate::calendar::{CalendarEntry, CalendarStore, Participation};
use crate::error::SyncError;

/// Answers "is `[start, end)` already taken?" for the scheduler.
pub trait ConflictOracle {
    fn has_conflict(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        owner_window_id: &str,
    ) -> Result<bool, SyncError>;

    /// Called after the scheduler created `entry`. The entry blocks time
    /// for the rest of the run whatever participation the store reports.
    fn record_commit(&mut self, _entry: &CalendarEntry) {}
}

fn is_blocking(entry: &CalendarEntry, owner_window_id: &str) -> bool {
    entry.id != owner_window_id && entry.participation.blocks_time()
}

/// Asks the calendar store on every call.
pub struct LiveConflictOracle<'a> {
    store: &'a dyn CalendarStore,
    committed: HashSet<String>,
}

impl<'a> LiveConflictOracle<'a> {
    pub fn new(store: &'a dyn CalendarStore) -> Self {
        Self {
            store,
            committed: HashSet::new(),
        }
    }
}

impl ConflictOracle for LiveConflictOracle<'_> {
    fn has_conflict(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        owner_window_id: &str,
    ) -> Result<bool, SyncError> {
        Ok(self
            .store
            .query_events(start, end, None)?
            .iter()
            .any(|e| {
                e.overlaps(start, end)
                    && (self.committed.contains(&e.id) || is_blocking(e, owner_window_id))
            }))
    }

    fn record_commit(&mut self, entry: &CalendarEntry) {
        self.committed.insert(entry.id.clone());
    }
}

/// Blocking entries loaded once for the whole horizon.
///
/// Entries are kept sorted by start. A lookup only scans entries that start
/// before the interval ends and no earlier than the longest entry could
/// still reach into it, so most queries touch a handful of entries. Commits
/// made during the run are folded in through [`ConflictOracle::record_commit`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotConflictOracle {
    busy: Vec<CalendarEntry>,
    longest: Duration,
}

impl SnapshotConflictOracle {
    /// Load every blocking entry overlapping `[start, end)`.
    pub fn load(
        store: &dyn CalendarStore,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, SyncError> {
        let entries = store
            .query_events(start, end, None)?
            .into_iter()
            .filter(|e| e.participation.blocks_time());
        let mut oracle = Self::default();
        for entry in entries {
            oracle.insert(entry);
        }
        Ok(oracle)
    }

    fn insert(&mut self, entry: CalendarEntry) {
        let span = entry.end - entry.start;
        if span > self.longest {
            self.longest = span;
        }
        let at = self.busy.partition_point(|e| e.start <= entry.start);
        self.busy.insert(at, entry);
    }

    pub fn len(&self) -> usize {
        self.busy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.busy.is_empty()
    }
}

impl ConflictOracle for SnapshotConflictOracle {
    fn has_conflict(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        owner_window_id: &str,
    ) -> Result<bool, SyncError> {
        let earliest = start - self.longest;
        let lo = self.busy.partition_point(|e| e.start < earliest);
        let hi = self.busy.partition_point(|e| e.start < end);
        Ok(self.busy[lo..hi.max(lo)]
            .iter()
            .any(|e| e.overlaps(start, end) && is_blocking(e, owner_window_id)))
    }

    fn record_commit(&mut self, entry: &CalendarEntry) {
        self.insert(CalendarEntry {
            participation: Participation::Owner,
            ..entry.clone()
        });
    }
}

/// Uninterrupted free minutes from `slot.start` until the first conflicting
/// granularity step or the window end.
pub fn continuous_space<O: ConflictOracle + ?Sized>(
    oracle: &O,
    slot: &CandidateSlot,
    granularity_minutes: i64,
) -> Result<f64, SyncError> {
    let step = Duration::minutes(granularity_minutes.max(1));
    let mut free_until = slot.start;
    let mut cursor = slot.start;

    while cursor < slot.window_end {
        let next = cursor + step;
        if oracle.has_conflict(cursor, next, &slot.window_id)? {
            break;
        }
        free_until = next;
        cursor = next;
    }

    let to_window_end = slot.window_end - slot.start;
    let to_conflict = free_until - slot.start;
    Ok(minutes(to_window_end.min(to_conflict)))
}

fn minutes(d: Duration) -> f64 {
    d.num_seconds() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{InMemoryCalendar, Participation};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn slot(window_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CandidateSlot {
        CandidateSlot {
            start,
            window_id: window_id.into(),
            window_end: end,
        }
    }

    fn seeded() -> (InMemoryCalendar, String) {
        let cal = InMemoryCalendar::new();
        let window = cal.add("Work Block", at(9, 0), at(12, 0));
        cal.add_with_status("Standup", at(10, 0), at(10, 30), Participation::Accepted);
        cal.add_with_status("Optional", at(11, 0), at(11, 30), Participation::Declined);
        cal.add_with_status("Maybe", at(11, 30), at(12, 0), Participation::Invited);
        (cal, window)
    }

    #[test]
    fn own_window_and_non_accepted_entries_do_not_conflict() {
        let (cal, window) = seeded();
        let oracle = LiveConflictOracle::new(&cal);

        assert!(!oracle.has_conflict(at(9, 0), at(10, 0), &window).unwrap());
        assert!(oracle.has_conflict(at(9, 45), at(10, 15), &window).unwrap());
        assert!(!oracle.has_conflict(at(11, 0), at(12, 0), &window).unwrap());
    }

    #[test]
    fn foreign_window_counts_as_conflict() {
        let (cal, _) = seeded();
        let oracle = LiveConflictOracle::new(&cal);
        assert!(oracle.has_conflict(at(9, 0), at(9, 15), "some-other-window").unwrap());
    }

    #[test]
    fn snapshot_agrees_with_live_queries() {
        let (cal, window) = seeded();
        let live = LiveConflictOracle::new(&cal);
        let snapshot = SnapshotConflictOracle::load(&cal, at(0, 0), at(23, 0)).unwrap();
        assert_eq!(snapshot.len(), 2);

        let mut start = at(8, 30);
        while start < at(12, 0) {
            for len in [15, 30, 60] {
                let end = start + Duration::minutes(len);
                assert_eq!(
                    live.has_conflict(start, end, &window).unwrap(),
                    snapshot.has_conflict(start, end, &window).unwrap(),
                    "mismatch at {start} +{len}m"
                );
            }
            start += Duration::minutes(15);
        }
    }

    #[test]
    fn snapshot_sees_recorded_commits() {
        let cal = InMemoryCalendar::new();
        let window = cal.add("Work Block", at(9, 0), at(12, 0));
        let mut oracle = SnapshotConflictOracle::load(&cal, at(0, 0), at(23, 0)).unwrap();
        assert!(!oracle.has_conflict(at(9, 0), at(9, 30), &window).unwrap());

        oracle.record_commit(&CalendarEntry {
            id: "t1".into(),
            title: "Task: A".into(),
            start: at(9, 15),
            end: at(9, 45),
            participation: Participation::Owner,
            marker: Some("a".into()),
        });
        assert!(oracle.has_conflict(at(9, 0), at(9, 30), &window).unwrap());
    }

    #[test]
    fn own_commits_block_even_when_reported_as_not_attending() {
        let cal = InMemoryCalendar::new();
        let window = cal.add("Work Block", at(9, 0), at(12, 0));
        let created = CalendarEntry {
            id: "t1".into(),
            title: "Task: A".into(),
            start: at(9, 30),
            end: at(10, 30),
            participation: Participation::Tentative,
            marker: Some("a".into()),
        };

        let mut snapshot = SnapshotConflictOracle::load(&cal, at(0, 0), at(23, 0)).unwrap();
        cal.insert(created.clone());
        let mut live = LiveConflictOracle::new(&cal);
        assert!(!live.has_conflict(at(9, 0), at(10, 0), &window).unwrap());

        snapshot.record_commit(&created);
        live.record_commit(&created);
        assert!(snapshot.has_conflict(at(9, 0), at(10, 0), &window).unwrap());
        assert!(live.has_conflict(at(9, 0), at(10, 0), &window).unwrap());
        assert!(!live.has_conflict(at(10, 30), at(11, 0), &window).unwrap());
    }

    #[test]
    fn long_entry_starting_well_before_is_found() {
        let cal = InMemoryCalendar::new();
        cal.add("Offsite", at(0, 0), at(23, 0));
        cal.add("Coffee", at(8, 0), at(8, 15));
        let oracle = SnapshotConflictOracle::load(&cal, at(0, 0), at(23, 0)).unwrap();
        assert!(oracle.has_conflict(at(15, 0), at(15, 15), "w").unwrap());
    }

    #[test]
    fn continuous_space_stops_at_first_conflict() {
        let (cal, window) = seeded();
        let oracle = LiveConflictOracle::new(&cal);

        let space = continuous_space(&oracle, &slot(&window, at(9, 0), at(12, 0)), 15).unwrap();
        assert_eq!(space, 60.0);

        let space = continuous_space(&oracle, &slot(&window, at(10, 30), at(12, 0)), 15).unwrap();
        assert_eq!(space, 90.0);
    }

    #[test]
    fn continuous_space_is_capped_by_unaligned_window_end() {
        let cal = InMemoryCalendar::new();
        let window = cal.add("Work Block", at(9, 0), at(9, 40));
        let oracle = LiveConflictOracle::new(&cal);
        let space = continuous_space(&oracle, &slot(&window, at(9, 0), at(9, 40)), 15).unwrap();
        assert_eq!(space, 40.0);
    }

    #[test]
    fn continuous_space_is_zero_when_first_step_conflicts() {
        let (cal, window) = seeded();
        let oracle = LiveConflictOracle::new(&cal);
        let space = continuous_space(&oracle, &slot(&window, at(10, 0), at(12, 0)), 15).unwrap();
        assert_eq!(space, 0.0);
    }
}
