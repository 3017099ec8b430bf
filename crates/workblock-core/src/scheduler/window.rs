//! Work-window collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarStore;
use crate::error::SyncError;

/// A live availability window, already clipped to the present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWindow {
    /// Id of the calendar entry that declares the window.
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkWindow {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Reads work windows from the calendar store.
pub struct WindowCollector<'a> {
    store: &'a dyn CalendarStore,
    marker_title: &'a str,
}

impl<'a> WindowCollector<'a> {
    pub fn new(store: &'a dyn CalendarStore, marker_title: &'a str) -> Self {
        Self {
            store,
            marker_title,
        }
    }

    /// Live windows between `now` and `lookahead_end`, ordered by start.
    ///
    /// `rounded_now` is `now` rounded up to the scheduling granularity.
    /// Windows that already began are clipped to it; windows ending at or
    /// before it are dropped.
    pub fn collect(
        &self,
        now: DateTime<Utc>,
        rounded_now: DateTime<Utc>,
        lookahead_end: DateTime<Utc>,
    ) -> Result<Vec<WorkWindow>, SyncError> {
        let mut raw: Vec<_> = self
            .store
            .query_events(now, lookahead_end, None)?
            .into_iter()
            .filter(|e| e.title == self.marker_title)
            .collect();
        raw.sort_by_key(|e| e.start);

        Ok(raw
            .into_iter()
            .filter(|e| e.end > rounded_now)
            .map(|e| WorkWindow {
                id: e.id,
                start: e.start.max(rounded_now),
                end: e.end,
            })
            .collect())
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

    #[test]
    fn keeps_only_marked_entries_in_start_order() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(21, 9, 0), at(21, 12, 0));
        cal.add("Dentist", at(20, 9, 0), at(20, 10, 0));
        cal.add("Work Block", at(20, 13, 0), at(20, 17, 0));

        let now = at(19, 8, 0);
        let windows = WindowCollector::new(&cal, "Work Block")
            .collect(now, now, at(30, 0, 0))
            .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, at(20, 13, 0));
        assert_eq!(windows[1].start, at(21, 9, 0));
    }

    #[test]
    fn clips_started_window_and_drops_finished_one() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 7, 0), at(19, 8, 0));
        cal.add("Work Block", at(19, 9, 0), at(19, 12, 0));

        let now = at(19, 9, 52);
        let rounded = at(19, 10, 0);
        let windows = WindowCollector::new(&cal, "Work Block")
            .collect(now, rounded, at(30, 0, 0))
            .unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, rounded);
        assert_eq!(windows[0].end, at(19, 12, 0));
        assert_eq!(windows[0].duration_minutes(), 120);
    }

    #[test]
    fn window_ending_at_rounded_now_is_dropped() {
        let cal = InMemoryCalendar::new();
        cal.add("Work Block", at(19, 9, 0), at(19, 10, 0));

        let windows = WindowCollector::new(&cal, "Work Block")
            .collect(at(19, 9, 50), at(19, 10, 0), at(30, 0, 0))
            .unwrap();
        assert!(windows.is_empty());
    }
}
