//! Candidate slot generation and the per-run slot pool.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::window::WorkWindow;

/// A potential task start inside a work window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub window_id: String,
    pub window_end: DateTime<Utc>,
}

impl CandidateSlot {
    /// Whether a task of `minutes` starting here ends by the window end.
    pub fn fits(&self, minutes: i64) -> bool {
        self.start + Duration::minutes(minutes) <= self.window_end
    }
}

/// Remaining candidate slots for one run.
///
/// Owned by the scheduler loop and shrunk after every commit; nothing
/// outside a single run ever sees it.
#[derive(Debug, Clone, Default)]
pub struct SlotPool {
    slots: Vec<CandidateSlot>,
}

impl SlotPool {
    /// Discretize windows into slots `granularity_minutes` apart, starting
    /// at each window's start and stopping before its end.
    pub fn generate(windows: &[WorkWindow], granularity_minutes: i64) -> Self {
        let step = Duration::minutes(granularity_minutes.max(1));
        let mut slots = Vec::new();

        for window in windows {
            let mut start = window.start;
            while start < window.end {
                slots.push(CandidateSlot {
                    start,
                    window_id: window.id.clone(),
                    window_end: window.end,
                });
                start += step;
            }
        }

        Self { slots }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot starting inside `[start, end)`. Returns how many went.
    pub fn consume(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|s| !(s.start >= start && s.start < end));
        before - self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn window(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> WorkWindow {
        WorkWindow {
            id: id.into(),
            start,
            end,
        }
    }

    #[test]
    fn generates_slots_up_to_but_excluding_end() {
        let pool = SlotPool::generate(&[window("w", at(9, 0), at(10, 0))], 15);
        let starts: Vec<_> = pool.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(9, 0), at(9, 15), at(9, 30), at(9, 45)]);
        assert!(pool.iter().all(|s| s.window_id == "w" && s.window_end == at(10, 0)));
    }

    #[test]
    fn unaligned_window_end_keeps_last_partial_slot() {
        let pool = SlotPool::generate(&[window("w", at(9, 0), at(9, 40))], 15);
        assert_eq!(pool.len(), 3);
        let last = pool.iter().last().unwrap();
        assert_eq!(last.start, at(9, 30));
        assert!(!last.fits(15));
        assert!(last.fits(10));
    }

    #[test]
    fn windows_are_kept_in_given_order() {
        let pool = SlotPool::generate(
            &[
                window("b", at(14, 0), at(14, 30)),
                window("a", at(9, 0), at(9, 30)),
            ],
            15,
        );
        let ids: Vec<_> = pool.iter().map(|s| s.window_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "b", "a", "a"]);
    }

    #[test]
    fn consume_removes_half_open_range() {
        let mut pool = SlotPool::generate(&[window("w", at(9, 0), at(11, 0))], 15);
        let removed = pool.consume(at(9, 30), at(10, 0));
        assert_eq!(removed, 2);
        assert!(pool.iter().any(|s| s.start == at(10, 0)));
        assert!(pool.iter().all(|s| s.start != at(9, 30) && s.start != at(9, 45)));
    }
}
