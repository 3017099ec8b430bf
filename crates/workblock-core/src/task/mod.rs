//! Task types consumed by the scheduler.
//!
//! Tasks come from an external task manager and are never mutated by a sync
//! pass. The only thing the engine derives from them is a duration (see
//! [`duration::DurationResolver`]) and the canonical calendar title.

pub mod duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use duration::{DurationResolver, DurationTier};

use crate::error::SyncError;

/// Prefix of every calendar entry created for a task.
pub const TITLE_PREFIX: &str = "Task: ";

/// A unit of work fetched from the task source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier in the task source; embedded in calendar entries as the marker.
    pub id: String,
    /// Display text.
    pub content: String,
    /// Deadline. Date-only deadlines are pinned to midnight UTC.
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    /// Labels attached in the task source; only membership matters.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            due: None,
            labels: Vec::new(),
        }
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Title of the calendar entry representing this task.
    pub fn calendar_title(&self) -> String {
        format!("{TITLE_PREFIX}{}", self.content)
    }
}

/// Where active tasks come from.
pub trait TaskSource {
    /// Every task that is not completed.
    fn list_active_tasks(&self) -> Result<Vec<Task>, SyncError>;
}

/// A fixed task list, for tests and embedding.
impl TaskSource for Vec<Task> {
    fn list_active_tasks(&self) -> Result<Vec<Task>, SyncError> {
        Ok(self.clone())
    }
}

impl<S: TaskSource + ?Sized> TaskSource for &S {
    fn list_active_tasks(&self) -> Result<Vec<Task>, SyncError> {
        (**self).list_active_tasks()
    }
}

/// Sort tasks earliest-deadline-first.
///
/// The sort is stable, so tasks sharing a deadline keep their input order.
/// Tasks without a deadline sink to the end.
pub fn sort_by_deadline(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| match (a.due, b.due) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn calendar_title_uses_prefix() {
        let task = Task::new("1", "Draft report");
        assert_eq!(task.calendar_title(), "Task: Draft report");
    }

    #[test]
    fn sort_by_deadline_is_stable() {
        let d1 = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 10, 22, 0, 0, 0).unwrap();
        let mut tasks = vec![
            Task::new("late", "late").with_due(d2),
            Task::new("none", "none"),
            Task::new("early-a", "a").with_due(d1),
            Task::new("early-b", "b").with_due(d1),
        ];

        sort_by_deadline(&mut tasks);

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early-a", "early-b", "late", "none"]);
    }

    #[test]
    fn task_deserializes_without_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"7","content":"Call"}"#).unwrap();
        assert!(task.due.is_none());
        assert!(task.labels.is_empty());
    }
}
