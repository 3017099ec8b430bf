//! Todoist as the task source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::http::{BlockingClient, Service};
use super::keyring_store;
use super::traits::Integration;
use crate::error::SyncError;
use crate::storage::TodoistConfig;
use crate::task::{Task, TaskSource};

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "TODOIST_API_KEY";
const TOKEN_KEY: &str = "todoist_api_key";

/// Reads active tasks through the Todoist REST API.
pub struct TodoistSource {
    http: BlockingClient,
    api_url: String,
    token: String,
}

impl TodoistSource {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, SyncError> {
        Ok(Self {
            http: BlockingClient::new(Service::Todoist)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Token from `TODOIST_API_KEY`, else from the keyring.
    pub fn from_env_or_keyring(config: &TodoistConfig) -> Result<Self, SyncError> {
        let token = match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.is_empty() => token,
            _ => keyring_store::get(TOKEN_KEY)?.ok_or_else(|| SyncError::AuthenticationRequired {
                service: "todoist".to_string(),
            })?,
        };
        Self::new(&config.api_url, token)
    }
}

impl TaskSource for TodoistSource {
    fn list_active_tasks(&self) -> Result<Vec<Task>, SyncError> {
        let request = self
            .http
            .client()
            .get(format!("{}/tasks", self.api_url))
            .bearer_auth(&self.token);
        let body = self.http.send_json(request)?;

        // REST v2 returns a bare array; newer versions wrap it in `results`.
        let items = body
            .as_array()
            .or_else(|| body["results"].as_array())
            .ok_or_else(|| SyncError::TaskSource("unexpected tasks payload".into()))?;

        let tasks: Vec<Task> = items.iter().filter_map(parse_task).collect();
        tracing::debug!(count = tasks.len(), "fetched Todoist tasks");
        Ok(tasks)
    }
}

/// Convert one task resource. Items without an id or content are dropped.
pub fn parse_task(item: &serde_json::Value) -> Option<Task> {
    let id = match &item["id"] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let content = item["content"].as_str()?.to_string();
    let labels = item["labels"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|l| l.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let due = if item["due"].is_object() {
        let parsed = parse_due(&item["due"]);
        if parsed.is_none() {
            tracing::warn!(task = %content, due = %item["due"], "unparseable due date");
        }
        parsed
    } else {
        None
    };

    Some(Task {
        id,
        content,
        due,
        labels,
    })
}

/// `due.datetime` when present, else `due.date`. A bare date is pinned to
/// midnight UTC; a floating date-time without offset is read as UTC.
fn parse_due(due: &serde_json::Value) -> Option<DateTime<Utc>> {
    let raw = due["datetime"].as_str().or_else(|| due["date"].as_str())?;
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(t.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Stored Todoist API token.
pub struct TodoistAuth {
    pending: Option<String>,
}

impl TodoistAuth {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Stage a token for [`Integration::authenticate`] to store.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            pending: Some(token.into()),
        }
    }
}

impl Default for TodoistAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl Integration for TodoistAuth {
    fn name(&self) -> &str {
        "todoist"
    }

    fn display_name(&self) -> &str {
        "Todoist"
    }

    fn is_authenticated(&self) -> bool {
        std::env::var(TOKEN_ENV).is_ok_and(|t| !t.is_empty())
            || keyring_store::get(TOKEN_KEY).ok().flatten().is_some()
    }

    fn authenticate(&mut self) -> Result<(), SyncError> {
        match self.pending.take() {
            Some(token) if !token.trim().is_empty() => keyring_store::set(TOKEN_KEY, token.trim()),
            _ => Err(SyncError::AuthenticationRequired {
                service: "todoist (no API token given)".to_string(),
            }),
        }
    }

    fn disconnect(&mut self) -> Result<(), SyncError> {
        keyring_store::delete(TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn date_only_due_is_midnight_utc() {
        let task = parse_task(&json!({
            "id": "1",
            "content": "Write report",
            "labels": ["l", "work"],
            "due": {"date": "2026-10-21", "string": "Oct 21"}
        }))
        .unwrap();
        assert_eq!(task.due, Some(Utc.with_ymd_and_hms(2026, 10, 21, 0, 0, 0).unwrap()));
        assert_eq!(task.labels, vec!["l", "work"]);
    }

    #[test]
    fn datetime_due_wins_over_date() {
        let task = parse_task(&json!({
            "id": 77,
            "content": "Call",
            "due": {"date": "2026-10-21", "datetime": "2026-10-21T15:30:00Z"}
        }))
        .unwrap();
        assert_eq!(task.id, "77");
        assert_eq!(task.due, Some(Utc.with_ymd_and_hms(2026, 10, 21, 15, 30, 0).unwrap()));
    }

    #[test]
    fn floating_datetime_is_read_as_utc() {
        let due = parse_due(&json!({"date": "2026-10-21T09:00:00"}));
        assert_eq!(due, Some(Utc.with_ymd_and_hms(2026, 10, 21, 9, 0, 0).unwrap()));
    }

    #[test]
    fn garbage_due_becomes_missing() {
        let task = parse_task(&json!({
            "id": "2",
            "content": "Someday",
            "due": {"date": "next tuesday-ish"}
        }))
        .unwrap();
        assert_eq!(task.due, None);
    }

    #[test]
    fn task_without_id_or_content_is_dropped() {
        assert!(parse_task(&json!({"content": "x"})).is_none());
        assert!(parse_task(&json!({"id": "3"})).is_none());
    }

    #[test]
    fn authenticate_needs_a_token() {
        let mut auth = TodoistAuth::new();
        assert!(matches!(
            auth.authenticate(),
            Err(SyncError::AuthenticationRequired { .. })
        ));
    }
}
