//! Google Calendar as the calendar store.
//!
//! Talks to the Calendar v3 REST API. Entries created by a sync carry the
//! task id twice: as a private extended property and as a `Todoist ID:`
//! line in the description. The description line is what free-text search
//! matches; either copy is accepted when reading.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::json;

use super::http::{BlockingClient, Service};
use super::keyring_store;
use super::oauth::{self, OAuthConfig};
use super::traits::Integration;
use crate::calendar::{CalendarEntry, CalendarStore, NewEntry, Participation};
use crate::error::SyncError;
use crate::storage::GoogleConfig;

/// Keyring key of the OAuth tokens.
const TOKEN_KEY: &str = "google";
const MARKER_PROPERTY: &str = "workblock_task_id";
const DESCRIPTION_MARKER: &str = "Todoist ID: ";
const PAGE_SIZE: &str = "250";

enum Token {
    Fixed(String),
    Keyring(GoogleAuth),
}

/// Calendar store backed by one Google calendar.
pub struct GoogleCalendarStore {
    http: BlockingClient,
    api_url: String,
    calendar_id: String,
    token: Token,
}

impl GoogleCalendarStore {
    /// Use the OAuth tokens stored by `workblock auth google login`.
    pub fn from_keyring(config: &GoogleConfig) -> Result<Self, SyncError> {
        let auth = GoogleAuth::new();
        if !auth.is_authenticated() {
            return Err(SyncError::AuthenticationRequired {
                service: TOKEN_KEY.to_string(),
            });
        }
        Ok(Self {
            http: BlockingClient::new(Service::Google)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            token: Token::Keyring(auth),
        })
    }

    /// Use a fixed bearer token.
    pub fn with_token(
        api_url: &str,
        calendar_id: &str,
        token: impl Into<String>,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            http: BlockingClient::new(Service::Google)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            token: Token::Fixed(token.into()),
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(id))
    }

    fn bearer(&self) -> Result<String, SyncError> {
        match &self.token {
            Token::Fixed(token) => Ok(token.clone()),
            Token::Keyring(auth) => auth.access_token(&self.http),
        }
    }
}

impl CalendarStore for GoogleCalendarStore {
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        let token = self.bearer()?;
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", rfc3339(start)),
                ("timeMax", rfc3339(end)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(q) = search {
                query.push(("q", q.to_string()));
            }
            if let Some(page) = &page_token {
                query.push(("pageToken", page.clone()));
            }

            let request = self
                .http
                .client()
                .get(self.events_url())
                .bearer_auth(&token)
                .query(&query);
            let resp = self.http.send_json(request)?;

            for item in resp["items"].as_array().into_iter().flatten() {
                if item["status"].as_str() == Some("cancelled") {
                    continue;
                }
                entries.push(parse_entry(item)?);
            }

            match resp["nextPageToken"].as_str() {
                Some(next) => page_token = Some(next.to_string()),
                None => break,
            }
        }

        tracing::debug!(count = entries.len(), search, "listed calendar events");
        Ok(entries)
    }

    fn create_event(&self, entry: &NewEntry) -> Result<CalendarEntry, SyncError> {
        let body = json!({
            "summary": entry.title,
            "description": format!("{DESCRIPTION_MARKER}{}", entry.marker),
            "start": { "dateTime": rfc3339(entry.start) },
            "end": { "dateTime": rfc3339(entry.end) },
            "extendedProperties": {
                "private": { MARKER_PROPERTY: entry.marker }
            },
        });
        let request = self
            .http
            .client()
            .post(self.events_url())
            .bearer_auth(self.bearer()?)
            .json(&body);
        parse_entry(&self.http.send_json(request)?)
    }

    fn update_event_title(&self, id: &str, title: &str) -> Result<(), SyncError> {
        let request = self
            .http
            .client()
            .patch(self.event_url(id))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "summary": title }));
        self.http.send_json(request)?;
        Ok(())
    }

    fn delete_event(&self, id: &str) -> Result<(), SyncError> {
        let request = self
            .http
            .client()
            .delete(self.event_url(id))
            .bearer_auth(self.bearer()?);
        self.http.send_json(request)?;
        Ok(())
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert one Calendar v3 event resource.
pub fn parse_entry(item: &serde_json::Value) -> Result<CalendarEntry, SyncError> {
    let id = item["id"]
        .as_str()
        .ok_or_else(|| SyncError::CalendarApi("event without id".into()))?
        .to_string();
    let start = parse_time(&item["start"])
        .ok_or_else(|| SyncError::CalendarApi(format!("event {id} has no valid start")))?;
    let end = parse_time(&item["end"])
        .ok_or_else(|| SyncError::CalendarApi(format!("event {id} has no valid end")))?;

    Ok(CalendarEntry {
        title: item["summary"].as_str().unwrap_or("(No title)").to_string(),
        start,
        end,
        participation: participation(item),
        marker: marker(item),
        id,
    })
}

/// `{"dateTime": ...}` or, for all-day events, `{"date": "YYYY-MM-DD"}` at UTC midnight.
fn parse_time(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(dt) = value["dateTime"].as_str() {
        return DateTime::parse_from_rfc3339(dt)
            .ok()
            .map(|t| t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value["date"].as_str()?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn participation(item: &serde_json::Value) -> Participation {
    if item["organizer"]["self"].as_bool() == Some(true)
        || item["creator"]["self"].as_bool() == Some(true)
    {
        return Participation::Owner;
    }

    let me = item["attendees"]
        .as_array()
        .and_then(|list| list.iter().find(|a| a["self"].as_bool() == Some(true)));
    match me.and_then(|a| a["responseStatus"].as_str()) {
        None if me.is_none() => Participation::Owner,
        Some("accepted") => Participation::Accepted,
        Some("declined") => Participation::Declined,
        Some("tentative") => Participation::Tentative,
        _ => Participation::Invited,
    }
}

fn marker(item: &serde_json::Value) -> Option<String> {
    if let Some(id) = item["extendedProperties"]["private"][MARKER_PROPERTY].as_str() {
        return Some(id.to_string());
    }
    item["description"].as_str()?.lines().find_map(|line| {
        line.trim()
            .strip_prefix(DESCRIPTION_MARKER)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    })
}

/// OAuth credentials for Google Calendar.
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
}

impl GoogleAuth {
    /// Load client credentials from keyring. Empty strings if not stored yet.
    pub fn new() -> Self {
        let client_id = keyring_store::get("google_client_id")
            .ok()
            .flatten()
            .unwrap_or_default();
        let client_secret = keyring_store::get("google_client_secret")
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            client_id,
            client_secret,
        }
    }

    /// Persist Google OAuth client credentials to the OS keyring.
    pub fn set_credentials(&mut self, client_id: &str, client_secret: &str) -> Result<(), SyncError> {
        keyring_store::set("google_client_id", client_id)?;
        keyring_store::set("google_client_secret", client_secret)?;
        self.client_id = client_id.to_string();
        self.client_secret = client_secret.to_string();
        Ok(())
    }

    fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            service_name: TOKEN_KEY.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar.events".to_string()],
            redirect_port: 19821,
        }
    }

    /// Return a valid access token, refreshing if expired.
    fn access_token(&self, http: &BlockingClient) -> Result<String, SyncError> {
        let missing = || SyncError::AuthenticationRequired {
            service: TOKEN_KEY.to_string(),
        };
        let tokens = oauth::load_tokens(TOKEN_KEY).ok_or_else(missing)?;
        if !oauth::is_expired(&tokens, Utc::now().timestamp()) {
            return Ok(tokens.access_token);
        }

        let refresh = tokens.refresh_token.as_deref().ok_or_else(missing)?;
        tracing::debug!("refreshing Google access token");
        let refreshed = http.block_on(oauth::refresh_token(&self.oauth_config(), refresh))?;
        Ok(refreshed.access_token)
    }
}

impl Default for GoogleAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl Integration for GoogleAuth {
    fn name(&self) -> &str {
        TOKEN_KEY
    }

    fn display_name(&self) -> &str {
        "Google Calendar"
    }

    fn is_authenticated(&self) -> bool {
        oauth::load_tokens(TOKEN_KEY).is_some()
    }

    fn authenticate(&mut self) -> Result<(), SyncError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(SyncError::AuthenticationRequired {
                service: "google (client_id / client_secret not configured)".to_string(),
            });
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(oauth::authorize(&self.oauth_config()))?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SyncError> {
        keyring_store::delete(TOKEN_KEY)
    }
}
