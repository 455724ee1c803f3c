//! Google Calendar adapter.
//!
//! Reads rocks from a reference calendar and writes published chunk
//! events to a work calendar. Uses a bearer access token supplied via
//! an environment variable named in the configuration; the OAuth
//! exchange and refresh flow live outside the core.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde_json::json;

use super::{CalendarProvider, Rock};
use crate::error::CalendarError;
use crate::storage::CalendarConfig;

const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar provider.
pub struct GoogleCalendar {
    client: Client,
    base_url: String,
    reference_calendar_id: String,
    work_calendar_id: String,
    token_env: String,
}

impl GoogleCalendar {
    /// Build a client from the calendar configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &CalendarConfig) -> Result<Self, CalendarError> {
        Self::with_base_url(config, GOOGLE_API_BASE)
    }

    /// Build a client against a custom API base (tests point this at a
    /// mock server).
    pub fn with_base_url(config: &CalendarConfig, base_url: &str) -> Result<Self, CalendarError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            reference_calendar_id: config.reference_calendar_id.clone(),
            work_calendar_id: config.work_calendar_id.clone(),
            token_env: config.token_env.clone(),
        })
    }

    fn access_token(&self) -> Result<String, CalendarError> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalendarError::NotConnected(format!("{} is not set", self.token_env)))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencode(calendar_id)
        )
    }
}

/// Minimal percent-encoding for calendar ids (they may contain '@'
/// and '#', e.g. "primary" or group calendar addresses).
fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Parse one Google event item into a rock. Returns None for items
/// without usable start/end.
fn parse_event_item(item: &serde_json::Value) -> Option<Rock> {
    let title = item["summary"].as_str().unwrap_or("Busy").to_string();

    if let (Some(start), Some(end)) = (
        item["start"]["dateTime"].as_str(),
        item["end"]["dateTime"].as_str(),
    ) {
        let start = DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&Utc);
        return Some(Rock::timed(start, end, title));
    }

    // All-day events carry date-only start/end (end exclusive).
    if let (Some(start), Some(end)) = (
        item["start"]["date"].as_str(),
        item["end"]["date"].as_str(),
    ) {
        let start = DateTime::parse_from_rfc3339(&format!("{start}T00:00:00Z"))
            .ok()?
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(&format!("{end}T00:00:00Z"))
            .ok()?
            .with_timezone(&Utc);
        return Some(Rock::all_day(start, end, title));
    }

    None
}

impl CalendarProvider for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    fn list_busy_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Rock>, CalendarError> {
        let token = self.access_token()?;

        let response = self
            .client
            .get(self.events_url(&self.reference_calendar_id))
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ])
            .bearer_auth(&token)
            .send()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let items = body["items"]
            .as_array()
            .ok_or(CalendarError::MissingField("items"))?;

        Ok(items.iter().filter_map(parse_event_item).collect())
    }

    fn create_event(
        &self,
        title: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, CalendarError> {
        let token = self.access_token()?;

        let event = json!({
            "summary": title,
            "description": description,
            "start": { "dateTime": start.to_rfc3339() },
            "end": { "dateTime": end.to_rfc3339() },
            "colorId": "9",
        });

        let response = self
            .client
            .post(self.events_url(&self.work_calendar_id))
            .bearer_auth(&token)
            .json(&event)
            .send()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or(CalendarError::MissingField("id"))
    }
}
