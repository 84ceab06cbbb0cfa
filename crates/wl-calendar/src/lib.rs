//! Google Calendar API v3 meeting source for the worklog tool.
//!
//! Fetches one UTC day of events and turns each attended, timed event into a
//! meeting block. The OAuth flow is not handled here; callers provide a
//! bearer access token.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use wl_core::issue::issue_key_from_description;
use wl_core::{IssueKey, WorklogBlock};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "250";

/// Calendar client errors.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// Client configuration is unusable.
    #[error("invalid calendar configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The access token was rejected; a new one is needed.
    #[error("calendar access token expired or revoked")]
    AuthExpired,
    /// API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// Google Calendar client bound to one calendar.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    access_token: String,
    calendar_id: String,
    meeting_issue_key: IssueKey,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("access_token", &"[REDACTED]")
            .field("calendar_id", &self.calendar_id)
            .field("meeting_issue_key", &self.meeting_issue_key)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client reading `calendar_id` (usually `primary`).
    ///
    /// Meetings without a `[KEY-1]` marker in their description are booked
    /// on `meeting_issue_key`.
    pub fn new(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        meeting_issue_key: IssueKey,
    ) -> Result<Self, CalendarError> {
        let access_token = access_token.into().trim().to_string();
        let calendar_id = calendar_id.into().trim().to_string();
        if access_token.is_empty() {
            return Err(CalendarError::InvalidConfig {
                reason: "access token cannot be empty",
            });
        }
        if calendar_id.is_empty() {
            return Err(CalendarError::InvalidConfig {
                reason: "calendar id cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(CalendarError::ClientBuild)?;

        Ok(Self {
            http,
            access_token,
            calendar_id,
            meeting_issue_key,
        })
    }

    /// Fetches every event of the UTC day `day`, following pagination.
    pub async fn events_for(&self, day: NaiveDate) -> Result<Vec<Event>, CalendarError> {
        let (start, end) = day_bounds(day);
        let time_min = start.to_rfc3339();
        let time_max = end.to_rfc3339();
        let url = format!("{CALENDAR_API_URL}/calendars/{}/events", self.calendar_id);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", PAGE_SIZE),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(CalendarError::AuthExpired);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CalendarError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let page: EventPage = response.json().await?;
            events.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(%day, events = events.len(), "fetched calendar events");
        Ok(events)
    }

    /// Meetings attended on the UTC day `day`.
    pub async fn meetings_for(&self, day: NaiveDate) -> Result<Vec<WorklogBlock>, CalendarError> {
        let events = self.events_for(day).await?;
        Ok(events_to_meetings(&events, &self.meeting_issue_key))
    }
}

/// `[day 00:00Z, day+1 00:00Z)`.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Converts the attended, timed events to meeting blocks.
pub fn events_to_meetings(events: &[Event], default_key: &IssueKey) -> Vec<WorklogBlock> {
    events
        .iter()
        .filter_map(|event| {
            let meeting = event.to_meeting(default_key);
            if meeting.is_none() {
                tracing::debug!(id = %event.id, summary = ?event.summary, "skipping calendar event");
            }
            meeting
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPage {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

/// A calendar event as returned by the events list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Start or end of an event. All-day events only carry `date`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<DateTime<FixedOffset>>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub response_status: Option<String>,
    #[serde(rename = "self", default)]
    pub is_self: bool,
}

impl Event {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Whether the calendar owner declined the invitation.
    pub fn is_declined(&self) -> bool {
        self.attendees
            .iter()
            .any(|a| a.is_self && a.response_status.as_deref() == Some("declined"))
    }

    /// Timed span of the event, if both ends carry a time.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start.as_ref()?.date_time?;
        let end = self.end.as_ref()?.date_time?;
        Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    /// Issue to book the meeting on: `[KEY-1]` from the description, else
    /// `default_key`.
    pub fn issue_key(&self, default_key: &IssueKey) -> IssueKey {
        self.description
            .as_deref()
            .and_then(issue_key_from_description)
            .unwrap_or_else(|| default_key.clone())
    }

    /// The meeting block, unless the event is cancelled, declined, all-day
    /// or spans no time.
    pub fn to_meeting(&self, default_key: &IssueKey) -> Option<WorklogBlock> {
        if self.is_cancelled() || self.is_declined() {
            return None;
        }
        let (start, end) = self.span()?;
        WorklogBlock::between(self.issue_key(default_key), start, end).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_key() -> IssueKey {
        IssueKey::new("MEETING").unwrap()
    }

    fn parse(json: &str) -> Vec<Event> {
        serde_json::from_str::<EventPage>(json).unwrap().items
    }

    fn summary(blocks: &[WorklogBlock]) -> Vec<(String, String, i64)> {
        blocks
            .iter()
            .map(|b| {
                (
                    b.issue_key.to_string(),
                    b.start.format("%H:%M").to_string(),
                    b.duration_seconds,
                )
            })
            .collect()
    }

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2025, 5, 18).unwrap());
        assert_eq!(start.to_rfc3339(), "2025-05-18T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-05-19T00:00:00+00:00");
    }

    #[test]
    fn converts_timed_events_to_meetings() {
        let events = parse(
            r#"{
                "items": [
                    {
                        "id": "standup",
                        "summary": "Standup",
                        "start": {"dateTime": "2025-05-18T11:30:00+02:00"},
                        "end": {"dateTime": "2025-05-18T11:45:00+02:00"}
                    },
                    {
                        "id": "review",
                        "summary": "Review",
                        "description": "<p>Demo of <b>[WEB-311]</b></p>",
                        "start": {"dateTime": "2025-05-18T14:00:00Z"},
                        "end": {"dateTime": "2025-05-18T15:00:00Z"}
                    }
                ],
                "nextPageToken": null
            }"#,
        );

        let meetings = events_to_meetings(&events, &meeting_key());
        assert_eq!(
            summary(&meetings),
            vec![
                ("MEETING".to_string(), "09:30".to_string(), 900),
                ("WEB-311".to_string(), "14:00".to_string(), 3600),
            ]
        );
    }

    #[test]
    fn skips_unattended_and_untimed_events() {
        let events = parse(
            r#"{
                "items": [
                    {
                        "id": "cancelled",
                        "status": "cancelled",
                        "start": {"dateTime": "2025-05-18T09:00:00Z"},
                        "end": {"dateTime": "2025-05-18T10:00:00Z"}
                    },
                    {
                        "id": "declined",
                        "start": {"dateTime": "2025-05-18T09:00:00Z"},
                        "end": {"dateTime": "2025-05-18T10:00:00Z"},
                        "attendees": [
                            {"email": "boss@example.com", "responseStatus": "accepted"},
                            {"email": "me@example.com", "responseStatus": "declined", "self": true}
                        ]
                    },
                    {
                        "id": "all-day",
                        "start": {"date": "2025-05-18"},
                        "end": {"date": "2025-05-19"}
                    },
                    {
                        "id": "no-end",
                        "start": {"dateTime": "2025-05-18T09:00:00Z"}
                    },
                    {
                        "id": "zero",
                        "start": {"dateTime": "2025-05-18T09:00:00Z"},
                        "end": {"dateTime": "2025-05-18T09:00:00Z"}
                    }
                ]
            }"#,
        );

        assert!(events_to_meetings(&events, &meeting_key()).is_empty());
    }

    #[test]
    fn someone_else_declining_does_not_matter() {
        let events = parse(
            r#"{
                "items": [{
                    "id": "sync",
                    "start": {"dateTime": "2025-05-18T09:00:00Z"},
                    "end": {"dateTime": "2025-05-18T09:30:00Z"},
                    "attendees": [
                        {"email": "other@example.com", "responseStatus": "declined"},
                        {"email": "me@example.com", "responseStatus": "accepted", "self": true}
                    ]
                }]
            }"#,
        );

        assert_eq!(events_to_meetings(&events, &meeting_key()).len(), 1);
    }

    #[test]
    fn empty_page_has_no_items() {
        assert!(parse("{}").is_empty());
    }

    #[test]
    fn client_validates_and_redacts() {
        assert!(matches!(
            Client::new(" ", "primary", meeting_key()),
            Err(CalendarError::InvalidConfig { .. })
        ));
        assert!(Client::new("token", "", meeting_key()).is_err());

        let client = Client::new("ya29.secret", "primary", meeting_key()).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
