//! Remote calendar service.
//!
//! [`CalendarService`] is the seam to the external calendar; the free
//! functions turn its results into local [`CalendarEvent`]s and typed
//! [`RemoteOutcome`]s so callers can tell "nothing scheduled" from "the
//! account needs re-consent" from "the service is down".

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CalendarEvent;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const UNTITLED: &str = "(no title)";
const MAX_PAGES: usize = 10;

/// Signed-in calendar account.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    pub email: String,
    pub access_token: String,
}

impl AccountHandle {
    pub fn new(email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_token: access_token.into(),
        }
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `days` either side of `now`.
    pub fn around(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now + Duration::days(days),
        }
    }
}

/// An event as the remote service reports it. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteEvent {
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// An event to create on the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRemoteEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The account's grant is missing, expired or revoked.
    #[error("Calendar authorization required")]
    Unauthorized,

    #[error("Calendar service unavailable: {0}")]
    Unavailable(String),
}

/// Result of a remote call as presented to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    Ready(T),
    /// The call succeeded but returned nothing usable.
    Empty,
    /// The user must re-consent before the call can succeed.
    NeedsReauthorization,
    Unavailable(String),
}

impl<T> From<RemoteError> for RemoteOutcome<T> {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Unauthorized => RemoteOutcome::NeedsReauthorization,
            RemoteError::Unavailable(reason) => RemoteOutcome::Unavailable(reason),
        }
    }
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list_events(
        &self,
        account: &AccountHandle,
        window: &TimeWindow,
    ) -> Result<Vec<RemoteEvent>, RemoteError>;

    async fn insert_event(
        &self,
        account: &AccountHandle,
        event: &NewRemoteEvent,
    ) -> Result<(), RemoteError>;
}

/// Fetches the account's events in `window` as local rows for `user_id`.
///
/// Timestamps are stored in UTC. Items without both a parseable start and
/// end timestamp are dropped.
pub async fn fetch_remote_events<S>(
    service: &S,
    account: &AccountHandle,
    window: &TimeWindow,
    user_id: i64,
) -> RemoteOutcome<Vec<CalendarEvent>>
where
    S: CalendarService + ?Sized,
{
    let remote = match service.list_events(account, window).await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::warn!("Failed to list remote events for {}: {}", account.email, e);
            return e.into();
        }
    };

    let total = remote.len();
    let events: Vec<CalendarEvent> = remote
        .into_iter()
        .filter_map(|item| to_local(item, user_id))
        .collect();
    if events.len() < total {
        tracing::debug!(
            "Dropped {} remote event(s) without a usable start or end",
            total - events.len()
        );
    }

    if events.is_empty() {
        RemoteOutcome::Empty
    } else {
        RemoteOutcome::Ready(events)
    }
}

/// Creates an event on the account's remote calendar.
pub async fn insert_remote_event<S>(
    service: &S,
    account: &AccountHandle,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RemoteOutcome<()>
where
    S: CalendarService + ?Sized,
{
    let event = NewRemoteEvent {
        summary: title.to_string(),
        start,
        end,
    };
    match service.insert_event(account, &event).await {
        Ok(()) => RemoteOutcome::Ready(()),
        Err(e) => {
            tracing::warn!("Failed to insert remote event for {}: {}", account.email, e);
            e.into()
        }
    }
}

fn to_local(item: RemoteEvent, user_id: i64) -> Option<CalendarEvent> {
    let start = normalize_timestamp(item.start.as_deref())?;
    let end = normalize_timestamp(item.end.as_deref())?;
    let summary = item
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    Some(CalendarEvent::new(user_id, summary, start, end))
}

/// Rewrites an RFC 3339 timestamp in UTC so stored events order and filter
/// by instant. Unparseable values yield `None`.
fn normalize_timestamp(value: Option<&str>) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(value?.trim()).ok()?;
    Some(parsed.with_timezone(&Utc).to_rfc3339())
}

// ============================================================================
// Google Calendar REST client
// ============================================================================

/// [`CalendarService`] backed by the Google Calendar v3 REST API, primary
/// calendar only.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<EventItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct EventItem {
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

/// All-day events only carry `date`; those count as having no timestamp.
#[derive(Deserialize, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Serialize)]
struct InsertBody<'a> {
    summary: &'a str,
    start: EventTime,
    end: EventTime,
}

impl From<EventItem> for RemoteEvent {
    fn from(item: EventItem) -> Self {
        RemoteEvent {
            summary: item.summary,
            start: item.start.and_then(|t| t.date_time),
            end: item.end.and_then(|t| t.date_time),
        }
    }
}

impl GoogleCalendarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn list_events(
        &self,
        account: &AccountHandle,
        window: &TimeWindow,
    ) -> Result<Vec<RemoteEvent>, RemoteError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self
                .http
                .get(self.events_url())
                .bearer_auth(&account.access_token)
                .query(&query)
                .send()
                .await
                .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
            check_status(response.status())?;

            let page: EventsPage = response
                .json()
                .await
                .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
            events.extend(page.items.into_iter().map(RemoteEvent::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(events),
            }
        }

        tracing::warn!("Stopped listing remote events after {} pages", MAX_PAGES);
        Ok(events)
    }

    async fn insert_event(
        &self,
        account: &AccountHandle,
        event: &NewRemoteEvent,
    ) -> Result<(), RemoteError> {
        let body = InsertBody {
            summary: &event.summary,
            start: EventTime {
                date_time: Some(event.start.to_rfc3339()),
                date: None,
            },
            end: EventTime {
                date_time: Some(event.end.to_rfc3339()),
                date: None,
            },
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&account.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> Result<(), RemoteError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
        s if s.is_success() => Ok(()),
        s => Err(RemoteError::Unavailable(format!("HTTP {}", s))),
    }
}
