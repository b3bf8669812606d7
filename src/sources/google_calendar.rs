//! Public Google Calendar source.
//!
//! Fetches upcoming entries from a fixed list of public calendars via the
//! [Calendar API](https://developers.google.com/calendar/api/v3/reference/events/list)
//! with a three-month window, `singleEvents=true` so recurring events arrive
//! pre-expanded, and a read-only API key.
//!
//! Unlike the search source, the calendar API hands back whatever the window
//! covers including events earlier today, so normalization drops records
//! whose start instant is already in the past. Calendar descriptions are
//! HTML fragments and get stripped before display.

use crate::classify::categorize;
use crate::models::ParsedEvent;
use crate::utils::{
    format_display_date, format_display_time, strip_html_tags, truncate_description,
};
use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Production API base; tests point this at a local mock server.
pub const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Known public calendars for the region: `(calendar id, display name)`.
pub const PUBLIC_CALENDARS: [(&str, &str); 1] =
    [("conejovalleyguide@gmail.com", "Ventura County Events")];

const MAX_RESULTS: &str = "250";
const WINDOW_MONTHS: u32 = 3;
const CALENDAR_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start: Option<EventDateTime>,
    #[serde(default)]
    end: Option<EventDateTime>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Fetch and normalize upcoming events from every calendar in
/// [`PUBLIC_CALENDARS`].
#[instrument(level = "info", skip_all)]
pub async fn fetch_events(api_key: &str) -> Vec<ParsedEvent> {
    fetch_events_from(API_BASE, api_key, &PUBLIC_CALENDARS).await
}

/// Fetch against an explicit API base and calendar list.
///
/// Calendar requests run concurrently and unordered; each failure is
/// contained to its own calendar.
pub async fn fetch_events_from(
    api_base: &str,
    api_key: &str,
    calendars: &[(&str, &str)],
) -> Vec<ParsedEvent> {
    let client = reqwest::Client::new();

    let per_calendar: Vec<Vec<ParsedEvent>> = stream::iter(calendars.iter().copied())
        .map(|(calendar_id, calendar_name)| {
            let client = client.clone();
            async move {
                match fetch_calendar(&client, api_base, api_key, calendar_id, calendar_name).await
                {
                    Ok(events) => {
                        debug!(calendar = %calendar_name, count = events.len(), "Fetched calendar events");
                        events
                    }
                    Err(e) => {
                        warn!(error = %e, calendar = %calendar_name, "Calendar fetch failed; skipping calendar");
                        Vec::new()
                    }
                }
            }
        })
        .buffer_unordered(CALENDAR_FETCH_CONCURRENCY)
        .collect()
        .await;

    let events: Vec<ParsedEvent> = per_calendar.into_iter().flatten().collect();
    info!(count = events.len(), "Fetched Google Calendar event listings");
    events
}

/// Fetch one calendar's window and normalize each record.
#[instrument(level = "info", skip_all, fields(calendar = %calendar_name))]
async fn fetch_calendar(
    client: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    calendar_id: &str,
    calendar_name: &str,
) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
    let now = Utc::now();
    let window_end = now + Months::new(WINDOW_MONTHS);

    let url = format!(
        "{api_base}/calendars/{}/events",
        urlencoding::encode(calendar_id)
    );
    let response = client
        .get(&url)
        .query(&[
            ("key", api_key),
            ("timeMin", &now.to_rfc3339()),
            ("timeMax", &window_end.to_rfc3339()),
            ("maxResults", MAX_RESULTS),
            ("orderBy", "startTime"),
            ("singleEvents", "true"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        warn!(
            calendar = %calendar_name,
            status = %response.status(),
            "Calendar API returned non-success status; skipping calendar"
        );
        return Ok(Vec::new());
    }

    let data: EventsResponse = response.json().await?;

    let mut events = Vec::new();
    for raw in data.items {
        match serde_json::from_value::<RawEvent>(raw) {
            Ok(record) => {
                if let Some(event) = normalize(record, calendar_name, now) {
                    events.push(event);
                }
            }
            Err(e) => warn!(error = %e, calendar = %calendar_name, "Skipping malformed calendar record"),
        }
    }
    Ok(events)
}

/// Map one raw calendar record into a [`ParsedEvent`].
///
/// Returns `None` when the record has no usable start (neither `dateTime`
/// nor `date` parses) or when its start instant is already behind `now`.
/// Everything else falls back rather than fails.
fn normalize(record: RawEvent, calendar_name: &str, now: DateTime<Utc>) -> Option<ParsedEvent> {
    let title = record
        .summary
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled Event".to_string());

    let description = record
        .description
        .map(|d| strip_html_tags(&d))
        .unwrap_or_default();

    let location = record
        .location
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "Location TBA".to_string());

    let (start, start_instant, is_all_day) = resolve_start(record.start.as_ref()?)?;

    // Skip past events
    if start_instant < now {
        return None;
    }

    let (time, end_time) = if is_all_day {
        ("All Day".to_string(), None)
    } else {
        let start_str = format_display_time(start);
        match record.end.as_ref().and_then(resolve_end) {
            Some(end) => {
                let end_str = format_display_time(end);
                (format!("{start_str} - {end_str}"), Some(end_str))
            }
            None => (start_str, None),
        }
    };

    let category = categorize(&title, &description);

    Some(ParsedEvent {
        id: record.id,
        date: format_display_date(start),
        time,
        end_time,
        location,
        category,
        description: truncate_description(&description),
        title,
        url: record.html_link,
        image_url: None,
        calendar_source: Some(calendar_name.to_string()),
        is_free: None,
    })
}

/// Resolve a start to `(wall time, UTC instant, is_all_day)`.
///
/// Timed entries carry an RFC 3339 `dateTime` with the calendar's offset;
/// the wall time in that offset is what gets displayed. All-day entries
/// carry a bare `date` and resolve to midnight UTC, which means an all-day
/// event dated today is already "past" — behavior inherited from the
/// consuming site and kept.
fn resolve_start(start: &EventDateTime) -> Option<(NaiveDateTime, DateTime<Utc>, bool)> {
    if let Some(date_time) = start.date_time.as_deref() {
        let parsed = DateTime::parse_from_rfc3339(date_time).ok()?;
        return Some((parsed.naive_local(), parsed.with_timezone(&Utc), false));
    }
    if let Some(date) = start.date.as_deref() {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let midnight = day.and_hms_opt(0, 0, 0)?;
        return Some((midnight, Utc.from_utc_datetime(&midnight), true));
    }
    None
}

fn resolve_end(end: &EventDateTime) -> Option<NaiveDateTime> {
    if let Some(date_time) = end.date_time.as_deref() {
        return DateTime::parse_from_rfc3339(date_time)
            .ok()
            .map(|dt| dt.naive_local());
    }
    end.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
