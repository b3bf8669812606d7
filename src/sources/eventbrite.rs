//! Eventbrite regional search source.
//!
//! Issues one search request per city in the covered region against the
//! [Eventbrite API](https://www.eventbriteapi.com/v3/events/search/) and
//! normalizes the results. The API filters by date window server-side, so
//! unlike the calendar source there is no client-side past-event check.
//!
//! A failed city — non-success status, network error, undecodable body —
//! is logged and skipped; the other cities are unaffected.

use crate::models::{EventCategory, ParsedEvent};
use crate::utils::{format_display_date, format_display_time, truncate_description};
use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Production API base; tests point this at a local mock server.
pub const API_BASE: &str = "https://www.eventbriteapi.com/v3";

/// Cities in the region from Simi Valley to Santa Barbara.
pub const REGION_CITIES: [&str; 13] = [
    "Simi Valley",
    "Thousand Oaks",
    "Moorpark",
    "Camarillo",
    "Oxnard",
    "Ventura",
    "Ojai",
    "Santa Paula",
    "Fillmore",
    "Carpinteria",
    "Santa Barbara",
    "Goleta",
    "Montecito",
];

const SEARCH_RADIUS: &str = "15mi";
const PAGE_SIZE: &str = "50";
const CITY_FETCH_CONCURRENCY: usize = 4;

/// Timestamps in search results are local to the venue, without an offset.
const EVENTBRITE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(default)]
    name: Option<EventText>,
    #[serde(default)]
    description: Option<EventText>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    logo: Option<Logo>,
    #[serde(default)]
    venue: Option<Venue>,
    #[serde(default)]
    category: Option<NamedRef>,
    #[serde(default)]
    subcategory: Option<NamedRef>,
    #[serde(default)]
    is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct EventText {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(default)]
    local: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Logo {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Venue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<VenueAddress>,
}

#[derive(Debug, Deserialize)]
struct VenueAddress {
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

/// Fetch and normalize events for every city in [`REGION_CITIES`].
#[instrument(level = "info", skip_all)]
pub async fn fetch_events(token: &str) -> Vec<ParsedEvent> {
    fetch_events_from(API_BASE, token, &REGION_CITIES).await
}

/// Fetch against an explicit API base and city list.
///
/// City requests run concurrently and unordered; each failure is contained
/// to its own city.
pub async fn fetch_events_from(api_base: &str, token: &str, cities: &[&str]) -> Vec<ParsedEvent> {
    let client = reqwest::Client::new();

    let per_city: Vec<Vec<ParsedEvent>> = stream::iter(cities.iter().copied())
        .map(|city| {
            let client = client.clone();
            async move {
                match fetch_city(&client, api_base, token, city).await {
                    Ok(events) => {
                        debug!(%city, count = events.len(), "Fetched Eventbrite events");
                        events
                    }
                    Err(e) => {
                        warn!(error = %e, %city, "Eventbrite fetch failed; skipping city");
                        Vec::new()
                    }
                }
            }
        })
        .buffer_unordered(CITY_FETCH_CONCURRENCY)
        .collect()
        .await;

    let events: Vec<ParsedEvent> = per_city.into_iter().flatten().collect();
    info!(count = events.len(), "Fetched Eventbrite event listings");
    events
}

/// Fetch one city's search page and normalize each record.
#[instrument(level = "info", skip_all, fields(%city))]
async fn fetch_city(
    client: &reqwest::Client,
    api_base: &str,
    token: &str,
    city: &str,
) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
    let url = format!("{api_base}/events/search/");
    let response = client
        .get(&url)
        .query(&[
            ("location.address", city),
            ("location.within", SEARCH_RADIUS),
            ("expand", "venue,category,subcategory"),
            ("page_size", PAGE_SIZE),
            ("sort_by", "date"),
        ])
        .bearer_auth(token)
        .send()
        .await?;

    if !response.status().is_success() {
        warn!(%city, status = %response.status(), "Eventbrite returned non-success status; skipping city");
        return Ok(Vec::new());
    }

    let data: SearchResponse = response.json().await?;

    // Decode record-by-record so one malformed entry drops alone instead of
    // failing the whole page.
    let mut events = Vec::new();
    for raw in data.events {
        match serde_json::from_value::<RawEvent>(raw) {
            Ok(record) => {
                let id = record.id.clone();
                match normalize(record) {
                    Some(event) => events.push(event),
                    None => {
                        warn!(event_id = %id, %city, "Eventbrite record has no usable start time; dropping")
                    }
                }
            }
            Err(e) => warn!(error = %e, %city, "Skipping malformed Eventbrite record"),
        }
    }
    Ok(events)
}

/// Map one raw search record into a [`ParsedEvent`].
///
/// Returns `None` only when the record lacks a parseable start time; every
/// other missing field gets a fallback.
fn normalize(record: RawEvent) -> Option<ParsedEvent> {
    let start = parse_local_time(record.start.as_ref())?;
    let end = parse_local_time(record.end.as_ref());

    let title = record
        .name
        .and_then(|n| n.text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Event".to_string());

    let start_time = format_display_time(start);
    let (time, end_time) = match end {
        Some(end) => {
            let end_str = format_display_time(end);
            (format!("{start_time} - {end_str}"), Some(end_str))
        }
        None => (start_time, None),
    };

    let location = match record.venue {
        Some(venue) => match venue.name.filter(|n| !n.is_empty()) {
            Some(name) => match venue.address.and_then(|a| a.city) {
                Some(city) => format!("{name}, {city}"),
                None => name,
            },
            None => "Online Event".to_string(),
        },
        None => "Online Event".to_string(),
    };

    let category = category_from_metadata(
        record.category.and_then(|c| c.name).as_deref(),
        record.subcategory.and_then(|c| c.name).as_deref(),
    );

    let description = record
        .description
        .and_then(|d| d.text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title.clone());

    Some(ParsedEvent {
        id: record.id,
        date: format_display_date(start),
        time,
        end_time,
        title,
        location,
        category,
        description: truncate_description(&description),
        url: record.url,
        image_url: record.logo.and_then(|l| l.url),
        calendar_source: None,
        is_free: record.is_free,
    })
}

fn parse_local_time(time: Option<&EventTime>) -> Option<NaiveDateTime> {
    let local = time?.local.as_deref()?;
    NaiveDateTime::parse_from_str(local, EVENTBRITE_TIME_FORMAT).ok()
}

/// Category from Eventbrite's own taxonomy.
///
/// Search results carry expanded `category`/`subcategory` names, which beat
/// guessing from the title — the keyword groups here mirror how those names
/// read ("Music", "Food & Drink", "Arts & Culture", ...). Events whose
/// taxonomy matches nothing land in `Other`; the title text is not consulted.
fn category_from_metadata(category: Option<&str>, subcategory: Option<&str>) -> EventCategory {
    let cat = category.unwrap_or("").to_lowercase();
    let sub = subcategory.unwrap_or("").to_lowercase();

    if cat.contains("music") || sub.contains("music") {
        EventCategory::Music
    } else if cat.contains("food") || sub.contains("food") {
        EventCategory::Food
    } else if cat.contains("art") || cat.contains("culture") || sub.contains("art") {
        EventCategory::Arts
    } else if cat.contains("sport") || cat.contains("fitness") || sub.contains("sport") {
        EventCategory::Sports
    } else if cat.contains("business") || cat.contains("seminar") || cat.contains("workshop") {
        EventCategory::Workshop
    } else if cat.contains("community") || cat.contains("charity") || cat.contains("fundraiser") {
        EventCategory::Community
    } else {
        EventCategory::Other
    }
}
