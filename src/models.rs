//! Data models for normalized events and the aggregated output board.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ParsedEvent`]: A single event after source-specific normalization
//! - [`EventCategory`]: The closed set of category tags events are filed under
//! - [`EventBoard`]: Collection of aggregated events for a single run
//!
//! Event fields serialize in camelCase to match the JSON shape the consuming
//! site expects, done via `serde(rename_all)` rather than non-snake-case
//! field names.

use serde::{Deserialize, Serialize};

/// The closed set of categories an event can be filed under.
///
/// Every event carries exactly one of these tags — there is no multi-label
/// classification and no "unset" state; events that match no keyword group
/// land in [`EventCategory::Other`].
///
/// Serialized as the lowercase tag (`"music"`, `"food"`, ...) used by the
/// consuming site and the `--category` CLI filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Music,
    Food,
    Arts,
    Sports,
    Workshop,
    Community,
    Other,
}

/// Classifier priority order; also the section order of the Markdown listing.
pub const ALL_CATEGORIES: [EventCategory; 7] = [
    EventCategory::Music,
    EventCategory::Food,
    EventCategory::Arts,
    EventCategory::Sports,
    EventCategory::Workshop,
    EventCategory::Community,
    EventCategory::Other,
];

impl EventCategory {
    /// The lowercase tag used on the wire and in CLI flags.
    pub fn tag(&self) -> &'static str {
        match self {
            EventCategory::Music => "music",
            EventCategory::Food => "food",
            EventCategory::Arts => "arts",
            EventCategory::Sports => "sports",
            EventCategory::Workshop => "workshop",
            EventCategory::Community => "community",
            EventCategory::Other => "other",
        }
    }

    /// Human-readable label for headings and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Music => "Music",
            EventCategory::Food => "Food & Dining",
            EventCategory::Arts => "Arts & Culture",
            EventCategory::Sports => "Sports",
            EventCategory::Workshop => "Workshops",
            EventCategory::Community => "Community",
            EventCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "music" => Ok(EventCategory::Music),
            "food" => Ok(EventCategory::Food),
            "arts" => Ok(EventCategory::Arts),
            "sports" => Ok(EventCategory::Sports),
            "workshop" => Ok(EventCategory::Workshop),
            "community" => Ok(EventCategory::Community),
            "other" => Ok(EventCategory::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A single event normalized out of a source-specific record.
///
/// This is the unifying shape both feeds map into. Display-oriented fields
/// (`date`, `time`) are preformatted strings — the consuming layer renders
/// them verbatim — while optional metadata keeps whatever the source had.
///
/// # Invariants
///
/// * `date` and `time` are always non-empty display strings
/// * `location` falls back to a sentinel ("Online Event" / "Location TBA"),
///   never an empty string
/// * `description` is plain text, at most [`crate::utils::MAX_DESCRIPTION_LEN`]
///   characters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEvent {
    /// Stable identifier from the source API.
    pub id: String,
    /// Display title; `"Untitled Event"` when the source record had none.
    pub title: String,
    /// Display date, e.g. `"Aug 6, 2026"`.
    pub date: String,
    /// Display time: a range (`"7:00 PM - 9:00 PM"`), a single start time,
    /// or `"All Day"`.
    pub time: String,
    /// Formatted end time when the source supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Venue name plus city, or a sentinel when no physical location exists.
    pub location: String,
    /// Category tag, always exactly one of the closed set.
    pub category: EventCategory,
    /// Plain-text description, HTML-stripped and bounded for display.
    pub description: String,
    /// Deep link back to the source event page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Promotional image, when the source had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Display name of the calendar the event came from (calendar feeds only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_source: Option<String>,
    /// Free-admission flag (Eventbrite only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free: Option<bool>,
}

impl ParsedEvent {
    /// The key the aggregator deduplicates on.
    ///
    /// Events with a stable external id use it directly. Calendar-feed events
    /// use `"{title}-{date}"` instead: calendar APIs expand recurring events
    /// into instances with per-instance ids, so the composite is what
    /// collapses repeats. Two distinct events sharing a title and a day
    /// collapse too — a documented limitation of the composite key.
    pub fn identity_key(&self) -> String {
        if self.calendar_source.is_some() {
            format!("{}-{}", self.title, self.date)
        } else {
            self.id.clone()
        }
    }
}

/// The aggregated output of a single run.
///
/// Each execution produces one `EventBoard`, serialized to JSON for API
/// consumption and rendered to Markdown for reading. The board is rebuilt
/// from scratch on every refresh; it is never merged incrementally.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventBoard {
    /// The date of generation in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The exact local time of generation.
    pub local_time: String,
    /// Deduplicated events, ascending by display date.
    pub events: Vec<ParsedEvent>,
}
