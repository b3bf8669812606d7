//! Merging per-source results into one deduplicated, date-ordered list.
//!
//! The two feed sources are fetched concurrently and independently — neither
//! blocks or cancels the other, and a failed source simply contributes
//! nothing. Their results are flattened into one list, deduplicated by
//! identity key (last write wins), and sorted ascending by display date.
//!
//! The sort key is the *re-parsed display date*, not the original instant:
//! two events on the same day keep their relative input order no matter what
//! their start times are. Inherited behavior, kept deliberately.

use crate::models::ParsedEvent;
use crate::sources::{eventbrite, google_calendar};
use crate::utils::parse_display_date;
use chrono::NaiveDate;
use itertools::Itertools;
use std::error::Error;
use tracing::{info, instrument, warn};

/// Credentials for the configured sources. A source without a credential is
/// skipped with a warning rather than queried anonymously.
#[derive(Debug, Clone, Default)]
pub struct FeedConfig {
    pub eventbrite_token: Option<String>,
    pub google_api_key: Option<String>,
}

/// Fetch every configured source and aggregate the results.
///
/// Errors only when no source is configured at all; individual source
/// failures are contained inside the source modules and surface here as
/// empty slices.
#[instrument(level = "info", skip_all)]
pub async fn collect_events(config: &FeedConfig) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
    if config.eventbrite_token.is_none() && config.google_api_key.is_none() {
        return Err("no event sources configured (set an Eventbrite token or a Google API key)".into());
    }

    let eventbrite = async {
        match &config.eventbrite_token {
            Some(token) => eventbrite::fetch_events(token).await,
            None => {
                warn!("No Eventbrite token configured; skipping source");
                Vec::new()
            }
        }
    };
    let google = async {
        match &config.google_api_key {
            Some(key) => google_calendar::fetch_events(key).await,
            None => {
                warn!("No Google API key configured; skipping source");
                Vec::new()
            }
        }
    };

    let (eventbrite_events, google_events) = tokio::join!(eventbrite, google);
    info!(
        eventbrite = eventbrite_events.len(),
        google_calendar = google_events.len(),
        "Collected per-source results"
    );

    Ok(merge(vec![eventbrite_events, google_events]))
}

/// Flatten per-source lists, dedup by identity key, sort by display date.
pub fn merge(per_source: Vec<Vec<ParsedEvent>>) -> Vec<ParsedEvent> {
    let merged: Vec<ParsedEvent> = per_source.into_iter().flatten().collect();
    let total = merged.len();

    // Walk in reverse so unique_by keeps the last occurrence of each key.
    let mut events: Vec<ParsedEvent> = merged
        .into_iter()
        .rev()
        .unique_by(|e| e.identity_key())
        .collect();
    events.reverse();

    let dropped = total - events.len();
    if dropped > 0 {
        info!(dropped, "Removed duplicate events");
    }

    // Unparsable display dates sort to the end; stable sort keeps same-day
    // input order.
    events.sort_by_key(|e| parse_display_date(&e.date).unwrap_or(NaiveDate::MAX));
    events
}
