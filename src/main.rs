//! # Coast Events
//!
//! An event-discovery aggregation pipeline that fetches public event
//! listings from third-party APIs, normalizes them into a common shape,
//! and outputs a filterable JSON board plus a Markdown listing.
//!
//! ## Features
//!
//! - Fetches events from multiple sources (Eventbrite city search across the
//!   Simi Valley – Santa Barbara region, public Google Calendars)
//! - Normalizes heterogeneous feed records into one `ParsedEvent` shape
//! - Infers a coarse category per event via keyword matching
//! - Deduplicates by identity key and sorts ascending by display date
//! - Caches the aggregated result with a 30-minute freshness window and
//!   bounded retries, persisting the last good board between runs
//!
//! ## Usage
//!
//! ```sh
//! coast_events -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: One request per source descriptor, independent and unordered
//! 2. **Normalizing**: Per-record mapping with skip-and-continue error handling
//! 3. **Aggregating**: Merge, dedup, sort (rebuilt in full each refresh)
//! 4. **Output**: Write the JSON board and Markdown listing

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod aggregate;
mod classify;
mod cli;
mod models;
mod outputs;
mod query;
mod sources;
mod storage;
mod utils;

use aggregate::FeedConfig;
use cli::Cli;
use models::{EventBoard, EventCategory, ALL_CATEGORIES};
use query::{CachedEvents, FeedAggregator};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("coast_events starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.markdown_output_dir, ?args.state_dir, "Parsed CLI arguments");

    // Early check: ensure output dirs are writable
    for dir in [&args.json_output_dir, &args.markdown_output_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let category_filter = match args.category.as_deref() {
        Some(raw) => match raw.parse::<EventCategory>() {
            Ok(category) => Some(category),
            Err(e) => {
                warn!(%e, "Ignoring unknown category filter; showing all events");
                None
            }
        },
        None => None,
    };

    // ---- Aggregate through the cache ----
    let store = storage::open_store(&args.state_dir);
    let feeds = FeedAggregator::new(FeedConfig {
        eventbrite_token: args.eventbrite_token.clone(),
        google_api_key: args.google_api_key.clone(),
    });
    let cache = CachedEvents::new(feeds, store);

    let persisted = cache.peek();
    debug!(
        persisted_events = persisted.data.as_ref().map(|d| d.len()).unwrap_or(0),
        "Cache state before refresh"
    );

    let snapshot = cache.events().await;
    if let Some(query_error) = &snapshot.error {
        error!(error = %query_error, "Event aggregation failed");
    }
    let Some(events) = snapshot.data else {
        error!("No event data available and no persisted board to fall back on");
        return Err("failed to load events".into());
    };

    for category in ALL_CATEGORIES {
        let count = events.iter().filter(|e| e.category == category).count();
        if count > 0 {
            debug!(category = %category, count, "Category count");
        }
    }

    let shown: Vec<_> = match category_filter {
        Some(category) => events
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect(),
        None => events.as_ref().clone(),
    };
    info!(
        total = events.len(),
        shown = shown.len(),
        "Aggregated events ready"
    );

    // ---- Build the board ----
    let local_date = Local::now().date_naive().to_string();
    let local_time = Local::now().time().to_string();
    let board = EventBoard {
        local_date,
        local_time,
        events: shown,
    };
    info!(local_date = %board.local_date, local_time = %board.local_time, count = board.events.len(), "EventBoard initialized");

    // ---- JSON output ----
    if let Err(e) = outputs::json::write_board(&board, &args.json_output_dir).await {
        error!(error = %e, "Failed to write JSON board");
    }

    // ---- Markdown output ----
    let md = outputs::markdown::board_to_markdown(&board);
    let output_markdown_filename = format!(
        "{}/{}_events.md",
        args.markdown_output_dir, board.local_date
    );

    info!(path = %output_markdown_filename, "Writing Markdown");
    if let Err(e) = tokio::fs::write(&output_markdown_filename, md).await {
        error!(path = %output_markdown_filename, error = %e, "Failed writing Markdown");
    } else {
        info!(path = %output_markdown_filename, "Wrote event listing Markdown");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
