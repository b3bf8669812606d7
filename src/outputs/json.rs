//! JSON output generation for the API.
//!
//! This module serializes the aggregated board to JSON for consumption by
//! the event-listing site.
//!
//! # Output Structure
//!
//! Files are organized by generation date:
//! ```text
//! json_output_dir/
//! └── 2026-08-06/
//!     └── events.json
//! ```

use crate::models::EventBoard;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write an [`EventBoard`] to a JSON file with date-based directory structure.
///
/// Creates the necessary directory structure and writes the serialized board.
///
/// # Output Path
///
/// The file is written to: `{json_output_dir}/{date}/events.json`
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_board(
    board: &EventBoard,
    json_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string(board)?;

    let full_json_dir = format!("{}/{}", json_output_dir, board.local_date);

    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_json_filename = format!("{full_json_dir}/events.json");

    info!(path = %output_json_filename, "Writing JSON");
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename, "Wrote JSON API file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, ParsedEvent};

    fn board() -> EventBoard {
        EventBoard {
            local_date: "2026-08-06".to_string(),
            local_time: "09:15:00".to_string(),
            events: vec![ParsedEvent {
                id: "1".to_string(),
                title: "Jazz Night Concert".to_string(),
                date: "Aug 7, 2026".to_string(),
                time: "8:00 PM".to_string(),
                end_time: None,
                location: "SOhO, Santa Barbara".to_string(),
                category: EventCategory::Music,
                description: "Live jazz.".to_string(),
                url: None,
                image_url: None,
                calendar_source: None,
                is_free: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_write_board_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();

        write_board(&board(), out).await.unwrap();

        let path = dir.path().join("2026-08-06").join("events.json");
        let written = std::fs::read_to_string(path).unwrap();
        let parsed: EventBoard = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].title, "Jazz Night Concert");
    }
}
