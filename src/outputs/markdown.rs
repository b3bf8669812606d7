//! Markdown rendering of the aggregated board.
//!
//! The readable counterpart of the JSON output: one document per run,
//! events grouped into sections by category in classifier priority order.
//! Empty categories are omitted.

use crate::models::{EventBoard, ALL_CATEGORIES};
use std::fmt::Write;

/// Render an [`EventBoard`] as a Markdown document.
pub fn board_to_markdown(board: &EventBoard) -> String {
    let mut md = String::new();

    writeln!(md, "# Upcoming Events — {}\n", board.local_date).unwrap();
    writeln!(
        md,
        "_{} events from Simi Valley to Santa Barbara._\n",
        board.events.len()
    )
    .unwrap();

    for category in ALL_CATEGORIES {
        let in_category: Vec<_> = board
            .events
            .iter()
            .filter(|e| e.category == category)
            .collect();
        if in_category.is_empty() {
            continue;
        }

        writeln!(md, "## {}\n", category.label()).unwrap();

        for event in in_category {
            writeln!(md, "### {}\n", event.title).unwrap();
            writeln!(md, "- **When:** {}, {}", event.date, event.time).unwrap();
            writeln!(md, "- **Where:** {}", event.location).unwrap();
            if let Some(source) = &event.calendar_source {
                writeln!(md, "- **Source:** {source}").unwrap();
            }
            if let Some(url) = &event.url {
                writeln!(md, "- [More info]({url})").unwrap();
            }
            if !event.description.is_empty() {
                writeln!(md, "\n{}", event.description).unwrap();
            }
            writeln!(md).unwrap();
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, ParsedEvent};

    fn event(title: &str, category: EventCategory) -> ParsedEvent {
        ParsedEvent {
            id: title.to_string(),
            title: title.to_string(),
            date: "Aug 7, 2026".to_string(),
            time: "8:00 PM".to_string(),
            end_time: None,
            location: "Ojai".to_string(),
            category,
            description: "Details to follow.".to_string(),
            url: Some("https://example.com".to_string()),
            image_url: None,
            calendar_source: None,
            is_free: None,
        }
    }

    fn board(events: Vec<ParsedEvent>) -> EventBoard {
        EventBoard {
            local_date: "2026-08-06".to_string(),
            local_time: "09:15:00".to_string(),
            events,
        }
    }

    #[test]
    fn test_renders_header_and_count() {
        let md = board_to_markdown(&board(vec![
            event("Open Mic", EventCategory::Music),
            event("Chili Cookoff", EventCategory::Food),
        ]));
        assert!(md.starts_with("# Upcoming Events — 2026-08-06"));
        assert!(md.contains("_2 events"));
    }

    #[test]
    fn test_groups_by_category_in_priority_order() {
        let md = board_to_markdown(&board(vec![
            event("Chili Cookoff", EventCategory::Food),
            event("Open Mic", EventCategory::Music),
        ]));
        let music = md.find("## Music").unwrap();
        let food = md.find("## Food & Dining").unwrap();
        assert!(music < food);
        assert!(md.contains("### Open Mic"));
        assert!(md.contains("- **When:** Aug 7, 2026, 8:00 PM"));
        assert!(md.contains("- [More info](https://example.com)"));
    }

    #[test]
    fn test_empty_categories_omitted() {
        let md = board_to_markdown(&board(vec![event("Open Mic", EventCategory::Music)]));
        assert!(md.contains("## Music"));
        assert!(!md.contains("## Sports"));
        assert!(!md.contains("## Other"));
    }
}
