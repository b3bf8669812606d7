//! Keyword-based category classification for event text.
//!
//! Events arrive with no usable taxonomy from calendar feeds, so the category
//! tag is inferred from title and description text alone. Matching is
//! case-insensitive substring search against fixed keyword groups, evaluated
//! in a fixed priority order — the first group that matches wins, with no
//! scoring and no multi-label output. The order is a deliberate tie-break
//! policy: keeping it fixed keeps classification deterministic across runs.

use crate::models::EventCategory;
use once_cell::sync::Lazy;
use regex::Regex;

/// Keyword groups in priority order. First match wins.
static KEYWORD_GROUPS: Lazy<Vec<(EventCategory, Regex)>> = Lazy::new(|| {
    vec![
        (
            EventCategory::Music,
            Regex::new(r"(?i)music|concert|band|dj|festival|performance|sing").unwrap(),
        ),
        (
            EventCategory::Food,
            Regex::new(r"(?i)food|restaurant|dining|cuisine|chef|cooking|wine|beer|tasting|brew")
                .unwrap(),
        ),
        (
            EventCategory::Arts,
            Regex::new(
                r"(?i)art|gallery|museum|theater|theatre|film|movie|exhibition|paint|comedy|author|book",
            )
            .unwrap(),
        ),
        (
            EventCategory::Sports,
            Regex::new(r"(?i)sport|fitness|yoga|gym|run|bike|hike|athletic|game|tournament|defense")
                .unwrap(),
        ),
        (
            EventCategory::Workshop,
            Regex::new(r"(?i)workshop|seminar|class|training|learn|education|course").unwrap(),
        ),
        (
            EventCategory::Community,
            Regex::new(
                r"(?i)community|charity|volunteer|fundraiser|meeting|town hall|neighborhood|library|garden|president",
            )
            .unwrap(),
        ),
    ]
});

/// Infer a category from an event's title and description.
///
/// Matches are plain substrings, so short keywords fire inside longer words
/// ("run" inside "brunch"). That over-eagerness is accepted behavior; the
/// priority order bounds how wrong it can be.
pub fn categorize(title: &str, description: &str) -> EventCategory {
    let text = format!("{title} {description}");
    for (category, pattern) in KEYWORD_GROUPS.iter() {
        if pattern.is_match(&text) {
            return *category;
        }
    }
    EventCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concert_is_music() {
        assert_eq!(categorize("Jazz Night Concert", ""), EventCategory::Music);
    }

    #[test]
    fn test_town_hall_is_community() {
        assert_eq!(
            categorize("Town Hall Meeting", "community garden update"),
            EventCategory::Community
        );
    }

    #[test]
    fn test_first_matching_group_wins() {
        // Matches both music ("festival") and food ("wine"); music is
        // evaluated first.
        assert_eq!(
            categorize("Wine & Music Festival", ""),
            EventCategory::Music
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(categorize("YOGA IN THE PARK", ""), EventCategory::Sports);
        assert_eq!(categorize("cooking demo", ""), EventCategory::Food);
    }

    #[test]
    fn test_description_contributes() {
        assert_eq!(
            categorize("Saturday Social", "watercolor painting for beginners"),
            EventCategory::Arts
        );
    }

    #[test]
    fn test_no_match_defaults_to_other() {
        assert_eq!(categorize("Monthly Mixer", ""), EventCategory::Other);
        assert_eq!(categorize("", ""), EventCategory::Other);
    }

    #[test]
    fn test_substring_match_inside_longer_word() {
        // "run" fires inside "Brunch"; known over-eager match, kept as-is.
        assert_eq!(categorize("Sunday Brunch", ""), EventCategory::Sports);
    }

    #[test]
    fn test_workshop_keywords() {
        assert_eq!(
            categorize("Intro to Beekeeping", "a hands-on training course"),
            EventCategory::Workshop
        );
    }
}
