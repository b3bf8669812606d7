//! Utility functions for text cleanup, display formatting, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - HTML tag stripping and whitespace collapsing for free-text descriptions
//! - Description truncation to the display bound
//! - Display date/time formatting and display-date re-parsing
//! - String truncation for logging
//! - File system validation for output directories

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Maximum length (in characters) of an event description kept for display.
pub const MAX_DESCRIPTION_LEN: usize = 300;

/// Display format for event dates, e.g. `Aug 6, 2026`.
///
/// The aggregator re-parses this exact format when sorting, so formatting and
/// parsing must stay in lockstep.
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// Display format for event times, e.g. `7:00 PM`.
pub const DISPLAY_TIME_FORMAT: &str = "%-I:%M %p";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip HTML tags from a description and collapse whitespace.
///
/// Calendar feeds deliver descriptions as HTML fragments. Tags are replaced
/// with a space (so adjacent words don't fuse), runs of whitespace collapse
/// to one space, and the result is trimmed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html_tags("<p>Live  <b>music</b></p>"), "Live music");
/// ```
pub fn strip_html_tags(html: &str) -> String {
    let no_tags = TAG_RE.replace_all(html, " ");
    WHITESPACE_RE.replace_all(&no_tags, " ").trim().to_string()
}

/// Truncate a description to [`MAX_DESCRIPTION_LEN`] characters.
///
/// Counts characters rather than bytes so multi-byte text never splits in
/// the middle of a code point. Stripping happens before truncation, so the
/// result can never end in a partial HTML tag.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_LEN {
        text.to_string()
    } else {
        text.chars().take(MAX_DESCRIPTION_LEN).collect()
    }
}

/// Format a start instant into the display date string, e.g. `Aug 6, 2026`.
pub fn format_display_date(start: NaiveDateTime) -> String {
    start.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Format an instant into the display time string, e.g. `7:00 PM`.
pub fn format_display_time(instant: NaiveDateTime) -> String {
    instant.format(DISPLAY_TIME_FORMAT).to_string()
}

/// Parse a display date string back into a calendar date.
///
/// The aggregator sorts on this re-parsed value. Because the display string
/// carries no time component, same-day events keep their relative input
/// order rather than sorting by start time.
pub fn parse_display_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DISPLAY_DATE_FORMAT).ok()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file. The same probe backs the
/// storage-variant selection in [`crate::storage`].
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    #[test]
    fn test_strip_html_tags_removes_markup() {
        assert_eq!(
            strip_html_tags("<p>Join us for <b>live music</b> &amp; fun</p>"),
            "Join us for live music &amp; fun"
        );
    }

    #[test]
    fn test_strip_html_tags_collapses_whitespace() {
        assert_eq!(
            strip_html_tags("Line one\n\n   Line two\t<br/>end"),
            "Line one Line two end"
        );
    }

    #[test]
    fn test_strip_html_tags_plain_text_untouched() {
        assert_eq!(strip_html_tags("no markup here"), "no markup here");
    }

    #[test]
    fn test_truncate_description_short_string() {
        assert_eq!(truncate_description("short"), "short");
    }

    #[test]
    fn test_truncate_description_bounds_long_text() {
        let long = "a".repeat(500);
        let result = truncate_description(&long);
        assert_eq!(result.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn test_truncate_description_no_partial_tag() {
        // 295 chars of text followed by markup: stripping happens first, so
        // the truncated output can never cut through a tag.
        let text = format!("{}<a href=\"https://example.com\">link</a>", "x".repeat(295));
        let result = truncate_description(&strip_html_tags(&text));
        assert!(!result.contains('<'));
        assert!(result.chars().count() <= MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn test_truncate_description_multibyte_boundary() {
        let long = "é".repeat(400);
        let result = truncate_description(&long);
        assert_eq!(result.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn test_format_display_date() {
        assert_eq!(format_display_date(at(2026, 8, 6, 19, 0)), "Aug 6, 2026");
        assert_eq!(format_display_date(at(2026, 12, 25, 0, 0)), "Dec 25, 2026");
    }

    #[test]
    fn test_format_display_time() {
        assert_eq!(format_display_time(at(2026, 8, 6, 19, 30)), "7:30 PM");
        assert_eq!(format_display_time(at(2026, 8, 6, 9, 5)), "9:05 AM");
        assert_eq!(format_display_time(at(2026, 8, 6, 0, 0)), "12:00 AM");
    }

    #[test]
    fn test_parse_display_date_round_trip() {
        let start = at(2026, 8, 6, 19, 0);
        let display = format_display_date(start);
        assert_eq!(parse_display_date(&display), Some(start.date()));
    }

    #[test]
    fn test_parse_display_date_rejects_garbage() {
        assert_eq!(parse_display_date("someday soon"), None);
        assert_eq!(parse_display_date(""), None);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }
}
