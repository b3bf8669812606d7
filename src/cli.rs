//! Command-line interface definitions for Coast Events.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials can be provided via command-line flags or environment
//! variables; they are never hard-coded.

use clap::Parser;

/// Command-line arguments for the Coast Events application.
///
/// # Examples
///
/// ```sh
/// # Basic usage with required arguments
/// coast_events -j ./json -m ./markdown
///
/// # With credentials from flags instead of the environment
/// coast_events -j ./json -m ./markdown --google-api-key YOUR_KEY
///
/// # Only music events in the outputs
/// coast_events -j ./json -m ./markdown --category music
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON board file
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Output directory for the Markdown listing
    #[arg(short, long)]
    pub markdown_output_dir: String,

    /// Directory for cached state (last successful board)
    #[arg(short, long, default_value = "./state")]
    pub state_dir: String,

    /// Eventbrite API token
    #[arg(long, env = "EVENTBRITE_TOKEN")]
    pub eventbrite_token: Option<String>,

    /// Google Calendar API key (public, read-only)
    #[arg(long, env = "GOOGLE_API_KEY")]
    pub google_api_key: Option<String>,

    /// Restrict outputs to one category (music, food, arts, sports,
    /// workshop, community, other)
    #[arg(long)]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "coast_events",
            "--json-output-dir",
            "./json",
            "--markdown-output-dir",
            "./markdown",
        ]);

        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.markdown_output_dir, "./markdown");
        assert_eq!(cli.state_dir, "./state");
        assert!(cli.category.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&[
            "coast_events",
            "-j",
            "/tmp/json",
            "-m",
            "/tmp/markdown",
            "-s",
            "/tmp/state",
        ]);

        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.markdown_output_dir, "/tmp/markdown");
        assert_eq!(cli.state_dir, "/tmp/state");
    }

    #[test]
    fn test_cli_category_flag() {
        let cli = Cli::parse_from(&[
            "coast_events",
            "-j",
            "./json",
            "-m",
            "./markdown",
            "--category",
            "music",
        ]);

        assert_eq!(cli.category.as_deref(), Some("music"));
    }
}
