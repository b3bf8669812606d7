//! Event feed sources.
//!
//! This module contains submodules for fetching events from different
//! providers. Each source follows a consistent two-phase pattern:
//!
//! 1. **Fetching**: One HTTP request per source descriptor (a searched city,
//!    or a named public calendar)
//! 2. **Normalizing**: Map each raw record into a [`crate::models::ParsedEvent`]
//!
//! # Supported Sources
//!
//! | Source | Module | Descriptor | Notes |
//! |--------|--------|------------|-------|
//! | Eventbrite | [`eventbrite`] | City + radius | Server-side date filter; taxonomy-based category |
//! | Google Calendar | [`google_calendar`] | Calendar id + name | 3-month window; keyword-classified; past events dropped |
//!
//! # Common Patterns
//!
//! Each source module exports:
//! - `fetch_events(credential)`: Fetch every configured descriptor
//! - `fetch_events_from(api_base, credential, descriptors)`: Same, against
//!   an explicit base URL and descriptor list (used by tests)
//!
//! Sources use:
//! - Concurrent, unordered per-descriptor fetching with `futures::stream`
//! - Graceful error handling (a failed descriptor is logged and skipped)
//! - Per-record decoding so malformed entries drop without failing the batch

pub mod eventbrite;
pub mod google_calendar;
