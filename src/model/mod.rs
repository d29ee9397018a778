//! Core data models for search aggregation and reprocessing.
//!
//! These types are OUR types - source adapters convert whatever their
//! site returns into them, and everything above the adapter boundary
//! speaks only these.
//!
//! # Database Schema
//!
//! [`SearchReprocess`] maps to the `search_reprocess` table (see the
//! crate migrations); everything else lives in memory or in the result
//! cache.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Delimiter between the artist block and the title in free-text queries.
const ARTISTS_TITLE_DELIMITER: &str = " - ";

/// A canonical (artists, title) pair.
///
/// Neither field is ever absent; the empty string stands for
/// "unparseable input". Immutable by convention - build a new value
/// instead of mutating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistsTitle {
    pub artists: String,
    pub title: String,
}

impl ArtistsTitle {
    /// Build from already-separated parts.
    pub fn of(artists: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artists: artists.into(),
            title: title.into(),
        }
    }

    /// Parse a free-text query on the first `" - "` delimiter.
    ///
    /// `"Sync 24 - Acid Tabs"` becomes `("Sync 24", "Acid Tabs")`.
    /// Text without the delimiter parses as a bare title with empty
    /// artists; callers rank against whatever survived parsing.
    pub fn parse(text: &str) -> Self {
        match text.split_once(ARTISTS_TITLE_DELIMITER) {
            Some((artists, title)) => Self::of(artists.trim(), title.trim()),
            None => Self::of("", text.trim()),
        }
    }

    /// True when both parts are empty (nothing usable was parsed).
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.title.is_empty()
    }
}

impl fmt::Display for ArtistsTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.artists.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{}{}{}", self.artists, ARTISTS_TITLE_DELIMITER, self.title)
        }
    }
}

/// A candidate search hit produced by a source adapter.
///
/// Immutable once scored; the only post-aggregation mutation is the
/// thumbnail enrichment applied by the facades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Parsed artist/title pair
    pub artists_title: ArtistsTitle,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Bit rate in kbit/s, when the source reports one
    pub bit_rate_kbps: Option<i16>,
    /// Artwork URL, when known
    pub thumbnail_url: Option<String>,
    /// Approximate file size in megabytes
    pub size_mb: Option<f64>,
    /// Which adapter produced this hit (see `SearchSource::resource_name`)
    pub resource_name: String,
    /// Opaque adapter-specific locator, prefixed by the resource name
    pub uri: String,
}

impl TrackMetadata {
    /// The resource-name prefix of [`Self::uri`], used to route a
    /// candidate back to the adapter that can materialize it.
    pub fn resource_from_uri(&self) -> &str {
        self.uri.split(':').next().unwrap_or_default()
    }
}

/// Input to the search and download facades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query, usually `"Artists - Title"`
    pub text: String,
    /// Look up artwork concurrently with the source fan-out
    pub fetch_artwork: bool,
    /// Ask sources to pre-filter on the parsed artist/title
    pub filter_by_artist_title: bool,
    /// Accept low-quality encodings
    pub low_quality: bool,
}

impl SearchQuery {
    /// A query with the default flags (artwork and filtering on).
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fetch_artwork: true,
            filter_by_artist_title: true,
            low_quality: false,
        }
    }

    /// Same query without the artwork lookup.
    pub fn without_artwork(mut self) -> Self {
        self.fetch_artwork = false;
        self
    }
}

/// A materialized download, as far as this crate models it.
///
/// Byte transfer and transcoding happen inside download adapters; the
/// engine only sees the resulting metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub metadata: TrackMetadata,
    /// Final artwork URL (lookup result or the candidate's thumbnail)
    pub artwork_url: Option<String>,
}

/// Lifecycle of a persisted search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReprocessStatus {
    /// No acceptable candidate yet; eligible for the next sweep
    NotFound,
    /// A candidate is cached and ready to download
    Found,
    /// The cached candidate was materialized and persisted
    Downloaded,
}

/// A persisted search request tracked through retries.
///
/// Status transitions are owned exclusively by
/// [`crate::reprocess::ReprocessService`]; see its docs for the state
/// machine.
#[derive(Debug, Clone, FromRow)]
pub struct SearchReprocess {
    /// Database ID (auto-generated)
    pub id: i64,
    /// The user's original query text
    pub search_query: String,
    /// Owning user
    pub user_id: i64,
    /// Collection the eventual track should land in
    pub collection_id: Option<i64>,
    /// Comma-joined genre tags (set-typed at the API boundary)
    pub genres: String,
    /// Sweep passes that have covered this request
    pub retries: i32,
    pub status: ReprocessStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub found_at: Option<DateTime<Utc>>,
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl SearchReprocess {
    /// Genres as a set (storage keeps them comma-joined).
    pub fn genre_set(&self) -> BTreeSet<String> {
        split_genres(&self.genres)
    }
}

/// Split a comma-joined genre column into a set, dropping blanks.
pub fn split_genres(genres: &str) -> BTreeSet<String> {
    genres
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Join a genre set back into the storage form.
pub fn join_genres(genres: &BTreeSet<String>) -> String {
    genres.iter().cloned().collect::<Vec<_>>().join(",")
}

/// One page of a paginated query.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Whether another page follows this one
    pub has_next: bool,
}

impl<T> Page<T> {
    /// An empty terminal page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next: false,
        }
    }
}
