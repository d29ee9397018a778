//! iTunes Search API Data Transfer Objects
//!
//! These types match EXACTLY what the iTunes Search API returns.
//! DO NOT use these types outside the artwork module - the client
//! converts them to plain URLs.
//!
//! API Reference: https://performance-partners.apple.com/search-api
//!
//! Example response:
//! ```json
//! {
//!   "resultCount": 1,
//!   "results": [{
//!     "trackName": "Foreign Fruit",
//!     "artistName": "Sync 24 & Morphology",
//!     "artworkUrl100": "https://.../100x100bb.jpg"
//!   }]
//! }
//! ```

use serde::Deserialize;

/// Top-level search response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A single song result; only the artwork fields matter to us.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// 100x100 artwork thumbnail
    pub artwork_url_100: Option<String>,
    /// 60x60 artwork thumbnail (fallback)
    pub artwork_url_60: Option<String>,
}

impl SearchResult {
    /// Best artwork URL this result offers, upscaled to 600x600 - the
    /// CDN serves any requested size by path substitution.
    pub fn best_artwork_url(&self) -> Option<String> {
        self.artwork_url_100
            .as_deref()
            .or(self.artwork_url_60.as_deref())
            .map(|url| url.replace("100x100", "600x600").replace("60x60", "600x600"))
    }
}
