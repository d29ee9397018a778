//! iTunes Search API HTTP client
//!
//! No API key required. Apple rate limits anonymous callers to roughly
//! 20 requests/minute; the engine's own time budget and the absorb-on-
//! failure posture keep misses harmless.

use async_trait::async_trait;

use super::dto;
use crate::search::traits::{ArtworkSource, SourceError};

/// How many results to request per lookup.
const RESULT_LIMIT: u8 = 5;

/// User agent string sent with every request
const USER_AGENT: &str = concat!("cratedig/", env!("CARGO_PKG_VERSION"));

/// iTunes Search API client
pub struct ItunesArtworkClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ItunesArtworkClient {
    /// Create a new client
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: "https://itunes.apple.com".to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Send the search request and parse the response
    async fn send_search_request(&self, term: &str) -> Result<dto::SearchResponse, SourceError> {
        let url = format!(
            "{}/search?term={}&media=music&entity=song&limit={}",
            self.base_url,
            urlencoding::encode(term),
            RESULT_LIMIT
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !status.is_success() {
            return Err(SourceError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl Default for ItunesArtworkClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtworkSource for ItunesArtworkClient {
    async fn search_artwork(&self, text: &str) -> Result<Option<String>, SourceError> {
        let response = self.send_search_request(text).await?;
        Ok(response
            .results
            .iter()
            .find_map(dto::SearchResult::best_artwork_url))
    }

    async fn search_artworks(&self, text: &str) -> Result<Vec<String>, SourceError> {
        let response = self.send_search_request(text).await?;
        Ok(response
            .results
            .iter()
            .filter_map(dto::SearchResult::best_artwork_url)
            .collect())
    }
}
