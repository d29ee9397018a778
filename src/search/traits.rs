//! Contracts for external search, download, and artwork sources.
//!
//! These traits are the injection seam of the engine: production hosts
//! implement them over real sites, while tests substitute the mocks
//! from [`mocks`]. The engine never depends on a concrete site.

use async_trait::async_trait;

use crate::model::{SearchQuery, Track, TrackMetadata};

/// Failure at the adapter boundary.
///
/// The engine absorbs these - a failing source contributes an empty
/// result set and a warn log, nothing more.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse source response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Source error: {0}")]
    Other(String),
}

/// A site that can be searched for track metadata.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Full search. May be slow; the aggregator applies its own budget.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<TrackMetadata>, SourceError>;

    /// Low-latency search for fast mode. Sources without a cheaper path
    /// just run the full search.
    async fn search_fast(&self, query: &SearchQuery) -> Result<Vec<TrackMetadata>, SourceError> {
        self.search(query).await
    }

    /// Stable identifier, used in [`TrackMetadata::resource_name`] and
    /// as the uri prefix of candidates this source produces.
    fn resource_name(&self) -> &str;

    /// Whether this source participates in fast mode.
    fn supports_fast(&self) -> bool {
        false
    }
}

/// A source that can materialize actual audio for a track.
#[async_trait]
pub trait DownloadSource: Send + Sync {
    /// Stable identifier, matching the search side where applicable.
    fn resource_name(&self) -> &str;

    /// Disabled sources are skipped by the selection policy.
    fn is_download_enabled(&self) -> bool {
        true
    }

    /// Higher wins when several sources could handle a request.
    fn download_priority(&self) -> i32;

    /// Whether this source can materialize candidates produced by the
    /// named resource.
    fn can_download(&self, resource_name: &str) -> bool;

    /// Search-and-download in one step from a raw query.
    ///
    /// `Ok(None)` means "nothing suitable" and is a normal outcome.
    async fn download_query(
        &self,
        query: &SearchQuery,
        artwork_url: Option<&str>,
    ) -> Result<Option<Track>, SourceError>;

    /// Materialize a specific candidate this source produced earlier.
    async fn download_candidate(
        &self,
        candidate: &TrackMetadata,
    ) -> Result<Option<Track>, SourceError>;
}

/// An artwork lookup service.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    /// Best artwork URL for a free-text query, if any.
    async fn search_artwork(&self, text: &str) -> Result<Option<String>, SourceError>;

    /// All artwork URLs for a free-text query.
    async fn search_artworks(&self, text: &str) -> Result<Vec<String>, SourceError> {
        Ok(self.search_artwork(text).await?.into_iter().collect())
    }
}

/// Mock sources for testing.
///
/// Return configurable canned results, errors, or delays so engine
/// tests can exercise timeouts, partial failure, and selection policy
/// without any network.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Mock search source with canned behavior.
    pub struct MockSearchSource {
        name: String,
        results: Vec<TrackMetadata>,
        error: Option<SourceError>,
        delay: Option<Duration>,
        fast: bool,
    }

    impl MockSearchSource {
        /// Returns the given results immediately.
        pub fn returning(name: &str, results: Vec<TrackMetadata>) -> Self {
            Self {
                name: name.to_string(),
                results,
                error: None,
                delay: None,
                fast: false,
            }
        }

        /// Returns no results.
        pub fn empty(name: &str) -> Self {
            Self::returning(name, vec![])
        }

        /// Fails every search.
        pub fn failing(name: &str, error: SourceError) -> Self {
            Self {
                error: Some(error),
                ..Self::empty(name)
            }
        }

        /// Sleeps before answering (drive timeouts in tests).
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Marks the source as fast-mode capable.
        pub fn fast(mut self) -> Self {
            self.fast = true;
            self
        }
    }

    #[async_trait]
    impl SearchSource for MockSearchSource {
        async fn search(&self, _query: &SearchQuery) -> Result<Vec<TrackMetadata>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            Ok(self.results.clone())
        }

        fn resource_name(&self) -> &str {
            &self.name
        }

        fn supports_fast(&self) -> bool {
            self.fast
        }
    }

    /// Mock download source keyed by resource name.
    pub struct MockDownloadSource {
        name: String,
        priority: i32,
        enabled: bool,
        /// Candidate uris this source refuses to materialize.
        refuse_uris: HashSet<String>,
    }

    impl MockDownloadSource {
        pub fn new(name: &str, priority: i32) -> Self {
            Self {
                name: name.to_string(),
                priority,
                enabled: true,
                refuse_uris: HashSet::new(),
            }
        }

        pub fn disabled(mut self) -> Self {
            self.enabled = false;
            self
        }

        /// Refuse to materialize the given candidate uri.
        pub fn refusing(mut self, uri: &str) -> Self {
            self.refuse_uris.insert(uri.to_string());
            self
        }
    }

    #[async_trait]
    impl DownloadSource for MockDownloadSource {
        fn resource_name(&self) -> &str {
            &self.name
        }

        fn is_download_enabled(&self) -> bool {
            self.enabled
        }

        fn download_priority(&self) -> i32 {
            self.priority
        }

        fn can_download(&self, resource_name: &str) -> bool {
            resource_name == self.name
        }

        async fn download_query(
            &self,
            query: &SearchQuery,
            artwork_url: Option<&str>,
        ) -> Result<Option<Track>, SourceError> {
            let metadata = TrackMetadata {
                artists_title: crate::model::ArtistsTitle::parse(&query.text),
                duration_secs: 300,
                bit_rate_kbps: Some(320),
                thumbnail_url: None,
                size_mb: None,
                resource_name: self.name.clone(),
                uri: format!("{}:fresh", self.name),
            };
            Ok(Some(Track {
                metadata,
                artwork_url: artwork_url.map(str::to_owned),
            }))
        }

        async fn download_candidate(
            &self,
            candidate: &TrackMetadata,
        ) -> Result<Option<Track>, SourceError> {
            if self.refuse_uris.contains(&candidate.uri) {
                return Ok(None);
            }
            Ok(Some(Track {
                metadata: candidate.clone(),
                artwork_url: candidate.thumbnail_url.clone(),
            }))
        }
    }

    /// Mock artwork source.
    pub struct MockArtworkSource {
        url: Option<String>,
        error: Option<SourceError>,
        delay: Option<Duration>,
    }

    impl MockArtworkSource {
        pub fn returning(url: &str) -> Self {
            Self {
                url: Some(url.to_string()),
                error: None,
                delay: None,
            }
        }

        pub fn not_found() -> Self {
            Self {
                url: None,
                error: None,
                delay: None,
            }
        }

        pub fn failing(error: SourceError) -> Self {
            Self {
                url: None,
                error: Some(error),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl ArtworkSource for MockArtworkSource {
        async fn search_artwork(&self, _text: &str) -> Result<Option<String>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            Ok(self.url.clone())
        }
    }

    /// Shorthand candidate builder shared by engine tests.
    pub fn track(artists: &str, title: &str, resource: &str, uri_suffix: &str) -> TrackMetadata {
        TrackMetadata {
            artists_title: crate::model::ArtistsTitle::of(artists, title),
            duration_secs: 300,
            bit_rate_kbps: Some(320),
            thumbnail_url: None,
            size_mb: None,
            resource_name: resource.to_string(),
            uri: format!("{resource}:{uri_suffix}"),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_search_returns_canned_results() {
            let source = MockSearchSource::returning("vk", vec![track("A", "B", "vk", "1")]);
            let results = source.search(&SearchQuery::new("A - B")).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(source.resource_name(), "vk");
        }

        #[tokio::test]
        async fn test_mock_search_error() {
            let source = MockSearchSource::failing("yt", SourceError::Network("down".into()));
            let result = source.search(&SearchQuery::new("x")).await;
            assert!(matches!(result, Err(SourceError::Network(_))));
        }

        #[tokio::test]
        async fn test_mock_download_routes_by_resource() {
            let source = MockDownloadSource::new("vk", 10);
            assert!(source.can_download("vk"));
            assert!(!source.can_download("yt"));
        }

        #[tokio::test]
        async fn test_mock_artwork() {
            let artwork = MockArtworkSource::returning("https://img.example/1.jpg");
            let url = artwork.search_artwork("query").await.unwrap();
            assert_eq!(url.as_deref(), Some("https://img.example/1.jpg"));

            let urls = artwork.search_artworks("query").await.unwrap();
            assert_eq!(urls.len(), 1);
        }
    }
}
