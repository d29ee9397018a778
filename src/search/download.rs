//! Download selection over prioritized download-capable sources.
//!
//! The facade never errors: when no source can materialize a track the
//! result is simply `None`, which callers treat as a normal outcome.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ArtworkConfig;
use crate::model::{SearchQuery, Track, TrackMetadata};
use crate::search::traits::{ArtworkSource, DownloadSource};

/// Picks the best download source for a query or candidate.
pub struct DownloadFacade {
    sources: Vec<Arc<dyn DownloadSource>>,
    artwork: Option<Arc<dyn ArtworkSource>>,
    artwork_config: ArtworkConfig,
}

impl DownloadFacade {
    pub fn new(
        sources: Vec<Arc<dyn DownloadSource>>,
        artwork: Option<Arc<dyn ArtworkSource>>,
        artwork_config: ArtworkConfig,
    ) -> Self {
        Self {
            sources,
            artwork,
            artwork_config,
        }
    }

    /// Search-and-download from a raw query via the highest-priority
    /// enabled source.
    pub async fn download_query(&self, query: &SearchQuery) -> Option<Track> {
        let artwork_url = self.lookup_artwork(&query.text).await;

        let source = self
            .sources
            .iter()
            .filter(|s| s.is_download_enabled())
            .max_by_key(|s| s.download_priority())?;

        debug!(source = %source.resource_name(), query = %query.text, "downloading from query");
        match source.download_query(query, artwork_url.as_deref()).await {
            Ok(track) => track,
            Err(e) => {
                warn!(source = %source.resource_name(), "Download failed: {e}");
                None
            }
        }
    }

    /// Materialize a specific candidate via the highest-priority enabled
    /// source that declares itself able to handle the candidate's
    /// originating resource.
    pub async fn download_candidate(&self, candidate: &TrackMetadata) -> Option<Track> {
        let resource = candidate.resource_from_uri();

        let source = self
            .sources
            .iter()
            .filter(|s| s.is_download_enabled() && s.can_download(resource))
            .max_by_key(|s| s.download_priority());

        let Some(source) = source else {
            debug!(resource, uri = %candidate.uri, "no download source can handle candidate");
            return None;
        };

        let candidate = self.with_thumbnail(candidate.clone()).await;

        debug!(source = %source.resource_name(), uri = %candidate.uri, "downloading candidate");
        match source.download_candidate(&candidate).await {
            Ok(Some(mut track)) => {
                if track.artwork_url.is_none() {
                    track.artwork_url = candidate.thumbnail_url.clone();
                }
                Some(track)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(source = %source.resource_name(), "Download failed: {e}");
                None
            }
        }
    }

    /// Fill in the candidate's thumbnail from the artwork source when
    /// the originating search did not provide one.
    async fn with_thumbnail(&self, mut candidate: TrackMetadata) -> TrackMetadata {
        if candidate.thumbnail_url.is_none() {
            candidate.thumbnail_url = self.lookup_artwork(&candidate.artists_title.to_string()).await;
        }
        candidate
    }

    /// Time-boxed, failure-absorbing artwork lookup.
    async fn lookup_artwork(&self, text: &str) -> Option<String> {
        let source = self.artwork.as_ref()?;
        if !self.artwork_config.enabled {
            return None;
        }
        match timeout(self.artwork_config.timeout(), source.search_artwork(text)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                warn!("Artwork lookup failed: {e}");
                None
            }
            Err(_) => {
                warn!("Artwork lookup timed out");
                None
            }
        }
    }
}
