//! Concurrent multi-source search aggregation.
//!
//! One `search` call fans the query out to every registered source
//! under independent time budgets, merges whatever arrived in time,
//! optionally joins a parallel artwork lookup, and ranks the merged
//! list against the parsed query. Source failures and timeouts are
//! absorbed; an empty result list is a normal terminal outcome.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::config::{ArtworkConfig, SearchConfig};
use crate::matching::SearchResultComparator;
use crate::model::{ArtistsTitle, SearchQuery, TrackMetadata};
use crate::search::traits::{ArtworkSource, SearchSource};

/// Fans queries out to all registered search sources.
pub struct SearchAggregator {
    sources: Vec<Arc<dyn SearchSource>>,
    artwork: Option<Arc<dyn ArtworkSource>>,
    config: SearchConfig,
    artwork_config: ArtworkConfig,
}

impl SearchAggregator {
    /// Create an aggregator over the given sources.
    ///
    /// Sources keep their registration order: it is the deterministic
    /// tie-break of the final ranking.
    pub fn new(
        sources: Vec<Arc<dyn SearchSource>>,
        artwork: Option<Arc<dyn ArtworkSource>>,
        config: SearchConfig,
        artwork_config: ArtworkConfig,
    ) -> Self {
        Self {
            sources,
            artwork,
            config,
            artwork_config,
        }
    }

    /// Search all sources and return the ranked merge of their results.
    pub async fn search(&self, query: &SearchQuery) -> Vec<TrackMetadata> {
        self.do_search(query, false).await
    }

    /// Fast mode: only fast-capable sources, no artwork lookup.
    pub async fn search_fast(&self, query: &SearchQuery) -> Vec<TrackMetadata> {
        self.do_search(query, true).await
    }

    async fn do_search(&self, query: &SearchQuery, fast: bool) -> Vec<TrackMetadata> {
        info!(query = %query.text, fast, "starting search");
        let started = Instant::now();

        // Artwork runs concurrently with the fan-out under its own
        // budget; a miss or timeout never delays candidate aggregation.
        let artwork_task = if !fast && query.fetch_artwork && self.artwork_config.enabled {
            self.artwork.clone().map(|source| {
                let text = query.text.clone();
                let budget = self.artwork_config.timeout();
                tokio::spawn(async move {
                    match timeout(budget, source.search_artwork(&text)).await {
                        Ok(Ok(url)) => url,
                        Ok(Err(e)) => {
                            warn!("Artwork lookup failed: {e}");
                            None
                        }
                        Err(_) => {
                            warn!("Artwork lookup timed out after {budget:?}");
                            None
                        }
                    }
                })
            })
        } else {
            None
        };

        let mut songs = self.fan_out(query, fast).await;

        if let Some(task) = artwork_task {
            match task.await {
                Ok(Some(artwork_url)) => {
                    for song in &mut songs {
                        song.thumbnail_url = Some(artwork_url.clone());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Artwork task failed to join: {e}"),
            }
        }

        let expected = ArtistsTitle::parse(&query.text);
        SearchResultComparator::new(expected).sort(&mut songs);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            found = songs.len(),
            "search finished"
        );
        songs
    }

    /// Query every participating source concurrently, each under its own
    /// time budget, and merge the successful results in registration
    /// order. Arrival order decides nothing beyond inclusion.
    async fn fan_out(&self, query: &SearchQuery, fast: bool) -> Vec<TrackMetadata> {
        let budget = self.config.source_timeout();
        let mut slots: Vec<Option<Vec<TrackMetadata>>> = vec![None; self.sources.len()];

        let calls = self
            .sources
            .iter()
            .enumerate()
            .filter(|(_, source)| !fast || source.supports_fast())
            .map(|(index, source)| {
                let source = Arc::clone(source);
                let query = query.clone();
                async move {
                    let outcome = if fast {
                        timeout(budget, source.search_fast(&query)).await
                    } else {
                        timeout(budget, source.search(&query)).await
                    };
                    (index, source.resource_name().to_string(), outcome)
                }
            })
            .collect::<Vec<_>>();

        let mut results = futures::stream::iter(calls).buffer_unordered(self.config.concurrency.max(1));

        while let Some((index, source_name, outcome)) = results.next().await {
            match outcome {
                Ok(Ok(songs)) => {
                    debug!(source = %source_name, count = songs.len(), "source answered");
                    slots[index] = Some(songs);
                }
                Ok(Err(e)) => warn!(source = %source_name, "Source search failed: {e}"),
                Err(_) => {
                    warn!(source = %source_name, "Source search timed out after {budget:?}");
                }
            }
        }

        slots.into_iter().flatten().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::traits::SourceError;
    use crate::search::traits::mocks::{MockArtworkSource, MockSearchSource, track};
    use std::time::Duration;

    fn aggregator(
        sources: Vec<Arc<dyn SearchSource>>,
        artwork: Option<Arc<dyn ArtworkSource>>,
    ) -> SearchAggregator {
        let config = SearchConfig {
            source_timeout_ms: 100,
            concurrency: 4,
        };
        let artwork_config = ArtworkConfig {
            enabled: true,
            timeout_ms: 50,
        };
        SearchAggregator::new(sources, artwork, config, artwork_config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_merges_survivors_within_one_budget() {
        // One source times out, one returns empty, one returns two hits:
        // the search yields exactly those two, inside a single time budget.
        let slow = MockSearchSource::returning("slow", vec![track("A", "B", "slow", "1")])
            .with_delay(Duration::from_secs(10));
        let empty = MockSearchSource::empty("bandcamp");
        let good = MockSearchSource::returning(
            "vk",
            vec![
                track("Drexciya", "Digital Tsunami", "vk", "1"),
                track("Drexciya", "Digital Tsunami (remaster)", "vk", "2"),
            ],
        );

        let aggregator = aggregator(
            vec![Arc::new(slow), Arc::new(empty), Arc::new(good)],
            None,
        );

        let started = Instant::now();
        let results = aggregator
            .search(&SearchQuery::new("Drexciya - Digital Tsunami").without_artwork())
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|t| t.resource_name == "vk"));
        // All sources run concurrently, so total time is one budget, not three.
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_not_error() {
        let aggregator = aggregator(
            vec![
                Arc::new(MockSearchSource::failing("a", SourceError::Parse("bad html".into()))),
                Arc::new(MockSearchSource::empty("b")),
            ],
            None,
        );
        let results = aggregator.search(&SearchQuery::new("anything").without_artwork()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_ranked_against_query() {
        let noise = track("Someone", "Unrelated Mix", "yt", "1");
        let hit = track("Drexciya", "Digital Tsunami", "vk", "1");
        let aggregator = aggregator(
            vec![
                Arc::new(MockSearchSource::returning("yt", vec![noise])),
                Arc::new(MockSearchSource::returning("vk", vec![hit])),
            ],
            None,
        );

        let results = aggregator
            .search(&SearchQuery::new("Drexciya - Digital Tsunami").without_artwork())
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].artists_title.title, "Digital Tsunami");
    }

    #[tokio::test]
    async fn test_ranking_ignores_arrival_order() {
        // The better match arrives last (its source is slower) but must
        // still rank first.
        let late_hit = MockSearchSource::returning(
            "vk",
            vec![track("Drexciya", "Digital Tsunami", "vk", "1")],
        )
        .with_delay(Duration::from_millis(30));
        let early_noise =
            MockSearchSource::returning("yt", vec![track("Someone", "Podcast 003", "yt", "1")]);

        let aggregator = aggregator(vec![Arc::new(late_hit), Arc::new(early_noise)], None);
        let results = aggregator
            .search(&SearchQuery::new("Drexciya - Digital Tsunami").without_artwork())
            .await;
        assert_eq!(results[0].resource_name, "vk");
    }

    #[tokio::test]
    async fn test_artwork_applied_to_all_results() {
        let aggregator = aggregator(
            vec![Arc::new(MockSearchSource::returning(
                "vk",
                vec![track("A", "B", "vk", "1"), track("A", "B2", "vk", "2")],
            ))],
            Some(Arc::new(MockArtworkSource::returning("https://img/x.jpg"))),
        );

        let results = aggregator.search(&SearchQuery::new("A - B")).await;
        assert!(
            results
                .iter()
                .all(|t| t.thumbnail_url.as_deref() == Some("https://img/x.jpg"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_artwork_timeout_does_not_block_results() {
        let aggregator = aggregator(
            vec![Arc::new(MockSearchSource::returning(
                "vk",
                vec![track("A", "B", "vk", "1")],
            ))],
            Some(Arc::new(
                MockArtworkSource::returning("https://img/x.jpg")
                    .with_delay(Duration::from_secs(60)),
            )),
        );

        let results = aggregator.search(&SearchQuery::new("A - B")).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_artwork_failure_is_absorbed() {
        let aggregator = aggregator(
            vec![Arc::new(MockSearchSource::returning(
                "vk",
                vec![track("A", "B", "vk", "1")],
            ))],
            Some(Arc::new(MockArtworkSource::failing(SourceError::Network(
                "down".into(),
            )))),
        );
        let results = aggregator.search(&SearchQuery::new("A - B")).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_fast_mode_skips_slow_only_sources() {
        let fast_source =
            MockSearchSource::returning("fast", vec![track("A", "B", "fast", "1")]).fast();
        let full_source = MockSearchSource::returning("full", vec![track("A", "B", "full", "1")]);

        let aggregator = aggregator(vec![Arc::new(fast_source), Arc::new(full_source)], None);
        let results = aggregator.search_fast(&SearchQuery::new("A - B")).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource_name, "fast");
    }
}
