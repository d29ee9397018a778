//! The reprocessing service: owner of the request state machine.
//!
//! See the module docs of [`crate::reprocess`] for the lifecycle. The
//! service composes the store (durable status), the result cache
//! (pending downloads), the search aggregator (retry attempts), and the
//! download facade (materialization), and serializes all cache-mutating
//! operations per user.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::config::ReprocessConfig;
use crate::error::Result;
use crate::matching::score_artist_title;
use crate::model::{ArtistsTitle, Page, ReprocessStatus, SearchQuery, SearchReprocess};
use crate::reprocess::cache::{ReprocessResult, ReprocessResultCache};
use crate::reprocess::event::ReprocessFoundEvent;
use crate::reprocess::store::ReprocessStore;
use crate::search::{DownloadFacade, SearchAggregator};

/// Capacity of the found-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives persisted search requests through their retry lifecycle.
pub struct ReprocessService {
    store: ReprocessStore,
    cache: Arc<dyn ReprocessResultCache>,
    aggregator: Arc<SearchAggregator>,
    downloads: Arc<DownloadFacade>,
    config: ReprocessConfig,
    found_events: broadcast::Sender<ReprocessFoundEvent>,
    /// One async mutex per user serializes that user's cache mutations;
    /// distinct users proceed fully in parallel.
    user_locks: parking_lot::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl ReprocessService {
    pub fn new(
        store: ReprocessStore,
        cache: Arc<dyn ReprocessResultCache>,
        aggregator: Arc<SearchAggregator>,
        downloads: Arc<DownloadFacade>,
        config: ReprocessConfig,
    ) -> Self {
        let (found_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            cache,
            aggregator,
            downloads,
            config,
            found_events,
            user_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to "reprocess found" events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReprocessFoundEvent> {
        self.found_events.subscribe()
    }

    /// Register a failed search for later reprocessing. Idempotent: an
    /// existing request for the same `(user, query)` is returned as-is,
    /// except that a `DOWNLOADED` one is re-armed to `NOT_FOUND` so the
    /// track can be found and downloaded again.
    pub async fn create_if_not_exists(
        &self,
        search_query: &str,
        collection_id: Option<i64>,
        genres: &BTreeSet<String>,
        user_id: i64,
    ) -> Result<SearchReprocess> {
        if let Some(existing) = self
            .store
            .find_by_user_and_query(user_id, search_query)
            .await?
        {
            if existing.status == ReprocessStatus::Downloaded {
                debug!(id = existing.id, "re-arming downloaded request");
                self.store.set_not_found_by_id(existing.id).await?;
                return Ok(self
                    .store
                    .find_by_id(existing.id)
                    .await?
                    .unwrap_or(existing));
            }
            return Ok(existing);
        }

        self.store
            .create(search_query, collection_id, genres, user_id)
            .await
    }

    /// Requests still waiting for a match.
    pub async fn available_for_search(
        &self,
        user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchReprocess>> {
        self.store
            .find_by_user_and_status(user_id, ReprocessStatus::NotFound, page, page_size)
            .await
    }

    /// Requests with a cached candidate ready to download. Runs the
    /// consistency repair first so the page reflects reality.
    pub async fn available_for_downloading(
        &self,
        user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchReprocess>> {
        self.repair_consistency(user_id).await?;
        self.store
            .find_by_user_and_status(user_id, ReprocessStatus::Found, page, page_size)
            .await
    }

    /// Requests whose track has been materialized.
    pub async fn downloaded(
        &self,
        user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchReprocess>> {
        self.store
            .find_by_user_and_status(user_id, ReprocessStatus::Downloaded, page, page_size)
            .await
    }

    /// Scheduled sweep entry point: reprocess every user with pending
    /// requests. One user's failure never aborts the others.
    pub async fn reprocess_all_users(&self) -> Result<()> {
        info!("Starting reprocessing search requests for all users");
        let users = self
            .store
            .users_with_status(ReprocessStatus::NotFound)
            .await?;
        for user_id in users {
            if let Err(e) = self.reprocess(user_id).await {
                error!(user_id, "Reprocessing failed: {e}");
            }
        }
        info!("Finished reprocessing search requests for all users");
        Ok(())
    }

    /// Retry all of one user's pending requests. Returns how many were
    /// found this pass.
    pub async fn reprocess(&self, user_id: i64) -> Result<usize> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        info!(user_id, "Starting reprocessing search requests");
        self.repair_consistency(user_id).await?;

        let mut found: HashMap<i64, ReprocessResult> = HashMap::new();
        let mut page = 0;
        loop {
            let batch = self
                .store
                .find_by_user_and_status(
                    user_id,
                    ReprocessStatus::NotFound,
                    page,
                    self.config.batch_size,
                )
                .await?;

            for request in &batch.items {
                if let Some(result) = self.reprocess_one(request).await {
                    found.insert(request.id, result);
                }
            }

            // Every request in the batch was attempted, match or not.
            let attempted: HashSet<i64> = batch.items.iter().map(|r| r.id).collect();
            self.store.increment_retries(&attempted).await?;

            if !batch.has_next {
                break;
            }
            page += 1;
        }

        if !found.is_empty() {
            self.cache.save(user_id, found.clone()).await;
            let found_ids: HashSet<i64> = found.keys().copied().collect();
            self.store.set_found(&found_ids, Utc::now()).await?;
            // No receivers is fine; the event is best-effort.
            let _ = self.found_events.send(ReprocessFoundEvent {
                user_id,
                results: found.clone(),
            });
        }
        info!(user_id, found = found.len(), "Finished reprocessing search requests");

        if self.config.auto_download && !found.is_empty() {
            let downloaded = self.drain(user_id, found.clone()).await?;
            info!(user_id, downloaded, "Auto-downloaded found results");
        }

        Ok(found.len())
    }

    /// Download specific cached results for a user.
    pub async fn download(&self, user_id: i64, request_ids: &HashSet<i64>) -> Result<usize> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        info!(user_id, requested = request_ids.len(), "Starting downloading reprocess results");
        let ready = self.cache.get(user_id, request_ids).await;
        let downloaded = self.drain(user_id, ready).await?;
        info!(user_id, downloaded, "Downloaded reprocess results");
        Ok(downloaded)
    }

    /// Download everything cached for a user.
    pub async fn download_all(&self, user_id: i64) -> Result<usize> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        info!(user_id, "Starting downloading all reprocess results");
        let ready = self.cache.available(user_id).await;
        let downloaded = self.drain(user_id, ready).await?;
        info!(user_id, downloaded, "Downloaded reprocess results");
        Ok(downloaded)
    }

    /// Discard a found-but-undownloaded result: drop the cache entry and
    /// revert the request so future sweeps try again.
    pub async fn discard_found(&self, user_id: i64, request_id: i64) -> Result<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.cache.remove(user_id, &HashSet::from([request_id])).await;
        self.store.set_not_found_by_id(request_id).await
    }

    /// Repair cache/status divergence left by partial failures (e.g. a
    /// crash between the cache write and the status write). The cache is
    /// the source of truth for "ready to download": any `FOUND` request
    /// without a cache entry reverts to `NOT_FOUND`; an empty cache
    /// partition reverts them all. Runs to completion before anything
    /// else in the cycle reads the user's `NOT_FOUND` set.
    async fn repair_consistency(&self, user_id: i64) -> Result<()> {
        let cached_ids: HashSet<i64> = self
            .cache
            .available(user_id)
            .await
            .keys()
            .copied()
            .collect();

        if cached_ids.is_empty() {
            self.store.reset_found_for_user(user_id).await
        } else {
            self.store.reset_found_except(user_id, &cached_ids).await
        }
    }

    /// One retry attempt: search, take the top-ranked candidate, accept
    /// it only above the match threshold.
    async fn reprocess_one(&self, request: &SearchReprocess) -> Option<ReprocessResult> {
        let query = SearchQuery::new(&request.search_query);
        let expected = ArtistsTitle::parse(&request.search_query);

        let candidates = self.aggregator.search(&query).await;
        let top = candidates.into_iter().next()?;

        let score = score_artist_title(&expected, &top.artists_title);
        if score < self.config.min_match_score {
            debug!(
                id = request.id,
                score,
                threshold = self.config.min_match_score,
                "top candidate below match threshold"
            );
            return None;
        }

        debug!(id = request.id, score, uri = %top.uri, "accepting top candidate");
        Some(ReprocessResult {
            track_metadata: top,
            collection_id: request.collection_id,
            owner_id: request.user_id,
            genres: request.genre_set(),
        })
    }

    /// Try to materialize each ready result; successes flip to
    /// `DOWNLOADED` and leave the cache, failures stay cached for the
    /// next attempt. Partial success is normal.
    async fn drain(&self, user_id: i64, ready: HashMap<i64, ReprocessResult>) -> Result<usize> {
        let mut downloaded_ids = HashSet::new();
        for (request_id, result) in &ready {
            match self.downloads.download_candidate(&result.track_metadata).await {
                Some(_track) => {
                    downloaded_ids.insert(*request_id);
                }
                None => {
                    debug!(request_id, "cached result did not download, keeping for next attempt");
                }
            }
        }

        if !downloaded_ids.is_empty() {
            self.store.set_downloaded(&downloaded_ids, Utc::now()).await?;
            self.cache.remove(user_id, &downloaded_ids).await;
        }

        Ok(downloaded_ids.len())
    }

    fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock();
        Arc::clone(locks.entry(user_id).or_default())
    }
}
