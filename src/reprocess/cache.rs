//! Per-user cache of found-but-not-yet-downloaded reprocess results.
//!
//! The cache is the bridge between a sweep (writer) and the download
//! pass (reader/remover). Entries exist exactly while the backing
//! request is `FOUND`. The contract is pluggable: the in-memory
//! implementation below is the default, and values are serde-
//! serializable so an external key-value store can stand in.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::TrackMetadata;

/// A found candidate awaiting download, keyed by `(user_id, request_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprocessResult {
    /// The top-ranked candidate the sweep accepted
    pub track_metadata: TrackMetadata,
    /// Collection the downloaded track should land in
    pub collection_id: Option<i64>,
    /// Owning user
    pub owner_id: i64,
    /// Genre tags carried over from the original request
    pub genres: BTreeSet<String>,
}

/// Keyed store of pending reprocess results.
///
/// Implementations must support concurrent access across users; each
/// call is atomic for its user partition, but callers serialize
/// multi-call sequences themselves (the service holds a per-user lock).
#[async_trait]
pub trait ReprocessResultCache: Send + Sync {
    /// Insert or overwrite results for a user.
    async fn save(&self, user_id: i64, results: HashMap<i64, ReprocessResult>);

    /// Fetch the subset of a user's entries with the given request ids.
    async fn get(&self, user_id: i64, request_ids: &HashSet<i64>) -> HashMap<i64, ReprocessResult>;

    /// All entries for a user.
    async fn available(&self, user_id: i64) -> HashMap<i64, ReprocessResult>;

    /// Drop the given request ids from a user's partition.
    async fn remove(&self, user_id: i64, request_ids: &HashSet<i64>);
}

/// Default in-process cache: a per-user map guarded by one RwLock.
///
/// Created at startup, torn down at shutdown; no static state.
#[derive(Default)]
pub struct InMemoryResultCache {
    cache: RwLock<HashMap<i64, HashMap<i64, ReprocessResult>>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReprocessResultCache for InMemoryResultCache {
    async fn save(&self, user_id: i64, results: HashMap<i64, ReprocessResult>) {
        let mut cache = self.cache.write();
        cache.entry(user_id).or_default().extend(results);
    }

    async fn get(&self, user_id: i64, request_ids: &HashSet<i64>) -> HashMap<i64, ReprocessResult> {
        let cache = self.cache.read();
        match cache.get(&user_id) {
            Some(by_user) => by_user
                .iter()
                .filter(|(id, _)| request_ids.contains(id))
                .map(|(id, result)| (*id, result.clone()))
                .collect(),
            None => HashMap::new(),
        }
    }

    async fn available(&self, user_id: i64) -> HashMap<i64, ReprocessResult> {
        let cache = self.cache.read();
        cache.get(&user_id).cloned().unwrap_or_default()
    }

    async fn remove(&self, user_id: i64, request_ids: &HashSet<i64>) {
        let mut cache = self.cache.write();
        if let Some(by_user) = cache.get_mut(&user_id) {
            for id in request_ids {
                by_user.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtistsTitle;

    fn result(owner_id: i64, title: &str) -> ReprocessResult {
        ReprocessResult {
            track_metadata: TrackMetadata {
                artists_title: ArtistsTitle::of("Artist", title),
                duration_secs: 300,
                bit_rate_kbps: Some(320),
                thumbnail_url: None,
                size_mb: None,
                resource_name: "vk".to_string(),
                uri: format!("vk:{title}"),
            },
            collection_id: Some(7),
            owner_id,
            genres: BTreeSet::from(["electro".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_save_and_available() {
        let cache = InMemoryResultCache::new();
        cache.save(1, HashMap::from([(10, result(1, "A"))])).await;
        cache.save(1, HashMap::from([(11, result(1, "B"))])).await;

        let available = cache.available(1).await;
        assert_eq!(available.len(), 2);
        assert!(cache.available(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_overwrites_same_request_id() {
        let cache = InMemoryResultCache::new();
        cache.save(1, HashMap::from([(10, result(1, "A"))])).await;
        cache.save(1, HashMap::from([(10, result(1, "A2"))])).await;

        let available = cache.available(1).await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[&10].track_metadata.artists_title.title, "A2");
    }

    #[tokio::test]
    async fn test_get_filters_by_request_ids() {
        let cache = InMemoryResultCache::new();
        cache
            .save(1, HashMap::from([(10, result(1, "A")), (11, result(1, "B"))]))
            .await;

        let subset = cache.get(1, &HashSet::from([11, 99])).await;
        assert_eq!(subset.len(), 1);
        assert!(subset.contains_key(&11));
    }

    #[tokio::test]
    async fn test_remove_is_scoped_to_user() {
        let cache = InMemoryResultCache::new();
        cache.save(1, HashMap::from([(10, result(1, "A"))])).await;
        cache.save(2, HashMap::from([(10, result(2, "A"))])).await;

        cache.remove(1, &HashSet::from([10])).await;
        assert!(cache.available(1).await.is_empty());
        assert_eq!(cache.available(2).await.len(), 1);
    }

    #[test]
    fn test_result_serde_roundtrip() {
        let original = result(1, "A");
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ReprocessResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
