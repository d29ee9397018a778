//! cratedig - multi-source track search aggregation and reprocessing.
//!
//! This crate is the engine behind a "find me this track" workflow: it
//! fans a free-text query out to any number of pluggable search sources,
//! ranks the merged results against the query with fuzzy artist/title
//! matching, and keeps a durable retry queue for queries that could not
//! be satisfied on the first attempt.
//!
//! # Architecture
//!
//! - [`model`] - value types shared across the engine
//! - [`matching`] - fuzzy scoring and ranking comparators (pure, no I/O)
//! - [`search`] - source/download adapter contracts and the concurrent
//!   aggregation and download-selection facades
//! - [`artwork`] - a concrete [`search::ArtworkSource`] over the iTunes
//!   Search API
//! - [`reprocess`] - the retry state machine: persistent request store,
//!   per-user result cache, reprocessing service, and scheduler
//! - [`config`] - TOML configuration loaded from the OS config dir
//!
//! Host applications construct the engine with their own adapters:
//!
//! ```ignore
//! use cratedig::search::SearchAggregator;
//! use cratedig::reprocess::{InMemoryResultCache, ReprocessService, ReprocessStore};
//!
//! let store = ReprocessStore::connect("sqlite:cratedig.db").await?;
//! let aggregator = SearchAggregator::new(sources, Some(artwork), config.search);
//! let service = ReprocessService::new(store, cache, aggregator, downloads, config.reprocess);
//! service.reprocess_all_users().await?;
//! ```

pub mod artwork;
pub mod config;
pub mod error;
pub mod matching;
pub mod model;
pub mod reprocess;
pub mod search;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{ArtistsTitle, SearchQuery, Track, TrackMetadata};
