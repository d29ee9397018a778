//! The reprocessing engine: a durable retry queue for failed searches.
//!
//! A query that could not be satisfied immediately is persisted as a
//! [`crate::model::SearchReprocess`] request and retried by scheduled
//! sweeps until a good-enough candidate appears and is downloaded.
//!
//! # State machine
//!
//! ```text
//!            create_if_not_exists            sweep match >= threshold
//!   (new) ------------------------> NOT_FOUND -----------------------> FOUND
//!                                      ^  ^                              |
//!                 consistency repair / |  |                              | download
//!                 discard              |  | resubmitted by user          v
//!                                      |  +--------------------------DOWNLOADED
//!                                      +------------------------------/
//! ```
//!
//! - `NOT_FOUND -> FOUND`: a sweep ranked a candidate above the match
//!   threshold; the candidate is written to the result cache and
//!   `found_at` is stamped.
//! - `FOUND -> DOWNLOADED`: the cached candidate was materialized;
//!   `downloaded_at` is stamped and the cache entry removed.
//! - `DOWNLOADED -> NOT_FOUND`: the user resubmitted the same query
//!   (re-arming, e.g. after deleting the track).
//! - `FOUND -> NOT_FOUND`: consistency repair - the cache and the
//!   persisted status diverged (crash between cache write and status
//!   write), or the user discarded a found-but-undownloaded result.
//!
//! [`ReprocessService`] exclusively owns these transitions. The result
//! cache is partitioned per user; a per-user lock serializes the
//! found-writer and the download-remover for the same user while
//! distinct users proceed in parallel.

pub mod cache;
pub mod event;
pub mod scheduler;
pub mod service;
pub mod store;

pub use cache::{InMemoryResultCache, ReprocessResult, ReprocessResultCache};
pub use event::{ReprocessFoundEvent, spawn_logging_listener};
pub use scheduler::{ReprocessScheduler, SchedulerCommand};
pub use service::ReprocessService;
pub use store::ReprocessStore;
