//! Search aggregation and download selection.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Contracts** (`traits.rs`) - what a search/download/artwork source
//!   must provide; the engine consumes these, hosts implement them
//! - **Aggregator** (`aggregator.rs`) - concurrent fan-out over all
//!   registered search sources with per-source time budgets, merge and
//!   fuzzy ranking of the partial results
//! - **Download facade** (`download.rs`) - picks the highest-priority
//!   source able to materialize a query or a specific candidate
//!
//! Sources are injected at construction time as trait-object vectors;
//! there is no runtime registration. A failing or slow source never
//! fails a search - its contribution is simply absent.

pub mod aggregator;
pub mod download;
pub mod traits;

pub use aggregator::SearchAggregator;
pub use download::DownloadFacade;
pub use traits::{ArtworkSource, DownloadSource, SearchSource, SourceError};
