//! Fuzzy matching and ranking.
//!
//! Pure CPU-side code: a bounded edit-distance scorer over strings and
//! artist/title pairs, and the two comparators the engine ranks search
//! results with. No I/O, no async - the facades call into this after
//! their fan-out settles.

pub mod comparator;
pub mod scorer;

pub use comparator::{SearchResultComparator, SmartComparator};
pub use scorer::{MAX_SCORE, score, score_artist_title};
