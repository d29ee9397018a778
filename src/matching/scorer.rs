//! Bounded similarity scoring between strings and artist/title pairs.
//!
//! Scores live in `[0, MAX_SCORE]`, higher is more similar. The scorer
//! is case-insensitive and whitespace-trimmed; an empty side always
//! scores 0 (the worst-score sentinel) instead of erroring, so callers
//! can feed unparsed user input straight through.

use crate::model::ArtistsTitle;

/// Upper bound of every score produced by this module.
pub const MAX_SCORE: i32 = 100;

/// Title weight in the composite score (title is the stronger signal:
/// remixes and edits vary the artist block far more than the title).
const TITLE_WEIGHT: i32 = 3;
/// Artist weight in the composite score.
const ARTISTS_WEIGHT: i32 = 2;

/// Similarity of two strings on a normalized Levenshtein scale.
///
/// `score(a, a) == MAX_SCORE` and `score(a, b) == score(b, a)` for all
/// non-empty inputs; either side empty (after trimming) yields 0.
pub fn score(a: &str, b: &str) -> i32 {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let similarity = strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase());
    (similarity * f64::from(MAX_SCORE)).round() as i32
}

/// Composite similarity between an expected and a candidate pair.
///
/// Title similarity is weighted above artist similarity. When the
/// expected side is missing one part (a query that did not parse into
/// artists and title), the comparison falls back to the part that is
/// present, so bare-title queries still rank meaningfully.
pub fn score_artist_title(expected: &ArtistsTitle, candidate: &ArtistsTitle) -> i32 {
    if expected.is_empty() {
        return 0;
    }
    if expected.artists.trim().is_empty() {
        return score(&expected.title, &candidate.title);
    }
    if expected.title.trim().is_empty() {
        return score(&expected.artists, &candidate.artists);
    }

    let artists = score(&expected.artists, &candidate.artists);
    let title = score(&expected.title, &candidate.title);
    let weighted =
        (artists * ARTISTS_WEIGHT + title * TITLE_WEIGHT) / (ARTISTS_WEIGHT + TITLE_WEIGHT);
    weighted.clamp(0, MAX_SCORE)
}
