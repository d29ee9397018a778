//! Ranking comparators over candidate search results.
//!
//! Both comparators produce a best-first total order for `sort_by`;
//! Rust's stable sort breaks remaining ties by input order, which keeps
//! ranking deterministic for a given candidate set.

use std::cmp::Ordering;

use crate::matching::scorer::{MAX_SCORE, score, score_artist_title};
use crate::model::{ArtistsTitle, TrackMetadata};

/// Duration deviation weight in the smart penalty. Duration is the most
/// reliable discriminator between a track and a mix containing it.
const DURATION_DIFF_MULTIPLIER: i64 = 3;
/// Flat penalty applied to the lower-bitrate candidate of a pair.
const BITRATE_DIFF_PENALTY: i64 = 60;
/// Expected durations at or below this are unreliable (unknown or
/// placeholder values) and exempt a pair from the duration penalty.
const MIN_DURATION_FOR_PENALTY_SECS: u32 = 60;

/// Baseline comparator for generic multi-source result ranking.
///
/// Orders by artist similarity to the expected artists, then title
/// similarity to the expected title, then bit rate (higher first), then
/// duration (shorter first).
#[derive(Debug, Clone)]
pub struct SearchResultComparator {
    expected: ArtistsTitle,
}

impl SearchResultComparator {
    pub fn new(expected: ArtistsTitle) -> Self {
        Self { expected }
    }

    /// Best-first ordering between two candidates.
    pub fn compare(&self, a: &TrackMetadata, b: &TrackMetadata) -> Ordering {
        compare_similarity(
            &a.artists_title.artists,
            &b.artists_title.artists,
            &self.expected.artists,
        )
        .then_with(|| {
            compare_similarity(
                &a.artists_title.title,
                &b.artists_title.title,
                &self.expected.title,
            )
        })
        .then_with(|| compare_bit_rates(a.bit_rate_kbps, b.bit_rate_kbps))
        .then_with(|| a.duration_secs.cmp(&b.duration_secs))
    }

    /// Sort candidates in place, best match first.
    pub fn sort(&self, candidates: &mut [TrackMetadata]) {
        candidates.sort_by(|a, b| self.compare(a, b));
    }
}

/// Smart comparator for when an authoritative expected track is known
/// (e.g. a database entry with a trusted duration).
///
/// Each candidate accrues a penalty:
/// `(MAX_SCORE - score_artist_title) + |duration - expected| * 3`, the
/// duration term only when the expected duration exceeds 60 seconds,
/// plus a flat 60 on whichever of the pair has the lower bit rate when
/// both are known. Lower total penalty ranks first.
#[derive(Debug, Clone)]
pub struct SmartComparator {
    expected: ArtistsTitle,
    expected_duration_secs: u32,
}

impl SmartComparator {
    pub fn new(expected: ArtistsTitle, expected_duration_secs: u32) -> Self {
        Self {
            expected,
            expected_duration_secs,
        }
    }

    /// Best-first ordering between two candidates (lower penalty wins).
    pub fn compare(&self, a: &TrackMetadata, b: &TrackMetadata) -> Ordering {
        let mut penalty_a = self.base_penalty(a);
        let mut penalty_b = self.base_penalty(b);

        // The bitrate penalty is relative to the pair, not absolute.
        if let (Some(bit_rate_a), Some(bit_rate_b)) = (a.bit_rate_kbps, b.bit_rate_kbps) {
            match bit_rate_a.cmp(&bit_rate_b) {
                Ordering::Greater => penalty_b += BITRATE_DIFF_PENALTY,
                Ordering::Less => penalty_a += BITRATE_DIFF_PENALTY,
                Ordering::Equal => {}
            }
        }

        penalty_a.cmp(&penalty_b)
    }

    /// Sort candidates in place, best match first.
    pub fn sort(&self, candidates: &mut [TrackMetadata]) {
        candidates.sort_by(|a, b| self.compare(a, b));
    }

    fn base_penalty(&self, candidate: &TrackMetadata) -> i64 {
        let mut penalty =
            i64::from(MAX_SCORE - score_artist_title(&self.expected, &candidate.artists_title));

        if self.expected_duration_secs > MIN_DURATION_FOR_PENALTY_SECS {
            let diff =
                (i64::from(candidate.duration_secs) - i64::from(self.expected_duration_secs)).abs();
            penalty += diff * DURATION_DIFF_MULTIPLIER;
        }

        penalty
    }
}

/// Compare two candidate strings by their similarity to an expected one,
/// more similar first. An empty expected string gives no signal and
/// yields a tie, letting the next criterion decide.
fn compare_similarity(a: &str, b: &str, expected: &str) -> Ordering {
    if expected.trim().is_empty() {
        return Ordering::Equal;
    }
    score(b, expected).cmp(&score(a, expected))
}

/// Higher bit rate first; an unknown bit rate on either side is a tie.
fn compare_bit_rates(a: Option<i16>, b: Option<i16>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    }
}
