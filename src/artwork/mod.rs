//! Artwork lookup over the iTunes Search API.
//!
//! The one concrete source this crate ships: artwork is the lookup the
//! aggregation engine itself schedules alongside the source fan-out, so
//! a default provider belongs with the engine. Hosts can substitute any
//! other [`crate::search::ArtworkSource`] implementation.

pub mod client;
pub mod dto;

pub use client::ItunesArtworkClient;
