//! Search orchestrator: concurrent provider fan-out, scoring, ranking.
//!
//! This module analyses the query, fans it out to every registered
//! provider concurrently, re-ranks the accumulated candidates each time a
//! provider settles, and caches the final payload.

pub mod merge;
pub mod query;
pub mod scoring;
pub mod search;

pub use search::{cache_key, LyricsEngine, SearchOptions};
