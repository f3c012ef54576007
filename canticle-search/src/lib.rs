//! # canticle-search
//!
//! Federated lyrics and hymn search for Canticle.
//!
//! One query is dispatched to several independent lyric providers at
//! once. Their results are normalised into [`SearchCandidate`] values,
//! scored against the analysed query, deduplicated, and returned as a
//! ranked [`SearchResultPayload`], either once at the end or as a stream
//! of progressively complete snapshots.
//!
//! ## Design
//!
//! - Providers implement [`ProviderAdapter`] and are registered, in order,
//!   with a [`LyricsEngine`] instance. There is no global registry.
//! - A failing provider never aborts or delays the others; its failure is
//!   reported in the payload's per-provider metadata.
//! - Ranking is deterministic for a given set of settled providers.
//! - Completed payloads are cached in memory with a TTL, keyed by the
//!   normalised query and limit.
//!
//! ## Security
//!
//! - API keys come from a [`CredentialStore`] and never appear in errors
//! - Search queries are logged only at trace level

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod types;

pub use config::SearchConfig;
pub use credentials::{CredentialStore, MemoryCredentialStore, ProviderKeyState};
pub use error::{LyricsError, Result};
pub use orchestrator::{LyricsEngine, SearchOptions};
pub use provider::{LyricsRequest, ProviderAdapter, ProviderResponse, SearchRequest};
pub use types::{
    LyricContent, LyricPayload, ProviderDefinition, ProviderMeta, ProviderStatus,
    SearchCandidate, SearchResultPayload,
};
