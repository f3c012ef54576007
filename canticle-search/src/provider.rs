//! Trait definition for pluggable lyric providers.
//!
//! Each content source (LRCLIB, Genius, Hymnary.org, Hymnal.net)
//! implements [`ProviderAdapter`] to provide a uniform interface for
//! searching and lyric retrieval.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{LyricContent, LyricPayload, ProviderDefinition, SearchCandidate};

/// Options handed to [`ProviderAdapter::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Maximum number of candidates the provider should return.
    pub limit: usize,
    /// Token shared by every provider call of one orchestrated search.
    pub cancel: Option<CancellationToken>,
    /// API key, resolved by the engine when the definition requires one.
    pub credential: Option<String>,
}

/// Options handed to [`ProviderAdapter::get_lyrics`].
#[derive(Debug, Clone)]
pub struct LyricsRequest {
    pub payload: LyricPayload,
    pub cancel: Option<CancellationToken>,
    pub credential: Option<String>,
}

/// What a provider returns for one search.
///
/// Failures are reported as human-readable strings in `errors`; a
/// provider may return partial `results` alongside errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    pub results: Vec<SearchCandidate>,
    pub errors: Vec<String>,
}

impl ProviderResponse {
    /// A response carrying a single error and no results.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            errors: vec![error.into()],
        }
    }
}

/// A pluggable lyric provider.
///
/// Implementors own their [`ProviderDefinition`] and handle their own:
///
/// - URL construction with query encoding
/// - HTTP requests bounded by [`crate::fetch::fetch_with_timeout`]
/// - Response decoding into [`SearchCandidate`] values
///
/// All implementations must be `Send + Sync` for concurrent provider queries.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Static descriptor for this provider.
    fn definition(&self) -> &ProviderDefinition;

    /// Search the provider for `query`.
    ///
    /// This never fails: transport, decoding and configuration problems
    /// are caught and reported in [`ProviderResponse::errors`].
    async fn search(&self, query: &str, request: &SearchRequest) -> ProviderResponse;

    /// Retrieve full lyrics for a payload previously produced by `search`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LyricsError::NotFound`] when the upstream source
    /// has nothing for the reference, or any transport/decoding error.
    async fn get_lyrics(&self, request: &LyricsRequest) -> Result<LyricContent>;

    /// Returns the provider id from the definition.
    fn id(&self) -> &'static str {
        self.definition().id
    }
}
