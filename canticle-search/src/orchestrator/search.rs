//! Core search engine: concurrent multi-provider fan-out with streaming
//! snapshots, failure isolation and a TTL response cache.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::TtlCache;
use crate::config::SearchConfig;
use crate::credentials::{CredentialStore, ProviderKeyState};
use crate::error::{LyricsError, Result};
use crate::provider::{LyricsRequest, ProviderAdapter, ProviderResponse, SearchRequest};
use crate::types::{
    LyricContent, LyricPayload, ProviderMeta, ProviderStatus, SearchMeta, SearchResultPayload,
};

use super::merge::{duration_ms, merge_chunks, ProviderChunk};
use super::query::QueryAnalyzer;

/// Each provider is asked for at least this many candidates.
pub const MIN_PER_PROVIDER_LIMIT: usize = 5;
/// Each provider is asked for at most this many candidates.
pub const MAX_PER_PROVIDER_LIMIT: usize = 15;

/// Per-call search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of merged results. Defaults to the engine's
    /// configured `default_limit`.
    pub limit: Option<usize>,
    /// Bypass the cache probe. The final payload is still cached.
    pub skip_cache: bool,
    /// Cancels every in-flight provider call of this search together.
    pub cancel: Option<CancellationToken>,
}

impl SearchOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}

/// Cache key for a `(query, limit)` pair: `"<trimmed lowercase query>::<limit>"`.
pub fn cache_key(query: &str, limit: usize) -> String {
    format!("{}::{limit}", query.trim().to_lowercase())
}

/// Federated lyrics search engine.
///
/// Owns the ordered provider registry and the response cache. Construct
/// one per application and share it by reference or `Arc`.
///
/// Concurrent searches for the same query are not coalesced: each fans
/// out on its own and the last one to finish wins the cache slot.
pub struct LyricsEngine {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    credentials: Arc<dyn CredentialStore>,
    cache: TtlCache<String, SearchResultPayload>,
    analyzer: QueryAnalyzer,
    config: SearchConfig,
}

impl std::fmt::Debug for LyricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.providers.iter().map(|p| p.id()).collect();
        f.debug_struct("LyricsEngine")
            .field("providers", &ids)
            .field("cached", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

impl LyricsEngine {
    /// Build an engine over `providers`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`LyricsError::Config`] if the config is invalid or two
    /// providers share an id.
    pub fn new(
        providers: Vec<Arc<dyn ProviderAdapter>>,
        credentials: Arc<dyn CredentialStore>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        for (i, provider) in providers.iter().enumerate() {
            if providers[..i].iter().any(|p| p.id() == provider.id()) {
                return Err(LyricsError::Config(format!(
                    "duplicate provider id: {}",
                    provider.id()
                )));
            }
        }
        Ok(Self {
            cache: TtlCache::new(config.cache_ttl(), config.cache_max_entries),
            analyzer: QueryAnalyzer::new(&config.known_artists),
            providers,
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Drop every cached payload.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Search every provider and return the final ranked payload.
    ///
    /// Never fails: provider failures are isolated and reported in
    /// `meta.providers[*].errors`.
    ///
    /// If `options.cancel` fires, in-flight providers abort with a timeout
    /// error and the returned payload is not cached.
    pub async fn search(&self, query: &str, options: SearchOptions) -> SearchResultPayload {
        let snapshots = self.run(query, options, false);
        futures::pin_mut!(snapshots);
        let mut last = None;
        while let Some(snapshot) = snapshots.next().await {
            last = Some(snapshot);
        }
        last.unwrap_or_else(|| self.empty_payload())
    }

    /// Search every provider, yielding a re-ranked snapshot each time one
    /// settles and a final snapshot with `is_complete = true`.
    ///
    /// Each snapshot covers every provider settled so far, not a delta.
    /// If `options.cancel` fires, the stream ends without a final snapshot
    /// and nothing is cached.
    pub fn search_stream<'a>(
        &'a self,
        query: &'a str,
        options: SearchOptions,
    ) -> impl Stream<Item = SearchResultPayload> + Send + 'a {
        self.run(query, options, true)
    }

    fn run<'a>(
        &'a self,
        query: &'a str,
        options: SearchOptions,
        emit_partials: bool,
    ) -> impl Stream<Item = SearchResultPayload> + Send + 'a {
        async_stream::stream! {
            let limit = options.limit.unwrap_or(self.config.default_limit);

            if query.trim().is_empty() {
                yield self.empty_payload();
                return;
            }

            tracing::trace!(query, limit, "lyrics search");
            let key = cache_key(query, limit);
            if !options.skip_cache {
                if let Some(hit) = self.cache.get(&key) {
                    tracing::debug!(limit, "search cache hit");
                    yield hit;
                    return;
                }
                tracing::debug!(limit, "search cache miss");
            }

            let analysis = self.analyzer.analyze(query);
            let per_provider_limit = limit.clamp(MIN_PER_PROVIDER_LIMIT, MAX_PER_PROVIDER_LIMIT);

            let mut pending: FuturesUnordered<_> = self
                .providers
                .iter()
                .enumerate()
                .map(|(slot, provider)| {
                    let cancel = options.cancel.clone();
                    async move {
                        let chunk = self.query_provider(provider, query, per_provider_limit, cancel).await;
                        (slot, chunk)
                    }
                })
                .collect();

            // Indexed by registration slot so merges see a fixed order.
            let mut settled: Vec<Option<ProviderChunk>> = vec![None; self.providers.len()];

            loop {
                let next = match (&options.cancel, emit_partials) {
                    (Some(token), true) => tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            tracing::debug!("streaming search cancelled");
                            return;
                        }
                        next = pending.next() => next,
                    },
                    _ => pending.next().await,
                };
                let Some((slot, chunk)) = next else { break };
                settled[slot] = Some(chunk);

                if emit_partials {
                    yield SearchResultPayload {
                        results: merge_chunks(settled.iter().flatten(), &analysis, limit),
                        meta: meta_for(settled.iter().flatten()),
                        is_complete: false,
                    };
                }
            }

            let payload = SearchResultPayload {
                results: merge_chunks(settled.iter().flatten(), &analysis, limit),
                meta: meta_for(settled.iter().flatten()),
                is_complete: true,
            };
            // A cancelled search only reflects the caller's abort, so it is
            // never cached. Provider failures otherwise are, so a known-bad
            // provider is not hammered by repeated identical searches.
            if options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                tracing::debug!("search cancelled, result not cached");
            } else {
                self.cache.set(key, payload.clone(), None);
            }
            yield payload;
        }
    }

    /// Run one provider, converting every failure into an error string.
    async fn query_provider(
        &self,
        provider: &Arc<dyn ProviderAdapter>,
        query: &str,
        limit: usize,
        cancel: Option<CancellationToken>,
    ) -> ProviderChunk {
        let definition = provider.definition();
        let started = Instant::now();

        let response = match self.credential_for(provider.as_ref()).await {
            Ok(credential) => {
                let request = SearchRequest {
                    limit,
                    cancel,
                    credential,
                };
                AssertUnwindSafe(provider.search(query, &request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        ProviderResponse::failed(format!("{} provider panicked", definition.display_name))
                    })
            }
            Err(err) => ProviderResponse::failed(err.to_string()),
        };

        let duration = started.elapsed();
        if response.errors.is_empty() {
            tracing::debug!(
                provider = definition.id,
                count = response.results.len(),
                elapsed_ms = duration_ms(duration),
                "provider returned results"
            );
        } else {
            tracing::warn!(
                provider = definition.id,
                count = response.results.len(),
                errors = ?response.errors,
                "provider reported errors"
            );
        }

        ProviderChunk {
            provider_id: definition.id.to_owned(),
            display_name: definition.display_name.to_owned(),
            results: response.results,
            errors: response.errors,
            duration,
        }
    }

    /// Resolve the API key for a provider that needs one.
    async fn credential_for(&self, provider: &dyn ProviderAdapter) -> Result<Option<String>> {
        let definition = provider.definition();
        if !definition.requires_key {
            return Ok(None);
        }
        match self.credentials.get(definition.id).await? {
            Some(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(LyricsError::MissingCredential(format!(
                "{} API key is not configured",
                definition.display_name
            ))),
        }
    }

    fn provider(&self, provider_id: &str) -> Result<&Arc<dyn ProviderAdapter>> {
        self.providers
            .iter()
            .find(|p| p.id() == provider_id)
            .ok_or_else(|| LyricsError::UnknownProvider(provider_id.to_owned()))
    }

    /// Retrieve full lyrics from the provider that produced `payload`.
    ///
    /// # Errors
    ///
    /// - [`LyricsError::UnknownProvider`] if `provider_id` is not registered
    /// - [`LyricsError::MissingCredential`] if a required key is absent
    /// - otherwise whatever the provider's lyric retrieval returns
    pub async fn fetch_lyrics_by_provider(
        &self,
        provider_id: &str,
        payload: LyricPayload,
        cancel: Option<CancellationToken>,
    ) -> Result<LyricContent> {
        let provider = self.provider(provider_id)?;
        let credential = self.credential_for(provider.as_ref()).await?;
        provider
            .get_lyrics(&LyricsRequest {
                payload,
                cancel,
                credential,
            })
            .await
    }

    /// Every registered provider with its `configured` flag.
    pub async fn list_provider_definitions(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let definition = provider.definition();
            let configured = if definition.requires_key {
                match self.credentials.get(definition.id).await {
                    Ok(key) => key.is_some_and(|k| !k.trim().is_empty()),
                    Err(err) => {
                        tracing::warn!(provider = definition.id, error = %err, "credential lookup failed");
                        false
                    }
                }
            } else {
                true
            };
            statuses.push(ProviderStatus {
                definition: definition.clone(),
                configured,
            });
        }
        statuses
    }

    /// Store an API key for a registered provider; an empty value clears it.
    pub async fn save_provider_key(&self, provider_id: &str, value: &str) -> Result<()> {
        self.provider(provider_id)?;
        self.credentials.set(provider_id, value).await
    }

    /// Remove a provider's API key. Removing a missing key succeeds.
    pub async fn remove_provider_key(&self, provider_id: &str) -> Result<()> {
        self.provider(provider_id)?;
        self.credentials.delete(provider_id).await
    }

    /// Whether a registered provider has a key stored.
    pub async fn provider_key_state(&self, provider_id: &str) -> Result<ProviderKeyState> {
        self.provider(provider_id)?;
        let key = self.credentials.get(provider_id).await?;
        Ok(ProviderKeyState {
            has_key: key.is_some_and(|k| !k.trim().is_empty()),
        })
    }

    /// Payload for an empty query: no results, a zero entry per provider.
    fn empty_payload(&self) -> SearchResultPayload {
        SearchResultPayload {
            results: Vec::new(),
            meta: SearchMeta {
                providers: self
                    .providers
                    .iter()
                    .map(|p| {
                        let definition = p.definition();
                        ProviderMeta {
                            id: definition.id.to_owned(),
                            display_name: definition.display_name.to_owned(),
                            count: 0,
                            errors: Vec::new(),
                            duration_ms: 0,
                        }
                    })
                    .collect(),
            },
            is_complete: true,
        }
    }
}

fn meta_for<'a, I>(chunks: I) -> SearchMeta
where
    I: IntoIterator<Item = &'a ProviderChunk>,
{
    SearchMeta {
        providers: chunks.into_iter().map(ProviderChunk::meta).collect(),
    }
}
