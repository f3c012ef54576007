//! Integration tests for the federated search engine.
//!
//! These drive `LyricsEngine` end to end with mock providers (no network):
//! fan-out, failure isolation, ranking, dedup, caching, streaming and
//! cancellation. Time is paused so staggered provider delays are
//! deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use canticle_search::fetch::fetch_with_timeout;
use canticle_search::types::ProviderFeature;
use canticle_search::{
    LyricContent, LyricPayload, LyricsEngine, LyricsError, LyricsRequest, MemoryCredentialStore,
    ProviderAdapter, ProviderDefinition, ProviderResponse, SearchCandidate, SearchConfig,
    SearchOptions, SearchRequest,
};

const FEATURES: &[ProviderFeature] = &[ProviderFeature::Search, ProviderFeature::Lyrics];

fn definition(id: &'static str, display_name: &'static str) -> ProviderDefinition {
    ProviderDefinition {
        id,
        display_name,
        requires_key: false,
        supported_features: FEATURES,
    }
}

enum Behaviour {
    Succeed,
    Fail(&'static str),
    Panic,
    /// Sleeps past the given timeout inside `fetch_with_timeout`.
    Hang(Duration),
}

struct MockProvider {
    definition: ProviderDefinition,
    delay: Duration,
    songs: Vec<(&'static str, &'static str)>,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(id: &'static str, delay_ms: u64, songs: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            definition: definition(id, id),
            delay: Duration::from_millis(delay_ms),
            songs,
            behaviour: Behaviour::Succeed,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn candidates(&self) -> Vec<SearchCandidate> {
        self.songs
            .iter()
            .enumerate()
            .map(|(i, (title, artist))| SearchCandidate {
                id: format!("{}:{i}", self.definition.id),
                provider: self.definition.id.to_owned(),
                title: (*title).to_owned(),
                artist: (*artist).to_owned(),
                album: None,
                snippet: String::new(),
                payload: LyricPayload::Lrclib { id: i as u64 },
                metadata: Default::default(),
            })
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn search(&self, _query: &str, request: &SearchRequest) -> ProviderResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.behaviour {
            Behaviour::Succeed => ProviderResponse {
                results: self.candidates(),
                errors: Vec::new(),
            },
            Behaviour::Fail(message) => ProviderResponse::failed(*message),
            Behaviour::Panic => panic!("mock provider exploded"),
            Behaviour::Hang(timeout) => {
                let slow = async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(self.candidates())
                };
                match fetch_with_timeout(slow, *timeout, request.cancel.as_ref()).await {
                    Ok(results) => ProviderResponse {
                        results,
                        errors: Vec::new(),
                    },
                    Err(e) => ProviderResponse::failed(e.to_string()),
                }
            }
        }
    }

    async fn get_lyrics(&self, request: &LyricsRequest) -> canticle_search::Result<LyricContent> {
        match request.payload {
            LyricPayload::Lrclib { id } => Ok(LyricContent {
                provider: self.definition.id.to_owned(),
                title: format!("song {id}"),
                artist: String::new(),
                lyrics: "Hallelujah".into(),
                copyright: None,
                source_url: None,
            }),
            _ => Err(LyricsError::NotFound("mock only knows lrclib payloads".into())),
        }
    }
}

fn engine_with(providers: Vec<Arc<MockProvider>>) -> LyricsEngine {
    let adapters: Vec<Arc<dyn ProviderAdapter>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn ProviderAdapter>)
        .collect();
    LyricsEngine::new(
        adapters,
        Arc::new(MemoryCredentialStore::new()),
        SearchConfig::default(),
    )
    .expect("valid engine")
}

fn meta_ids(payload: &canticle_search::SearchResultPayload) -> Vec<&str> {
    payload.meta.providers.iter().map(|m| m.id.as_str()).collect()
}

// ── Failure isolation ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn every_provider_reported_even_when_failing() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let beta = Arc::new(
        MockProvider::new("beta", 20, vec![]).with_behaviour(Behaviour::Fail("HTTP error: boom")),
    );
    let gamma = Arc::new(MockProvider::new("gamma", 5, vec![]).with_behaviour(Behaviour::Panic));
    let engine = engine_with(vec![alpha, beta, gamma]);

    let payload = engine.search("oceans", SearchOptions::default()).await;

    assert!(payload.is_complete);
    assert_eq!(meta_ids(&payload), vec!["alpha", "beta", "gamma"]);
    assert_eq!(payload.meta.failed_providers(), 2);
    assert_eq!(payload.meta.providers[0].count, 1);
    assert!(payload.meta.providers[0].errors.is_empty());
    assert_eq!(payload.meta.providers[1].errors, vec!["HTTP error: boom"]);
    assert_eq!(
        payload.meta.providers[2].errors,
        vec!["gamma provider panicked"]
    );
    assert_eq!(payload.results.len(), 1);
    assert_eq!(payload.results[0].provider, "alpha");
}

#[tokio::test(start_paused = true)]
async fn provider_timeout_becomes_error_string() {
    let slow = Arc::new(
        MockProvider::new("slow", 0, vec![("Oceans", "Hillsong United")])
            .with_behaviour(Behaviour::Hang(Duration::from_millis(50))),
    );
    let engine = engine_with(vec![slow]);

    let payload = engine.search("oceans", SearchOptions::default()).await;
    assert!(payload.results.is_empty());
    assert_eq!(
        payload.meta.providers[0].errors,
        vec!["timed out: request exceeded 50ms"]
    );
}

#[tokio::test(start_paused = true)]
async fn hung_provider_times_out_without_blocking_siblings() {
    let healthy = Arc::new(MockProvider::new(
        "healthy",
        10,
        vec![("Oceans", "Hillsong United")],
    ));
    let hung = Arc::new(
        MockProvider::new("hung", 0, vec![("Oceans", "Someone")])
            .with_behaviour(Behaviour::Hang(Duration::from_millis(50))),
    );
    let engine = engine_with(vec![hung, healthy]);

    let payload = engine.search("oceans", SearchOptions::default()).await;

    assert_eq!(meta_ids(&payload), vec!["hung", "healthy"]);
    assert_eq!(
        payload.meta.providers[0].errors,
        vec!["timed out: request exceeded 50ms"]
    );
    assert!(payload.meta.providers[1].errors.is_empty());
    assert_eq!(payload.meta.providers[1].count, 1);
    assert_eq!(payload.results.len(), 1);
    assert_eq!(payload.results[0].provider, "healthy");
}

#[tokio::test(start_paused = true)]
async fn cancelled_search_settles_every_provider_at_once() {
    let deadline = Duration::from_secs(10);
    let first = Arc::new(
        MockProvider::new("first", 0, vec![("Oceans", "Hillsong United")])
            .with_behaviour(Behaviour::Hang(deadline)),
    );
    let second = Arc::new(
        MockProvider::new("second", 0, vec![("Oceans", "Someone")])
            .with_behaviour(Behaviour::Hang(deadline)),
    );
    let engine = engine_with(vec![first.clone(), second.clone()]);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let options = SearchOptions {
        cancel: Some(token),
        ..SearchOptions::default()
    };
    let payload = engine.search("oceans", options).await;

    assert!(started.elapsed() < deadline);
    assert!(payload.is_complete);
    assert!(payload.results.is_empty());
    for meta in &payload.meta.providers {
        assert_eq!(meta.errors, vec!["timed out: request exceeded 10000ms"]);
    }

    // The aborted payload was not cached, so a fresh search reaches the providers.
    engine.search("oceans", SearchOptions::default()).await;
    assert_eq!(first.calls(), 2);
    assert_eq!(second.calls(), 2);
}

// ── Ranking and dedup ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn exact_match_outranks_earlier_provider() {
    let alpha = Arc::new(MockProvider::new(
        "alpha",
        1,
        vec![("Oceans (Live)", "Tribute Band"), ("Ocean Drive", "Someone")],
    ));
    let beta = Arc::new(MockProvider::new(
        "beta",
        2,
        vec![("Oceans", "Hillsong United")],
    ));
    let engine = engine_with(vec![alpha, beta]);

    let payload = engine
        .search("Oceans by Hillsong United", SearchOptions::default())
        .await;

    assert_eq!(payload.results[0].provider, "beta");
    assert_eq!(payload.results[0].title, "Oceans");
}

#[tokio::test(start_paused = true)]
async fn non_exact_duplicates_collapse_across_providers() {
    let song = ("Amazing Grace (My Chains Are Gone)", "Chris Tomlin");
    let alpha = Arc::new(MockProvider::new("alpha", 5, vec![song]));
    let beta = Arc::new(MockProvider::new("beta", 1, vec![song]));
    let engine = engine_with(vec![alpha, beta]);

    let payload = engine.search("amazing grace", SearchOptions::default()).await;

    assert_eq!(payload.results.len(), 1);
    // Equal scores keep registration order, regardless of arrival order.
    assert_eq!(payload.results[0].provider, "alpha");
}

#[tokio::test(start_paused = true)]
async fn exact_duplicates_survive_per_provider() {
    let song = ("Amazing Grace", "John Newton");
    let alpha = Arc::new(MockProvider::new("alpha", 5, vec![song]));
    let beta = Arc::new(MockProvider::new("beta", 1, vec![song]));
    let engine = engine_with(vec![alpha, beta]);

    let payload = engine.search("amazing grace", SearchOptions::default()).await;

    let providers: Vec<&str> = payload.results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(providers, vec!["alpha", "beta"]);
}

#[tokio::test(start_paused = true)]
async fn results_truncated_to_limit() {
    let alpha = Arc::new(MockProvider::new(
        "alpha",
        1,
        vec![
            ("Holy Holy Holy", "Reginald Heber"),
            ("Holy Spirit", "Francesca Battistelli"),
            ("Holy Ground", "Passion"),
            ("Holy Forever", "Chris Tomlin"),
        ],
    ));
    let engine = engine_with(vec![alpha]);

    let payload = engine.search("holy", SearchOptions::with_limit(2)).await;
    assert_eq!(payload.results.len(), 2);
    assert_eq!(payload.meta.providers[0].count, 4);
}

// ── Caching ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_search_is_served_from_cache() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    let first = engine.search("Oceans", SearchOptions::default()).await;
    let second = engine.search("  oceans ", SearchOptions::default()).await;

    assert_eq!(alpha.calls(), 1);
    assert_eq!(first, second);

    // A different limit is a different cache key.
    engine.search("oceans", SearchOptions::with_limit(3)).await;
    assert_eq!(alpha.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn skip_cache_refetches_and_refreshes() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    engine.search("oceans", SearchOptions::default()).await;
    let options = SearchOptions {
        skip_cache: true,
        ..SearchOptions::default()
    };
    engine.search("oceans", options).await;
    assert_eq!(alpha.calls(), 2);

    engine.search("oceans", SearchOptions::default()).await;
    assert_eq!(alpha.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_searches_are_cached_too() {
    let broken = Arc::new(
        MockProvider::new("broken", 1, vec![]).with_behaviour(Behaviour::Fail("down")),
    );
    let engine = engine_with(vec![broken.clone()]);

    engine.search("oceans", SearchOptions::default()).await;
    engine.search("oceans", SearchOptions::default()).await;
    assert_eq!(broken.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cache_entries_expire() {
    let alpha = Arc::new(MockProvider::new("alpha", 1, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    engine.search("oceans", SearchOptions::default()).await;
    tokio::time::advance(Duration::from_secs(301)).await;
    engine.search("oceans", SearchOptions::default()).await;
    assert_eq!(alpha.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_searches_each_fan_out() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    let (first, second) = tokio::join!(
        engine.search("oceans", SearchOptions::default()),
        engine.search("oceans", SearchOptions::default()),
    );

    assert_eq!(alpha.calls(), 2);
    assert_eq!(first, second);
}

// ── Streaming ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stream_yields_partial_per_provider_then_final() {
    let alpha = Arc::new(MockProvider::new("alpha", 30, vec![("Oceans", "Hillsong United")]));
    let beta = Arc::new(MockProvider::new("beta", 10, vec![("Oceans Deep", "Someone")]));
    let gamma = Arc::new(MockProvider::new("gamma", 20, vec![("Open Oceans", "Another")]));
    let engine = engine_with(vec![alpha, beta, gamma]);

    let snapshots: Vec<_> = engine
        .search_stream("oceans", SearchOptions::default())
        .collect()
        .await;

    assert_eq!(snapshots.len(), 4);
    assert!(snapshots[..3].iter().all(|s| !s.is_complete));
    assert!(snapshots[3].is_complete);

    // Snapshots accumulate in settlement order, meta stays in registration order.
    assert_eq!(meta_ids(&snapshots[0]), vec!["beta"]);
    assert_eq!(meta_ids(&snapshots[1]), vec!["beta", "gamma"]);
    assert_eq!(meta_ids(&snapshots[2]), vec!["alpha", "beta", "gamma"]);
    assert_eq!(snapshots[2].results, snapshots[3].results);
    assert_eq!(snapshots[3].results[0].title, "Oceans");
}

#[tokio::test(start_paused = true)]
async fn stream_cache_hit_yields_single_final_snapshot() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    engine.search("oceans", SearchOptions::default()).await;
    let snapshots: Vec<_> = engine
        .search_stream("oceans", SearchOptions::default())
        .collect()
        .await;

    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].is_complete);
    assert_eq!(alpha.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_query_streams_single_empty_snapshot() {
    let alpha = Arc::new(MockProvider::new("alpha", 10, vec![("Oceans", "Hillsong United")]));
    let engine = engine_with(vec![alpha.clone()]);

    let snapshots: Vec<_> = engine
        .search_stream("", SearchOptions::default())
        .collect()
        .await;

    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].results.is_empty());
    assert_eq!(meta_ids(&snapshots[0]), vec!["alpha"]);
    assert_eq!(alpha.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_stream_ends_without_final_or_cache() {
    let fast = Arc::new(MockProvider::new("fast", 10, vec![("Oceans", "Hillsong United")]));
    let slow = Arc::new(MockProvider::new("slow", 10_000, vec![("Oceans", "Someone")]));
    let engine = engine_with(vec![fast.clone(), slow.clone()]);

    let token = CancellationToken::new();
    let options = SearchOptions {
        cancel: Some(token.clone()),
        ..SearchOptions::default()
    };
    {
        let stream = engine.search_stream("oceans", options);
        futures::pin_mut!(stream);

        let first = stream.next().await.expect("first partial");
        assert!(!first.is_complete);
        assert_eq!(meta_ids(&first), vec!["fast"]);

        token.cancel();
        assert!(stream.next().await.is_none());
    }

    // Nothing was cached, so a fresh search hits both providers again.
    let payload = engine.search("oceans", SearchOptions::default()).await;
    assert!(payload.is_complete);
    assert_eq!(fast.calls(), 2);
    assert_eq!(slow.calls(), 2);
}

// ── Lyrics and registry ───────────────────────────────────────────────

#[tokio::test]
async fn lyrics_routed_to_named_provider() {
    let alpha = Arc::new(MockProvider::new("alpha", 0, vec![]));
    let engine = engine_with(vec![alpha]);

    let content = engine
        .fetch_lyrics_by_provider("alpha", LyricPayload::Lrclib { id: 7 }, None)
        .await
        .expect("lyrics");
    assert_eq!(content.provider, "alpha");
    assert_eq!(content.title, "song 7");

    let err = engine
        .fetch_lyrics_by_provider("missing", LyricPayload::Lrclib { id: 7 }, None)
        .await
        .expect_err("unknown provider");
    assert_eq!(err, LyricsError::UnknownProvider("missing".into()));
}

#[tokio::test]
async fn provider_definitions_in_registration_order() {
    let engine = engine_with(vec![
        Arc::new(MockProvider::new("zeta", 0, vec![])),
        Arc::new(MockProvider::new("alpha", 0, vec![])),
    ]);
    let ids: Vec<&str> = engine
        .list_provider_definitions()
        .await
        .iter()
        .map(|s| s.definition.id)
        .collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
}
