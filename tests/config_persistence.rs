//! Integration tests: config file persistence and engine construction.

use std::sync::Arc;

use canticle::{AppConfig, AppError, build_engine};
use canticle_search::MemoryCredentialStore;

#[test]
fn config_roundtrips_through_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig {
        providers: vec!["hymnary".into(), "lrclib".into()],
        ..AppConfig::default()
    };
    config.search.default_limit = 7;
    config.search.user_agent = Some("canticle-test/1.0".into());
    config.search.known_artists = vec!["fernando ortega".into()];

    config.save_to_file(&path).expect("save");
    let restored = AppConfig::from_file(&path).expect("load");

    assert_eq!(restored, config);
}

#[test]
fn load_explicit_path_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "providers = [\"genius\", \"songlyrics\"]\n").expect("write");

    let err = AppConfig::load(Some(&path)).expect_err("unknown provider");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn load_explicit_missing_file_is_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
    assert!(matches!(err, AppError::Io(_)));
}

#[test]
fn malformed_toml_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[search\ndefault_limit = ").expect("write");

    let err = AppConfig::from_file(&path).expect_err("malformed");
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn engine_from_saved_config_lists_providers_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    let config = AppConfig {
        providers: vec!["hymnal-net".into(), "genius".into()],
        ..AppConfig::default()
    };
    config.save_to_file(&path).expect("save");

    let loaded = AppConfig::load(Some(&path)).expect("load");
    let engine = build_engine(&loaded, Arc::new(MemoryCredentialStore::new())).expect("engine");

    let statuses = engine.list_provider_definitions().await;
    let ids: Vec<&str> = statuses.iter().map(|s| s.definition.id).collect();
    assert_eq!(ids, vec!["hymnal-net", "genius"]);
    assert!(statuses[0].configured);
    assert!(!statuses[1].configured);
}

#[tokio::test]
async fn empty_query_needs_no_network() {
    let engine = build_engine(
        &AppConfig::default(),
        Arc::new(MemoryCredentialStore::new()),
    )
    .expect("engine");

    let payload = engine
        .search("   ", canticle_search::SearchOptions::default())
        .await;
    assert!(payload.results.is_empty());
    assert!(payload.is_complete);
    assert_eq!(payload.meta.providers.len(), 4);
}
