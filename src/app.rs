//! Engine construction from application configuration.

use std::sync::Arc;

use canticle_search::providers::build_providers;
use canticle_search::{CredentialStore, LyricsEngine};

use crate::config::AppConfig;
use crate::error::Result;

/// Build a [`LyricsEngine`] with the configured providers, in order.
///
/// # Errors
///
/// Fails if the config is invalid or the HTTP client cannot be built.
pub fn build_engine(
    config: &AppConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<LyricsEngine> {
    config.validate()?;
    let providers = build_providers(config.providers.as_slice(), &config.search)?;
    tracing::debug!(providers = ?config.providers, "building lyrics engine");
    Ok(LyricsEngine::new(
        providers,
        credentials,
        config.search.clone(),
    )?)
}
