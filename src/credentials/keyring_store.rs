//! Cross-platform credential storage via the `keyring` crate.
//!
//! Backends:
//! - **macOS**: Keychain Services
//! - **Windows**: Windows Credential Manager
//! - **Linux**: kernel keyutils
//!
//! `keyring` calls block, so each one runs on the blocking thread pool.

use async_trait::async_trait;
use canticle_search::{CredentialStore, LyricsError};

use crate::error::AppError;

/// Service name for all canticle credentials in the platform store.
pub const SERVICE_NAME: &str = "canticle-credentials";

/// Keyring account holding a provider's API key.
pub fn account_for(provider: &str) -> String {
    format!("provider.{provider}.api_key")
}

/// Credential store backed by the operating system's keyring.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Store entries under a different service name, e.g. to isolate tests.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(service: &str, provider: &str) -> Result<keyring::Entry, AppError> {
        keyring::Entry::new(service, &account_for(provider))
            .map_err(|e| AppError::Credential(format!("Failed to create keyring entry: {e}")))
    }

    async fn blocking<T, F>(&self, provider: &str, op: F) -> canticle_search::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T, AppError> + Send + 'static,
    {
        let service = self.service.clone();
        let provider = provider.to_owned();
        tokio::task::spawn_blocking(move || {
            let entry = Self::entry(&service, &provider)?;
            op(entry)
        })
        .await
        .map_err(|e| LyricsError::Credential(format!("keyring task failed: {e}")))?
        .map_err(LyricsError::from)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self, provider: &str) -> canticle_search::Result<Option<String>> {
        self.blocking(provider, |entry| match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::Credential(format!(
                "Failed to retrieve credential: {e}"
            ))),
        })
        .await
    }

    async fn set(&self, provider: &str, value: &str) -> canticle_search::Result<()> {
        let value = value.trim().to_owned();
        if value.is_empty() {
            return self.delete(provider).await;
        }
        tracing::debug!(provider, "storing provider key");
        self.blocking(provider, move |entry| {
            entry
                .set_password(&value)
                .map_err(|e| AppError::Credential(format!("Failed to store credential: {e}")))
        })
        .await
    }

    async fn delete(&self, provider: &str) -> canticle_search::Result<()> {
        self.blocking(provider, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::Credential(format!(
                "Failed to delete credential: {e}"
            ))),
        })
        .await
    }
}
