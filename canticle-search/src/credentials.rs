//! Credential-store boundary for provider API keys.
//!
//! The engine never persists secrets itself. It asks a [`CredentialStore`]
//! for the key of any provider whose definition requires one. The
//! application crate supplies a platform keyring implementation;
//! [`MemoryCredentialStore`] serves tests and embedders.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Secure storage for provider API keys, keyed by provider id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the stored key, or `None` if there is none.
    async fn get(&self, provider_id: &str) -> Result<Option<String>>;

    /// Store `value`, overwriting any previous key. An empty (or
    /// whitespace-only) value clears the key instead.
    async fn set(&self, provider_id: &str, value: &str) -> Result<()>;

    /// Remove the key. Deleting a missing key succeeds.
    async fn delete(&self, provider_id: &str) -> Result<()>;
}

/// Whether a provider currently has a key stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderKeyState {
    pub has_key: bool,
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(provider_id, key)` pairs.
    pub fn with_keys<I, K, V>(keys: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keys: Mutex::new(
                keys.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, provider_id: &str) -> Result<Option<String>> {
        let keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.get(provider_id).cloned())
    }

    async fn set(&self, provider_id: &str, value: &str) -> Result<()> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        let value = value.trim();
        if value.is_empty() {
            keys.remove(provider_id);
        } else {
            keys.insert(provider_id.to_owned(), value.to_owned());
        }
        Ok(())
    }

    async fn delete(&self, provider_id: &str) -> Result<()> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.remove(provider_id);
        Ok(())
    }
}
