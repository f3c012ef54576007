//! Provider API key storage.
//!
//! The search engine talks to a [`canticle_search::CredentialStore`]; this
//! module supplies the platform-backed implementation used by the binary.
//!
//! ```no_run
//! use canticle::credentials::KeyringCredentialStore;
//! use canticle_search::CredentialStore;
//!
//! # async fn example() -> canticle_search::Result<()> {
//! let store = KeyringCredentialStore::new();
//! store.set("genius", "token").await?;
//! assert!(store.get("genius").await?.is_some());
//! # Ok(())
//! # }
//! ```

mod keyring_store;

pub use keyring_store::{KeyringCredentialStore, SERVICE_NAME, account_for};
