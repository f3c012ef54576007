//! Error types for the canticle-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No API keys or sensitive data appear in
//! error messages.

/// Errors that can occur during lyric search and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LyricsError {
    /// A provider id was referenced that is not registered with the engine.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// A provider requires an API key and none is stored.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// The upstream source has no lyrics for the given reference.
    #[error("lyrics not found: {0}")]
    NotFound(String),

    /// A request was aborted, either by its deadline or by the caller's
    /// cancellation token. The two causes are not distinguished.
    #[error("timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid engine configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The credential store failed.
    #[error("credential store error: {0}")]
    Credential(String),
}

/// Convenience type alias for canticle-search results.
pub type Result<T> = std::result::Result<T, LyricsError>;
