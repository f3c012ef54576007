//! Engine configuration with sensible defaults.
//!
//! [`SearchConfig`] controls result limits, provider timeouts, response
//! caching and the artist list the query analyzer matches against.

use serde::{Deserialize, Serialize};

use crate::error::LyricsError;

/// Artists recognised in free-text queries that carry no explicit
/// `"by"` or `" - "` delimiter.
pub const DEFAULT_KNOWN_ARTISTS: &[&str] = &[
    "chris tomlin",
    "hillsong united",
    "hillsong worship",
    "elevation worship",
    "bethel music",
    "matt redman",
    "phil wickham",
    "lauren daigle",
    "casting crowns",
    "maverick city music",
    "keith getty",
    "kristyn getty",
    "crowder",
    "cece winans",
    "brandon lake",
    "kari jobe",
    "passion",
    "tasha cobbs leonard",
    "for king & country",
    "mercyme",
];

/// Configuration for a [`crate::LyricsEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count used when a search does not specify a limit.
    pub default_limit: usize,
    /// How long a completed search payload stays cached, in seconds.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached payloads.
    pub cache_max_entries: usize,
    /// Per-request provider deadline in seconds.
    pub request_timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// Artist names recognised by the query analyzer (case-insensitive).
    pub known_artists: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            cache_ttl_seconds: 300,
            cache_max_entries: 100,
            request_timeout_seconds: crate::fetch::DEFAULT_FETCH_TIMEOUT.as_secs(),
            user_agent: None,
            known_artists: DEFAULT_KNOWN_ARTISTS
                .iter()
                .map(|a| (*a).to_owned())
                .collect(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `default_limit` must be greater than 0
    /// - `request_timeout_seconds` must be greater than 0
    /// - `cache_max_entries` must be greater than 0
    pub fn validate(&self) -> Result<(), LyricsError> {
        if self.default_limit == 0 {
            return Err(LyricsError::Config(
                "default_limit must be greater than 0".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(LyricsError::Config(
                "request_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(LyricsError::Config(
                "cache_max_entries must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Per-request provider deadline.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    /// Default cache time-to-live.
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_seconds)
    }
}
