//! Shared HTTP client with User-Agent rotation for provider requests.
//!
//! Provides a configured [`reqwest::Client`] with browser-like headers,
//! cookie support, and rotating User-Agent strings. Adapters also share
//! the small text helpers here for tidying scraped content.

use crate::config::SearchConfig;
use crate::error::LyricsError;
use rand::seq::SliceRandom;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:140.0) Gecko/20100101 Firefox/140.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:140.0) Gecko/20100101 Firefox/140.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

/// Sent with every request; JSON APIs and HTML pages both accept it.
const ACCEPT: &str = "text/html,application/json;q=0.9,*/*;q=0.8";

/// Maximum snippet length in characters.
pub const SNIPPET_MAX_CHARS: usize = 160;

/// Build a [`reqwest::Client`] shared by all built-in adapters.
///
/// The client has:
/// - Cookie store enabled
/// - Request timeout from config (adapters add their own deadline on top)
/// - Browser-like `Accept` and `Accept-Language` defaults
/// - Random User-Agent from built-in rotation list (or custom if configured)
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`LyricsError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, LyricsError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static(ACCEPT),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US,en;q=0.8"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .timeout(config.request_timeout())
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| LyricsError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array; choose only returns None on empty slices.
        .unwrap_or(USER_AGENTS[0])
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed excerpt of at most [`SNIPPET_MAX_CHARS`] characters.
pub fn make_snippet(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(SNIPPET_MAX_CHARS - 1).collect();
    cut.push('…');
    cut
}
