//! Built-in provider implementations.
//!
//! Each module provides a struct implementing
//! [`crate::provider::ProviderAdapter`] for one content source, plus pure
//! parse functions for that source's response bodies.

pub mod genius;
pub mod hymnal_net;
pub mod hymnary;
pub mod lrclib;

use std::sync::Arc;

use scraper::node::Node;
use scraper::{ElementRef, Selector};

use crate::config::SearchConfig;
use crate::error::{LyricsError, Result};
use crate::http;
use crate::provider::ProviderAdapter;
use crate::types::{LyricPayload, ProviderDefinition};

pub use genius::GeniusProvider;
pub use hymnal_net::HymnalNetProvider;
pub use hymnary::HymnaryProvider;
pub use lrclib::LrclibProvider;

/// Definitions of every built-in provider, in default registration order.
pub fn builtin_definitions() -> [&'static ProviderDefinition; 4] {
    [
        &lrclib::DEFINITION,
        &genius::DEFINITION,
        &hymnary::DEFINITION,
        &hymnal_net::DEFINITION,
    ]
}

/// Ids of every built-in provider, in default registration order.
pub fn builtin_ids() -> Vec<String> {
    builtin_definitions()
        .iter()
        .map(|d| d.id.to_owned())
        .collect()
}

/// Instantiate the built-in provider with the given id.
///
/// # Errors
///
/// Returns [`LyricsError::UnknownProvider`] for ids with no built-in adapter.
pub fn build_provider(
    id: &str,
    client: reqwest::Client,
    config: &SearchConfig,
) -> Result<Arc<dyn ProviderAdapter>> {
    let timeout = config.request_timeout();
    let provider: Arc<dyn ProviderAdapter> = match id {
        "lrclib" => Arc::new(LrclibProvider::new(client, timeout)),
        "genius" => Arc::new(GeniusProvider::new(client, timeout)),
        "hymnary" => Arc::new(HymnaryProvider::new(client, timeout)),
        "hymnal-net" => Arc::new(HymnalNetProvider::new(client, timeout)),
        other => return Err(LyricsError::UnknownProvider(other.to_owned())),
    };
    Ok(provider)
}

/// Instantiate the listed providers, sharing one HTTP client.
///
/// # Errors
///
/// Fails on the first unknown id or if the HTTP client cannot be built.
pub fn build_providers<S: AsRef<str>>(
    ids: &[S],
    config: &SearchConfig,
) -> Result<Vec<Arc<dyn ProviderAdapter>>> {
    let client = http::build_client(config)?;
    ids.iter()
        .map(|id| build_provider(id.as_ref(), client.clone(), config))
        .collect()
}

/// Parse a CSS selector, mapping failures to [`LyricsError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LyricsError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// Text of an element with `<br>` rendered as newlines and each line trimmed.
pub(crate) fn text_with_breaks(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => push_collapsed(&mut out, text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    trim_lines(&out)
}

/// Append `text` with source whitespace runs folded into single spaces.
pub(crate) fn push_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
}

/// Trim every line and the block as a whole.
pub(crate) fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Send `request` and return the response body.
///
/// A 404 becomes [`LyricsError::NotFound`]; other non-success statuses and
/// transport failures become [`LyricsError::Http`].
pub(crate) async fn fetch_text(request: reqwest::RequestBuilder, source: &str) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| LyricsError::Http(format!("{source} request failed: {e}")))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(LyricsError::NotFound(format!("{source} returned 404")));
    }
    if !status.is_success() {
        return Err(LyricsError::Http(format!("{source} returned HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| LyricsError::Http(format!("failed to read {source} response: {e}")))
}

/// Error for a payload routed to the wrong provider.
pub(crate) fn foreign_payload(expected: &str, payload: &LyricPayload) -> LyricsError {
    LyricsError::Parse(format!(
        "{expected} cannot resolve a {} payload",
        payload.provider_id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn builtin_ids_in_registration_order() {
        assert_eq!(
            builtin_ids(),
            vec!["lrclib", "genius", "hymnary", "hymnal-net"]
        );
    }

    #[test]
    fn only_genius_requires_key() {
        let keyed: Vec<&str> = builtin_definitions()
            .iter()
            .filter(|d| d.requires_key)
            .map(|d| d.id)
            .collect();
        assert_eq!(keyed, vec!["genius"]);
    }

    #[test]
    fn build_providers_preserves_order() {
        let providers =
            build_providers(&["hymnary", "lrclib"], &SearchConfig::default()).expect("build");
        let ids: Vec<&str> = providers.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["hymnary", "lrclib"]);
    }

    #[test]
    fn build_provider_rejects_unknown_id() {
        let client = reqwest::Client::new();
        let err = build_provider("azlyrics", client, &SearchConfig::default())
            .err()
            .expect("unknown id should fail");
        assert_eq!(err, LyricsError::UnknownProvider("azlyrics".into()));
    }

    #[test]
    fn text_with_breaks_renders_line_breaks() {
        let html = Html::parse_fragment("<div>  Amazing grace<br>how sweet<br/>  the <i>sound</i> </div>");
        let div = html
            .select(&selector("div").expect("selector"))
            .next()
            .expect("div");
        assert_eq!(text_with_breaks(div), "Amazing grace\nhow sweet\nthe sound");
    }
}
