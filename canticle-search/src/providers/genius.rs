//! Genius provider.
//!
//! Search goes through the authenticated JSON API (`/search?q=`, bearer
//! token). Lyrics are not exposed by the API and are scraped from the
//! song page's `[data-lyrics-container]` blocks.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::Deserialize;
use url::Url;

use crate::error::{LyricsError, Result};
use crate::fetch::fetch_with_timeout;
use crate::http::make_snippet;
use crate::provider::{LyricsRequest, ProviderAdapter, ProviderResponse, SearchRequest};
use crate::types::{
    LyricContent, LyricPayload, ProviderDefinition, ProviderFeature, SearchCandidate,
};

use super::{fetch_text, foreign_payload, push_collapsed, selector, trim_lines};

pub const DEFINITION: ProviderDefinition = ProviderDefinition {
    id: "genius",
    display_name: "Genius",
    requires_key: true,
    supported_features: &[ProviderFeature::Search, ProviderFeature::Lyrics],
};

const API_BASE_URL: &str = "https://api.genius.com";

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    kind: String,
    result: SongResult,
}

#[derive(Debug, Deserialize)]
struct SongResult {
    id: u64,
    title: String,
    full_title: Option<String>,
    url: String,
    primary_artist: Option<Artist>,
    release_date_for_display: Option<String>,
    lyrics_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

/// Genius lyric provider. Requires an API access token.
pub struct GeniusProvider {
    client: reqwest::Client,
    api_base_url: String,
    timeout: Duration,
}

impl GeniusProvider {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            api_base_url: API_BASE_URL.to_owned(),
            timeout,
        }
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_search(
        &self,
        query: &str,
        limit: usize,
        token: &str,
    ) -> Result<Vec<SearchCandidate>> {
        tracing::trace!(query, "querying Genius");
        let url = Url::parse_with_params(&format!("{}/search", self.api_base_url), &[("q", query)])
            .map_err(|e| LyricsError::Http(format!("invalid Genius URL: {e}")))?;
        let body = fetch_text(self.client.get(url).bearer_auth(token), "Genius").await?;
        parse_search_response(&body, limit)
    }

    async fn fetch_song_page(&self, url: &str, title: &str, artist: &str) -> Result<LyricContent> {
        tracing::trace!(url, "fetching Genius song page");
        let html = fetch_text(self.client.get(url), "Genius").await?;
        let lyrics = parse_lyrics_html(&html)?;
        Ok(LyricContent {
            provider: DEFINITION.id.to_owned(),
            title: title.to_owned(),
            artist: artist.to_owned(),
            lyrics,
            copyright: None,
            source_url: Some(url.to_owned()),
        })
    }
}

#[async_trait]
impl ProviderAdapter for GeniusProvider {
    fn definition(&self) -> &ProviderDefinition {
        &DEFINITION
    }

    async fn search(&self, query: &str, request: &SearchRequest) -> ProviderResponse {
        let Some(token) = request.credential.as_deref() else {
            return ProviderResponse::failed(
                LyricsError::MissingCredential("Genius API key is not configured".into())
                    .to_string(),
            );
        };
        let fetch = self.fetch_search(query, request.limit, token);
        match fetch_with_timeout(fetch, self.timeout, request.cancel.as_ref()).await {
            Ok(results) => ProviderResponse {
                results,
                errors: Vec::new(),
            },
            Err(e) => ProviderResponse::failed(e.to_string()),
        }
    }

    async fn get_lyrics(&self, request: &LyricsRequest) -> Result<LyricContent> {
        let LyricPayload::Genius {
            url, title, artist, ..
        } = &request.payload
        else {
            return Err(foreign_payload(DEFINITION.display_name, &request.payload));
        };
        fetch_with_timeout(
            self.fetch_song_page(url, title, artist),
            self.timeout,
            request.cancel.as_ref(),
        )
        .await
    }
}

/// Parse the API search response into at most `limit` song candidates.
pub(crate) fn parse_search_response(body: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|e| LyricsError::Parse(format!("Genius search response: {e}")))?;

    let candidates = envelope
        .response
        .hits
        .into_iter()
        .filter(|hit| hit.kind == "song")
        .take(limit)
        .map(|hit| {
            let song = hit.result;
            let artist = song
                .primary_artist
                .map(|a| a.name)
                .unwrap_or_default();

            let mut metadata = BTreeMap::new();
            if let Some(date) = song.release_date_for_display {
                metadata.insert("release_date".to_owned(), date);
            }
            if let Some(state) = song.lyrics_state {
                metadata.insert("lyrics_state".to_owned(), state);
            }

            SearchCandidate {
                id: format!("genius:{}", song.id),
                provider: DEFINITION.id.to_owned(),
                snippet: make_snippet(song.full_title.as_deref().unwrap_or(&song.title)),
                payload: LyricPayload::Genius {
                    song_id: song.id,
                    url: song.url,
                    title: song.title.clone(),
                    artist: artist.clone(),
                },
                title: song.title,
                artist,
                album: None,
                metadata,
            }
        })
        .collect();

    Ok(candidates)
}

/// Extract lyrics from a Genius song page.
///
/// Every `[data-lyrics-container="true"]` block contributes its text in
/// document order; `<br>` becomes a newline and annotation chrome marked
/// `data-exclude-from-selection` is skipped.
pub(crate) fn parse_lyrics_html(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let container_sel = selector(r#"[data-lyrics-container="true"]"#)?;

    let blocks: Vec<String> = document
        .select(&container_sel)
        .map(|container| {
            let mut raw = String::new();
            collect_lyric_text(container, &mut raw);
            trim_lines(&raw)
        })
        .filter(|block| !block.is_empty())
        .collect();

    if blocks.is_empty() {
        return Err(LyricsError::NotFound(
            "Genius page has no lyrics container".into(),
        ));
    }
    Ok(blocks.join("\n"))
}

fn collect_lyric_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_collapsed(out, text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if el.attr("data-exclude-from-selection").is_some() => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_lyric_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}
