//! LRCLIB provider.
//!
//! Uses the public JSON API: `GET /api/search?q=` for candidates and
//! `GET /api/get/{id}` for the full record. No API key is needed.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{LyricsError, Result};
use crate::fetch::fetch_with_timeout;
use crate::http::make_snippet;
use crate::provider::{LyricsRequest, ProviderAdapter, ProviderResponse, SearchRequest};
use crate::types::{
    LyricContent, LyricPayload, ProviderDefinition, ProviderFeature, SearchCandidate,
};

use super::{fetch_text, foreign_payload};

pub const DEFINITION: ProviderDefinition = ProviderDefinition {
    id: "lrclib",
    display_name: "LRCLIB",
    requires_key: false,
    supported_features: &[ProviderFeature::Search, ProviderFeature::Lyrics],
};

const BASE_URL: &str = "https://lrclib.net";

/// One track record as returned by both LRCLIB endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibRecord {
    id: u64,
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    artist_name: String,
    album_name: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    /// Plain lyrics, falling back to synced lyrics with timestamps removed.
    fn lyrics_text(&self) -> Option<String> {
        let plain = self
            .plain_lyrics
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = plain {
            return Some(text.to_owned());
        }
        self.synced_lyrics
            .as_deref()
            .map(strip_timestamps)
            .filter(|text| !text.is_empty())
    }
}

/// LRCLIB lyric provider.
pub struct LrclibProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl LrclibProvider {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_owned(),
            timeout,
        }
    }

    /// Point the provider at a mirror instead of `lrclib.net`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        tracing::trace!(query, "querying LRCLIB");
        let url = Url::parse_with_params(&format!("{}/api/search", self.base_url), &[("q", query)])
            .map_err(|e| LyricsError::Http(format!("invalid LRCLIB URL: {e}")))?;
        let body = fetch_text(self.client.get(url), "LRCLIB").await?;
        parse_search_response(&body, limit)
    }

    async fn fetch_record(&self, id: u64) -> Result<LyricContent> {
        let url = format!("{}/api/get/{id}", self.base_url);
        let body = fetch_text(self.client.get(&url), "LRCLIB").await?;
        parse_record_response(&body, &self.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for LrclibProvider {
    fn definition(&self) -> &ProviderDefinition {
        &DEFINITION
    }

    async fn search(&self, query: &str, request: &SearchRequest) -> ProviderResponse {
        let fetch = self.fetch_search(query, request.limit);
        match fetch_with_timeout(fetch, self.timeout, request.cancel.as_ref()).await {
            Ok(results) => ProviderResponse {
                results,
                errors: Vec::new(),
            },
            Err(e) => ProviderResponse::failed(e.to_string()),
        }
    }

    async fn get_lyrics(&self, request: &LyricsRequest) -> Result<LyricContent> {
        let LyricPayload::Lrclib { id } = request.payload else {
            return Err(foreign_payload(DEFINITION.display_name, &request.payload));
        };
        fetch_with_timeout(self.fetch_record(id), self.timeout, request.cancel.as_ref()).await
    }
}

/// Parse the `/api/search` response body into at most `limit` candidates.
///
/// Instrumental records carry no lyrics and are skipped.
pub(crate) fn parse_search_response(body: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
    let records: Vec<LrclibRecord> = serde_json::from_str(body)
        .map_err(|e| LyricsError::Parse(format!("LRCLIB search response: {e}")))?;

    let candidates = records
        .into_iter()
        .filter(|record| !record.instrumental)
        .take(limit)
        .map(|record| {
            let snippet = record
                .lyrics_text()
                .map(|text| make_snippet(&text))
                .unwrap_or_default();

            let mut metadata = BTreeMap::new();
            if let Some(duration) = record.duration {
                metadata.insert("duration".to_owned(), format!("{duration:.0}"));
            }
            if record.synced_lyrics.is_some() {
                metadata.insert("synced".to_owned(), "true".to_owned());
            }

            SearchCandidate {
                id: format!("lrclib:{}", record.id),
                provider: DEFINITION.id.to_owned(),
                title: record.track_name,
                artist: record.artist_name,
                album: record.album_name.filter(|a| !a.trim().is_empty()),
                snippet,
                payload: LyricPayload::Lrclib { id: record.id },
                metadata,
            }
        })
        .collect();

    Ok(candidates)
}

/// Parse the `/api/get/{id}` response body; `source_url` points at `base_url`.
pub(crate) fn parse_record_response(body: &str, base_url: &str) -> Result<LyricContent> {
    let record: LrclibRecord = serde_json::from_str(body)
        .map_err(|e| LyricsError::Parse(format!("LRCLIB record response: {e}")))?;

    if record.instrumental {
        return Err(LyricsError::NotFound(format!(
            "LRCLIB record {} is instrumental",
            record.id
        )));
    }
    let lyrics = record
        .lyrics_text()
        .ok_or_else(|| LyricsError::NotFound(format!("LRCLIB record {} has no lyrics", record.id)))?;

    Ok(LyricContent {
        provider: DEFINITION.id.to_owned(),
        title: record.track_name,
        artist: record.artist_name,
        lyrics,
        copyright: None,
        source_url: Some(format!("{base_url}/api/get/{}", record.id)),
    })
}

/// Drop leading `[mm:ss.xx]` tags from every line of an LRC document.
fn strip_timestamps(lrc: &str) -> String {
    lrc.lines()
        .map(|line| {
            let mut rest = line.trim();
            while let Some(tail) = rest.strip_prefix('[') {
                match tail.find(']') {
                    Some(end) => rest = tail[end + 1..].trim_start(),
                    None => break,
                }
            }
            rest
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}
