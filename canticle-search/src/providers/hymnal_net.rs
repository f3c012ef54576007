//! Hymnal.net provider.
//!
//! Search results come from `/en/search/all/all/{query}`; lyrics from the
//! stanza table on each hymn page.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::error::{LyricsError, Result};
use crate::fetch::fetch_with_timeout;
use crate::http::{collapse_whitespace, make_snippet};
use crate::provider::{LyricsRequest, ProviderAdapter, ProviderResponse, SearchRequest};
use crate::types::{
    LyricContent, LyricPayload, ProviderDefinition, ProviderFeature, SearchCandidate,
};

use super::{fetch_text, foreign_payload, selector, text_with_breaks};

pub const DEFINITION: ProviderDefinition = ProviderDefinition {
    id: "hymnal-net",
    display_name: "Hymnal.net",
    requires_key: false,
    supported_features: &[ProviderFeature::Search, ProviderFeature::Lyrics],
};

const BASE_URL: &str = "https://www.hymnal.net";

/// Hymnal.net hymn provider.
pub struct HymnalNetProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HymnalNetProvider {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_owned(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LyricsError::Http(format!("invalid Hymnal.net URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| LyricsError::Http("Hymnal.net URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(["en", "search", "all", "all", query]);
        Ok(url)
    }

    async fn fetch_search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        tracing::trace!(query, "querying Hymnal.net");
        let url = self.search_url(query)?;
        let html = fetch_text(self.client.get(url), "Hymnal.net").await?;
        parse_search_html(&html, &self.base_url, limit)
    }

    async fn fetch_hymn_page(&self, url: &str, title: &str) -> Result<LyricContent> {
        tracing::trace!(url, "fetching Hymnal.net hymn page");
        let html = fetch_text(self.client.get(url), "Hymnal.net").await?;
        let mut content = parse_hymn_html(&html, title)?;
        content.source_url = Some(url.to_owned());
        Ok(content)
    }
}

#[async_trait]
impl ProviderAdapter for HymnalNetProvider {
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
        let LyricPayload::HymnalNet { url, title } = &request.payload else {
            return Err(foreign_payload(DEFINITION.display_name, &request.payload));
        };
        fetch_with_timeout(
            self.fetch_hymn_page(url, title),
            self.timeout,
            request.cancel.as_ref(),
        )
        .await
    }
}

/// Human-readable name for a Hymnal.net category code.
fn category_name(code: &str) -> String {
    match code {
        "h" => "Hymns".to_owned(),
        "ns" => "New Songs".to_owned(),
        "c" => "Children".to_owned(),
        "lb" => "Long Beach".to_owned(),
        "nt" => "New Tunes".to_owned(),
        other => other.to_uppercase(),
    }
}

/// Parse a search results page into at most `limit` candidates.
///
/// Only links to `/en/hymn/{category}/{number}` pages are kept.
pub(crate) fn parse_search_html(
    html: &str,
    base_url: &str,
    limit: usize,
) -> Result<Vec<SearchCandidate>> {
    let document = Html::parse_document(html);
    let link_sel = selector("a.list-group-item")?;
    let base = Url::parse(base_url)
        .map_err(|e| LyricsError::Parse(format!("invalid base URL {base_url}: {e}")))?;

    let mut results = Vec::new();
    for link in document.select(&link_sel) {
        if results.len() >= limit {
            break;
        }
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let [_, "hymn", category, number] = segments.as_slice() else {
            continue;
        };

        let title = collapse_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let category_label = category_name(category);
        let mut metadata = BTreeMap::new();
        metadata.insert("category".to_owned(), category_label.clone());
        metadata.insert("number".to_owned(), (*number).to_owned());

        results.push(SearchCandidate {
            id: format!("hymnal-net:{category}/{number}"),
            provider: DEFINITION.id.to_owned(),
            title: title.clone(),
            artist: String::new(),
            album: None,
            snippet: make_snippet(&format!("{category_label} #{number}")),
            payload: LyricPayload::HymnalNet {
                url: url.to_string(),
                title,
            },
            metadata,
        });
    }

    Ok(results)
}

/// Parse a hymn page's stanza table into lyrics.
///
/// Every row of `table.js-stanzas` contributes its last cell as one
/// stanza or chorus; stanzas are separated by a blank line. The author is
/// read from the "Lyrics" entry of the details panel.
pub(crate) fn parse_hymn_html(html: &str, fallback_title: &str) -> Result<LyricContent> {
    let document = Html::parse_document(html);
    let row_sel = selector("table.js-stanzas tr")?;
    let cell_sel = selector("td")?;
    let title_sel = selector("h1")?;
    let detail_sel = selector(".common-panel .row")?;
    let label_sel = selector("label")?;
    let value_sel = selector(".col-xs-7")?;

    let stanzas: Vec<String> = document
        .select(&row_sel)
        .filter_map(|row| row.select(&cell_sel).last())
        .map(text_with_breaks)
        .filter(|stanza| !stanza.is_empty())
        .collect();
    if stanzas.is_empty() {
        return Err(LyricsError::NotFound(
            "Hymnal.net page has no stanza table".into(),
        ));
    }

    let mut artist = String::new();
    let mut copyright = None;
    for detail in document.select(&detail_sel) {
        let (Some(label), Some(value)) = (
            detail.select(&label_sel).next(),
            detail.select(&value_sel).next(),
        ) else {
            continue;
        };
        let label = collapse_whitespace(&label.text().collect::<String>());
        let value = collapse_whitespace(&value.text().collect::<String>());
        match label.trim_end_matches(':') {
            "Lyrics" if artist.is_empty() => artist = value,
            "Copyright" => copyright = Some(value),
            _ => {}
        }
    }

    let title = document
        .select(&title_sel)
        .next()
        .map(|h| collapse_whitespace(&h.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_owned());

    Ok(LyricContent {
        provider: DEFINITION.id.to_owned(),
        title,
        artist,
        lyrics: stanzas.join("\n\n"),
        copyright,
        source_url: None,
    })
}
