//! Hymnary.org provider.
//!
//! Scrapes the text search results page and the per-text page. Only
//! public-domain texts carry full words; others have no `#text` block and
//! resolve to [`LyricsError::NotFound`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
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
    id: "hymnary",
    display_name: "Hymnary.org",
    requires_key: false,
    supported_features: &[ProviderFeature::Search, ProviderFeature::Lyrics],
};

const BASE_URL: &str = "https://hymnary.org";

/// Hymnary.org hymn text provider.
pub struct HymnaryProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HymnaryProvider {
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

    async fn fetch_search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        tracing::trace!(query, "querying Hymnary.org");
        let qu = format!("{query} in:texts");
        let url = Url::parse_with_params(&format!("{}/search", self.base_url), &[("qu", qu)])
            .map_err(|e| LyricsError::Http(format!("invalid Hymnary.org URL: {e}")))?;
        let html = fetch_text(self.client.get(url), "Hymnary.org").await?;
        parse_search_html(&html, &self.base_url, limit)
    }

    async fn fetch_text_page(&self, url: &str, title: &str) -> Result<LyricContent> {
        tracing::trace!(url, "fetching Hymnary.org text page");
        let html = fetch_text(self.client.get(url), "Hymnary.org").await?;
        let mut content = parse_text_html(&html, title)?;
        content.source_url = Some(url.to_owned());
        Ok(content)
    }
}

#[async_trait]
impl ProviderAdapter for HymnaryProvider {
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
        let LyricPayload::Hymnary { url, title } = &request.payload else {
            return Err(foreign_payload(DEFINITION.display_name, &request.payload));
        };
        fetch_with_timeout(
            self.fetch_text_page(url, title),
            self.timeout,
            request.cancel.as_ref(),
        )
        .await
    }
}

/// Parse a search results page into at most `limit` candidates.
///
/// Relative links are resolved against `base_url`. Rows without a title
/// link are skipped.
pub(crate) fn parse_search_html(
    html: &str,
    base_url: &str,
    limit: usize,
) -> Result<Vec<SearchCandidate>> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr.result-row")?;
    let title_sel = selector("td.result-title a")?;
    let first_line_sel = selector("td.result-first-line")?;
    let author_sel = selector("td.result-author")?;
    let meter_sel = selector("td.result-meter")?;

    let base = Url::parse(base_url)
        .map_err(|e| LyricsError::Parse(format!("invalid base URL {base_url}: {e}")))?;

    let mut results = Vec::new();
    for row in document.select(&row_sel) {
        if results.len() >= limit {
            break;
        }

        let Some(link) = row.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let title = collapse_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let Ok(url) = base.join(href) else {
            continue;
        };

        let slug = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| results.len().to_string());

        let cell_text = |sel: &Selector| {
            row.select(sel)
                .next()
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .unwrap_or_default()
        };
        let first_line = cell_text(&first_line_sel);
        let author = cell_text(&author_sel);
        let meter = cell_text(&meter_sel);

        let mut metadata = BTreeMap::new();
        if !meter.is_empty() {
            metadata.insert("meter".to_owned(), meter);
        }

        results.push(SearchCandidate {
            id: format!("hymnary:{slug}"),
            provider: DEFINITION.id.to_owned(),
            title: title.clone(),
            artist: author,
            album: None,
            snippet: make_snippet(&first_line),
            payload: LyricPayload::Hymnary {
                url: url.to_string(),
                title,
            },
            metadata,
        });
    }

    Ok(results)
}

/// Parse a text page into lyrics.
///
/// Each `<p>` under `#text` is one stanza; stanzas are separated by a
/// blank line. Author and copyright come from the information table.
pub(crate) fn parse_text_html(html: &str, fallback_title: &str) -> Result<LyricContent> {
    let document = Html::parse_document(html);
    let text_sel = selector("#text")?;
    let stanza_sel = selector("p")?;
    let title_sel = selector("h2.hymntitle")?;
    let info_row_sel = selector("tr")?;
    let label_sel = selector(".hy_infoLabel")?;
    let item_sel = selector(".hy_infoItem")?;

    let Some(text_block) = document.select(&text_sel).next() else {
        return Err(LyricsError::NotFound(
            "Hymnary.org page has no full text".into(),
        ));
    };

    let stanzas: Vec<String> = text_block
        .select(&stanza_sel)
        .map(text_with_breaks)
        .filter(|stanza| !stanza.is_empty())
        .collect();
    let lyrics = if stanzas.is_empty() {
        text_with_breaks(text_block)
    } else {
        stanzas.join("\n\n")
    };
    if lyrics.is_empty() {
        return Err(LyricsError::NotFound(
            "Hymnary.org text block is empty".into(),
        ));
    }

    let mut info = BTreeMap::new();
    for row in document.select(&info_row_sel) {
        let (Some(label), Some(item)) = (row.select(&label_sel).next(), row.select(&item_sel).next())
        else {
            continue;
        };
        let label = collapse_whitespace(&label.text().collect::<String>());
        let value = collapse_whitespace(&item.text().collect::<String>());
        info.entry(label.trim_end_matches(':').to_lowercase())
            .or_insert(value);
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
        artist: info.remove("author").unwrap_or_default(),
        lyrics,
        copyright: info.remove("copyright"),
        source_url: None,
    })
}
