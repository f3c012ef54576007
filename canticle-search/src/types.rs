//! Core types for provider descriptors, search candidates and payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Capabilities a provider advertises in its [`ProviderDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderFeature {
    /// Free-text search returning candidates.
    Search,
    /// Full lyric retrieval for a candidate payload.
    Lyrics,
}

impl fmt::Display for ProviderFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("search"),
            Self::Lyrics => f.write_str("lyrics"),
        }
    }
}

/// Static descriptor of a content provider.
///
/// Definitions are plain constants owned by each adapter and never change
/// after the adapter is registered with the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDefinition {
    /// Stable provider id, e.g. `"lrclib"`.
    pub id: &'static str,
    /// Human-readable name shown in metadata.
    pub display_name: &'static str,
    /// Whether the provider needs an API key from the credential store.
    pub requires_key: bool,
    /// Operations this provider supports.
    pub supported_features: &'static [ProviderFeature],
}

/// A provider definition together with whether it is usable right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    #[serde(flatten)]
    pub definition: ProviderDefinition,
    /// `true` if no key is required, otherwise `true` iff a key is stored.
    pub configured: bool,
}

/// Provider-specific reference handed back unmodified for lyric retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum LyricPayload {
    #[serde(rename = "lrclib")]
    Lrclib { id: u64 },
    #[serde(rename = "genius")]
    Genius {
        song_id: u64,
        url: String,
        title: String,
        artist: String,
    },
    #[serde(rename = "hymnary")]
    Hymnary { url: String, title: String },
    #[serde(rename = "hymnal-net")]
    HymnalNet { url: String, title: String },
}

impl LyricPayload {
    /// Id of the provider this payload belongs to.
    pub fn provider_id(&self) -> &'static str {
        match self {
            Self::Lrclib { .. } => "lrclib",
            Self::Genius { .. } => "genius",
            Self::Hymnary { .. } => "hymnary",
            Self::HymnalNet { .. } => "hymnal-net",
        }
    }
}

/// One normalised lyric/track/hymn reference returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCandidate {
    /// Provider-scoped id, e.g. `"lrclib:3396226"`. Not globally unique.
    pub id: String,
    /// Id of the provider that returned this candidate.
    pub provider: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Short excerpt shown in result lists.
    pub snippet: String,
    pub payload: LyricPayload,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A candidate with its relevance score, alive for one merge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: SearchCandidate,
    pub score: f64,
    /// Named partial contributions kept for diagnostics and tuning.
    pub signals: BTreeMap<&'static str, f64>,
    pub is_exact: bool,
    /// 0-based rank of the candidate in its provider's native ordering.
    pub provider_index: usize,
}

/// Per-provider outcome reported alongside results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMeta {
    pub id: String,
    pub display_name: String,
    /// Number of raw candidates the provider returned.
    pub count: usize,
    pub errors: Vec<String>,
    /// Wall-clock time the provider took, in milliseconds.
    pub duration_ms: u64,
}

/// Metadata block of a [`SearchResultPayload`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMeta {
    pub providers: Vec<ProviderMeta>,
}

impl SearchMeta {
    /// Number of providers that reported at least one error.
    pub fn failed_providers(&self) -> usize {
        self.providers.iter().filter(|p| !p.errors.is_empty()).count()
    }
}

/// Ranked results plus per-provider metadata.
///
/// Partial snapshots carry `is_complete = false` and only cover the
/// providers that have settled so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultPayload {
    pub results: Vec<SearchCandidate>,
    pub meta: SearchMeta,
    pub is_complete: bool,
}

/// Full lyric text retrieved from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricContent {
    pub provider: String,
    pub title: String,
    pub artist: String,
    /// Plain lyric text, stanzas separated by blank lines.
    pub lyrics: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_provider_ids() {
        assert_eq!(LyricPayload::Lrclib { id: 1 }.provider_id(), "lrclib");
        let hymn = LyricPayload::HymnalNet {
            url: "https://www.hymnal.net/en/hymn/h/8".into(),
            title: "Amazing Grace".into(),
        };
        assert_eq!(hymn.provider_id(), "hymnal-net");
    }

    #[test]
    fn payload_is_tagged_by_provider() {
        let payload = LyricPayload::Hymnary {
            url: "https://hymnary.org/text/amazing_grace".into(),
            title: "Amazing grace".into(),
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["provider"], "hymnary");

        let decoded: LyricPayload =
            serde_json::from_str(r#"{"provider":"lrclib","id":3396226}"#).expect("deserialize");
        assert_eq!(decoded, LyricPayload::Lrclib { id: 3396226 });
    }

    #[test]
    fn unknown_payload_tag_rejected() {
        let decoded: Result<LyricPayload, _> = serde_json::from_str(r#"{"provider":"nope"}"#);
        assert!(decoded.is_err());
    }

    #[test]
    fn provider_status_flattens_definition() {
        let status = ProviderStatus {
            definition: ProviderDefinition {
                id: "genius",
                display_name: "Genius",
                requires_key: true,
                supported_features: &[ProviderFeature::Search, ProviderFeature::Lyrics],
            },
            configured: false,
        };
        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["id"], "genius");
        assert_eq!(json["requiresKey"], true);
        assert_eq!(json["configured"], false);
        assert_eq!(json["supportedFeatures"][1], "lyrics");
    }

    #[test]
    fn failed_providers_counts_entries_with_errors() {
        let meta = SearchMeta {
            providers: vec![
                ProviderMeta {
                    id: "lrclib".into(),
                    display_name: "LRCLIB".into(),
                    count: 3,
                    errors: vec![],
                    duration_ms: 120,
                },
                ProviderMeta {
                    id: "genius".into(),
                    display_name: "Genius".into(),
                    count: 0,
                    errors: vec!["timed out: request exceeded 10s".into()],
                    duration_ms: 10_000,
                },
            ],
        };
        assert_eq!(meta.failed_providers(), 1);
    }
}
