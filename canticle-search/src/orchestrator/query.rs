//! Free-text query analysis.
//!
//! Normalises the raw query and infers a `(title, artist)` pair from it,
//! either from an explicit delimiter (`"<title> by <artist>"`,
//! `"<title> - <artist>"`) or by spotting a known artist name.

/// Words ignored by word-overlap scoring.
pub const STOP_WORDS: &[&str] = &["the", "a", "an", "of", "to", "in", "by", "with", "for"];

/// Keywords that mark a query as looking for a traditional hymn.
pub const HYMN_KEYWORDS: &[&str] = &["hymn", "hymnal", "hymns", "doxology", "psalm", "chorale"];

/// Inclusive year range treated as "recent" for contemporary-song boosting.
pub const RECENT_YEARS: std::ops::RangeInclusive<u16> = 2010..=2025;

/// Result of analysing one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnalysis {
    pub raw_query: String,
    /// Trimmed, lowercased query.
    pub normalized_query: String,
    /// Whitespace-split words of the normalised query.
    pub words: Vec<String>,
    pub inferred_artist: Option<String>,
    /// Always set after analysis; falls back to the whole normalised query.
    pub inferred_title: Option<String>,
    pub stop_words: &'static [&'static str],
}

impl QueryAnalysis {
    /// Query words of at least three characters that are not stop words.
    pub fn significant_words(&self) -> impl Iterator<Item = &str> {
        self.words
            .iter()
            .map(String::as_str)
            .filter(|w| w.chars().count() >= 3 && !self.stop_words.contains(w))
    }

    /// Whether the query carries a standalone year token in [`RECENT_YEARS`].
    pub fn has_recent_year(&self) -> bool {
        self.normalized_query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() == 4)
            .filter_map(|token| token.parse::<u16>().ok())
            .any(|year| RECENT_YEARS.contains(&year))
    }

    /// Whether the query mentions a hymn-related keyword.
    pub fn mentions_hymn(&self) -> bool {
        HYMN_KEYWORDS
            .iter()
            .any(|keyword| self.normalized_query.contains(keyword))
    }
}

/// Analyses queries against a list of known artist names.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer {
    known_artists: Vec<String>,
}

impl QueryAnalyzer {
    /// Create an analyzer; artist names are matched case-insensitively.
    pub fn new<I, S>(known_artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known_artists: known_artists
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn analyze(&self, raw_query: &str) -> QueryAnalysis {
        let normalized_query = raw_query.trim().to_lowercase();
        let words: Vec<String> = normalized_query
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        let (mut inferred_title, inferred_artist) =
            if let Some((title, artist)) = split_pair(&normalized_query, " by ") {
                (title, artist)
            } else if let Some((title, artist)) = split_pair(&normalized_query, " - ") {
                (title, artist)
            } else {
                self.match_known_artist(&normalized_query, &words)
            };

        if inferred_title.is_none() {
            inferred_title = Some(normalized_query.clone());
        }

        QueryAnalysis {
            raw_query: raw_query.to_owned(),
            normalized_query,
            words,
            inferred_artist,
            inferred_title,
            stop_words: STOP_WORDS,
        }
    }

    fn match_known_artist(
        &self,
        normalized: &str,
        words: &[String],
    ) -> (Option<String>, Option<String>) {
        let Some(artist) = self
            .known_artists
            .iter()
            .find(|artist| normalized.contains(artist.as_str()))
        else {
            return (None, None);
        };

        let artist_words: Vec<&str> = artist.split_whitespace().collect();
        let remaining: Vec<&str> = words
            .iter()
            .map(String::as_str)
            .filter(|w| !artist_words.contains(w))
            .collect();
        let title = (!remaining.is_empty()).then(|| remaining.join(" "));
        (title, Some(artist.clone()))
    }
}

/// Split at the first `delimiter`; everything after it, including later
/// delimiters, belongs to the second half.
fn split_pair(normalized: &str, delimiter: &str) -> Option<(Option<String>, Option<String>)> {
    let (before, after) = normalized.split_once(delimiter)?;
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_owned())
    };
    Some((non_empty(before), non_empty(after)))
}
