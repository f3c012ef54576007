//! Ranking and deduplication across provider chunks.
//!
//! Every candidate from every settled provider is scored, the combined
//! list is stably sorted by score, and candidates are emitted in that
//! order while skipping duplicate `(title, artist)` pairs. Exact matches
//! carry their provider id in the dedupe key, so the same exact song from
//! two providers survives while non-exact duplicates collapse.

use std::collections::HashSet;
use std::time::Duration;

use crate::types::{ProviderMeta, ScoredCandidate, SearchCandidate};

use super::query::QueryAnalysis;
use super::scoring::score_candidate;

/// One provider's settled search outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderChunk {
    pub provider_id: String,
    pub display_name: String,
    /// Candidates in the provider's native order.
    pub results: Vec<SearchCandidate>,
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl ProviderChunk {
    /// Metadata entry describing this chunk.
    pub fn meta(&self) -> ProviderMeta {
        ProviderMeta {
            id: self.provider_id.clone(),
            display_name: self.display_name.clone(),
            count: self.results.len(),
            errors: self.errors.clone(),
            duration_ms: duration_ms(self.duration),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Score every candidate of every chunk, in chunk order then native rank.
pub fn score_chunks<'a, I>(chunks: I, analysis: &QueryAnalysis) -> Vec<ScoredCandidate>
where
    I: IntoIterator<Item = &'a ProviderChunk>,
{
    chunks
        .into_iter()
        .flat_map(|chunk| chunk.results.iter().enumerate())
        .map(|(index, candidate)| {
            let relevance = score_candidate(candidate, index, analysis);
            ScoredCandidate {
                candidate: candidate.clone(),
                score: relevance.score,
                signals: relevance.signals,
                is_exact: relevance.is_exact,
                provider_index: index,
            }
        })
        .collect()
}

/// Key under which two candidates count as the same result.
pub fn dedupe_key(scored: &ScoredCandidate) -> String {
    let candidate = &scored.candidate;
    let mut key = format!(
        "{}|{}",
        candidate.title.to_lowercase(),
        candidate.artist.to_lowercase()
    );
    if scored.is_exact {
        key.push('|');
        key.push_str(&candidate.provider);
    }
    key
}

/// Rank and deduplicate all chunks, returning at most `limit` candidates.
///
/// Ties keep first-seen order, so the result is a pure function of the
/// chunk list regardless of when each chunk arrived.
pub fn merge_chunks<'a, I>(chunks: I, analysis: &QueryAnalysis, limit: usize) -> Vec<SearchCandidate>
where
    I: IntoIterator<Item = &'a ProviderChunk>,
{
    let mut scored = score_chunks(chunks, analysis);
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(limit.min(scored.len()));
    for item in scored {
        if merged.len() >= limit {
            break;
        }
        if seen.insert(dedupe_key(&item)) {
            merged.push(item.candidate);
        }
    }
    merged
}
