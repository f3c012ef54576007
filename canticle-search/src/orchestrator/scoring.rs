//! Multi-signal relevance scoring for lyric candidates.
//!
//! Stages run in a fixed order and only ever add to the running score:
//!
//! 1. exact title / artist match (short-circuits)
//! 2. substring containment of the query
//! 3. fuzzy match against the inferred `(title, artist)` pair
//! 4. significant-word overlap with the title
//! 5. character-bigram recall, only for weak candidates
//! 6. contextual provider boosts (recent year, hymn keywords)
//! 7. positional penalty from the provider's native ranking

use std::collections::{BTreeMap, HashSet};

use crate::types::SearchCandidate;

use super::query::QueryAnalysis;

pub const EXACT_TITLE_SCORE: f64 = 1_000_000.0;
pub const EXACT_ARTIST_SCORE: f64 = 900_000.0;
pub const TITLE_CONTAINS_WEIGHT: f64 = 100_000.0;
pub const ARTIST_CONTAINS_WEIGHT: f64 = 80_000.0;
pub const TITLE_FUZZY_WEIGHT: f64 = 300_000.0;
pub const ARTIST_FUZZY_WEIGHT: f64 = 200_000.0;
pub const WORD_OVERLAP_WEIGHT: f64 = 10_000.0;
pub const TITLE_BIGRAM_WEIGHT: f64 = 20_000.0;
pub const ARTIST_BIGRAM_WEIGHT: f64 = 15_000.0;
pub const CONTEXT_BOOST: f64 = 5_000.0;
pub const POSITION_PENALTY: f64 = 100.0;

/// Bigram matching only runs while the score is below this.
pub const BIGRAM_SCORE_CEILING: f64 = 50_000.0;
/// Minimum edit-distance similarity that counts as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.75;
/// Fuzzy similarity at or above which a pair match counts as exact.
pub const EXACT_SIMILARITY: f64 = 0.9;
/// Fuzzy matching is skipped when lengths differ by this many chars or more.
const MAX_LENGTH_GAP: usize = 5;
const MIN_WORD_OVERLAP: f64 = 0.5;
const MIN_BIGRAM_RECALL: f64 = 0.3;

/// Provider whose catalogue favours recent contemporary releases.
pub const CONTEMPORARY_PROVIDERS: &[&str] = &["genius"];
/// Providers serving traditional hymn texts.
pub const HYMN_PROVIDERS: &[&str] = &["hymnary", "hymnal-net"];

/// Score, diagnostic signals and exactness for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    pub score: f64,
    pub signals: BTreeMap<&'static str, f64>,
    pub is_exact: bool,
}

/// Score `candidate`, ranked `provider_index` in its provider's own list,
/// against an analysed query.
pub fn score_candidate(
    candidate: &SearchCandidate,
    provider_index: usize,
    analysis: &QueryAnalysis,
) -> Relevance {
    let query = analysis.normalized_query.as_str();
    let title = candidate.title.trim().to_lowercase();
    let artist = candidate.artist.trim().to_lowercase();
    let mut signals = BTreeMap::new();

    if title == query {
        signals.insert("exact_title", EXACT_TITLE_SCORE);
        return Relevance {
            score: EXACT_TITLE_SCORE,
            signals,
            is_exact: true,
        };
    }
    if artist == query {
        signals.insert("exact_artist", EXACT_ARTIST_SCORE);
        return Relevance {
            score: EXACT_ARTIST_SCORE,
            signals,
            is_exact: true,
        };
    }

    let mut score = 0.0;
    let mut is_exact = false;

    if title.contains(query) {
        score += TITLE_CONTAINS_WEIGHT;
        signals.insert("title_contains", TITLE_CONTAINS_WEIGHT);
    }
    if artist.contains(query) {
        score += ARTIST_CONTAINS_WEIGHT;
        signals.insert("artist_contains", ARTIST_CONTAINS_WEIGHT);
    }

    match (&analysis.inferred_title, &analysis.inferred_artist) {
        (Some(inferred_title), Some(inferred_artist)) => {
            let title_sim = guarded_similarity(&title, inferred_title);
            let artist_sim = guarded_similarity(&artist, inferred_artist);
            signals.insert("title_similarity", title_sim);
            signals.insert("artist_similarity", artist_sim);
            if title_sim > 0.0 {
                score += TITLE_FUZZY_WEIGHT * title_sim;
                signals.insert("title_fuzzy", TITLE_FUZZY_WEIGHT * title_sim);
            }
            if artist_sim > 0.0 {
                score += ARTIST_FUZZY_WEIGHT * artist_sim;
                signals.insert("artist_fuzzy", ARTIST_FUZZY_WEIGHT * artist_sim);
            }
            if title_sim >= EXACT_SIMILARITY && artist_sim >= EXACT_SIMILARITY {
                is_exact = true;
            }
        }
        (Some(inferred_title), None) => {
            // Diagnostic only. `artist_similarity` is never written on this
            // path, so the exact check below cannot pass. Kept as-is pending
            // a product decision on title-only exactness.
            let title_sim = guarded_similarity(&title, inferred_title);
            signals.insert("title_similarity", title_sim);
            let artist_sim = signals.get("artist_similarity").copied().unwrap_or(0.0);
            if title_sim >= EXACT_SIMILARITY && artist_sim >= EXACT_SIMILARITY {
                is_exact = true;
            }
        }
        _ => {}
    }

    let significant: Vec<&str> = analysis.significant_words().collect();
    if !significant.is_empty() {
        let matched = significant.iter().filter(|w| title.contains(**w)).count();
        let fraction = matched as f64 / significant.len() as f64;
        if fraction > MIN_WORD_OVERLAP {
            score += WORD_OVERLAP_WEIGHT * fraction;
            signals.insert("word_overlap", WORD_OVERLAP_WEIGHT * fraction);
        }
    }

    if score < BIGRAM_SCORE_CEILING {
        let title_bigram = bigram_recall(query, &title);
        let artist_bigram = bigram_recall(query, &artist);
        if title_bigram > MIN_BIGRAM_RECALL {
            score += TITLE_BIGRAM_WEIGHT * title_bigram;
            signals.insert("title_bigram", TITLE_BIGRAM_WEIGHT * title_bigram);
        }
        if artist_bigram > MIN_BIGRAM_RECALL {
            score += ARTIST_BIGRAM_WEIGHT * artist_bigram;
            signals.insert("artist_bigram", ARTIST_BIGRAM_WEIGHT * artist_bigram);
        }
    }

    let provider = candidate.provider.as_str();
    if analysis.has_recent_year() && CONTEMPORARY_PROVIDERS.contains(&provider) {
        score += CONTEXT_BOOST;
        signals.insert("recent_year_boost", CONTEXT_BOOST);
    }
    if analysis.mentions_hymn() && HYMN_PROVIDERS.contains(&provider) {
        score += CONTEXT_BOOST;
        signals.insert("hymn_boost", CONTEXT_BOOST);
    }

    let penalty = POSITION_PENALTY * provider_index as f64;
    score -= penalty;
    signals.insert("position_penalty", -penalty);

    Relevance {
        score,
        signals,
        is_exact,
    }
}

/// Similarity of `field` to `inferred`, or 0 when their lengths are too far
/// apart to be worth comparing.
fn guarded_similarity(field: &str, inferred: &str) -> f64 {
    let gap = field.chars().count().abs_diff(inferred.chars().count());
    if gap < MAX_LENGTH_GAP {
        similarity(field, inferred)
    } else {
        0.0
    }
}

/// Normalised edit-distance similarity in `[0.75, 1.0]`, or 0.
///
/// Returns 0 when the lengths differ by more than half the longer string
/// or when the similarity falls below [`SIMILARITY_THRESHOLD`].
pub fn similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    if len_a.abs_diff(len_b) as f64 > longest as f64 * 0.5 {
        return 0.0;
    }

    let max_distance = ((1.0 - SIMILARITY_THRESHOLD) * longest as f64).floor() as usize;
    let distance = bounded_levenshtein(a, b, max_distance);
    if distance > max_distance {
        return 0.0;
    }

    let sim = 1.0 - distance as f64 / longest as f64;
    if sim < SIMILARITY_THRESHOLD {
        0.0
    } else {
        sim
    }
}

/// Levenshtein distance that gives up once it must exceed `max_distance`.
///
/// Returns `max_distance + 1` as soon as every cell of the current row is
/// above the bound, so long mismatched strings cost little.
pub fn bounded_levenshtein(a: &str, b: &str, max_distance: usize) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let too_far = max_distance + 1;

    if a.len().abs_diff(b.len()) > max_distance {
        return too_far;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max_distance {
            return too_far;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    if distance > max_distance {
        too_far
    } else {
        distance
    }
}

/// Fraction of `field`'s bigrams matched by bigrams of `query`.
///
/// Deliberately asymmetric: the denominator is the field's bigram count,
/// so short fields fully covered by the query score high.
pub fn bigram_recall(query: &str, field: &str) -> f64 {
    let field_bigrams = bigrams(field);
    if field_bigrams.is_empty() {
        return 0.0;
    }
    let lookup: HashSet<(char, char)> = field_bigrams.iter().copied().collect();
    let matched = bigrams(query)
        .iter()
        .filter(|pair| lookup.contains(pair))
        .count();
    matched as f64 / field_bigrams.len() as f64
}

fn bigrams(text: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}
