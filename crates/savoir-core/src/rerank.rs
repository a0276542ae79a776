//! Heuristic re-ranking of raw similarity scores.
//!
//! A second scoring pass that adjusts cosine similarity with keyword
//! overlap, recency, and length signals. Pure function of its inputs — the
//! caller supplies the clock so query-time results stay deterministic and
//! testable.

use chrono::{DateTime, Utc};

use crate::models::SearchResult;

/// Relevance added per whole-word occurrence of a query word.
const KEYWORD_BOOST: f32 = 0.1;

/// Re-score and reorder `results` for `query`.
///
/// `relevance = min(1, similarity + keyword boost + age bonus − length
/// penalty)`. The sort is stable: ties keep their input order.
pub fn rerank(query: &str, results: Vec<SearchResult>, now: DateTime<Utc>) -> Vec<SearchResult> {
    let query_words: Vec<String> = words(query)
        .into_iter()
        .filter(|w| w.chars().count() > 2)
        .collect();

    let mut reranked: Vec<SearchResult> = results
        .into_iter()
        .map(|mut result| {
            let content_words = words(&result.chunk.content);

            let mut boost = 0.0f32;
            for query_word in &query_words {
                let occurrences = content_words.iter().filter(|w| *w == query_word).count();
                boost += occurrences as f32 * KEYWORD_BOOST;
            }

            boost += age_bonus(result.chunk.metadata.created_at, now);
            boost -= length_penalty(result.chunk.content.chars().count());

            result.relevance = (result.similarity + boost).min(1.0);
            result
        })
        .collect();

    reranked.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    reranked
}

/// Lowercased alphanumeric word tokens.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recent chunks get a small bonus, old ones a small malus.
fn age_bonus(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let days = (now - created_at).num_seconds() as f64 / 86_400.0;
    if days < 7.0 {
        0.05
    } else if days < 30.0 {
        0.02
    } else if days < 90.0 {
        0.0
    } else {
        -0.02
    }
}

/// Very short or very long chunks are penalized.
fn length_penalty(chars: usize) -> f32 {
    if chars < 100 {
        0.1
    } else if chars > 2000 {
        0.05
    } else {
        0.0
    }
}
