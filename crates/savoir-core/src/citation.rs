//! Post-hoc citation analysis.
//!
//! After generation completes, determines which retrieved chunks were
//! actually used in the answer. An exact 5-word phrase match is a precise
//! but brittle detector of verbatim reuse (confidence 0.9); a word-overlap
//! fallback recovers paraphrased usage at lower confidence (0.6). This is a
//! heuristic, not a guarantee — it cannot distinguish "the model reused
//! common phrasing" from "the model grounded its claim in this chunk".

use std::collections::HashSet;

use crate::models::{Citation, SearchResult};

/// Words of the sliding window matched verbatim against the response.
const PHRASE_WINDOW: usize = 5;

/// Minimum character length for a candidate sentence.
const MIN_SENTENCE_CHARS: usize = 20;

/// Minimum character length for a phrase window to count as evidence.
const MIN_PHRASE_CHARS: usize = 20;

/// Words shorter than this are ignored by the overlap fallback.
const MIN_OVERLAP_WORD_CHARS: usize = 4;

/// Common words required for the overlap fallback to fire.
const MIN_COMMON_WORDS: usize = 3;

const EXACT_CONFIDENCE: f32 = 0.9;
const OVERLAP_CONFIDENCE: f32 = 0.6;

/// Annotate each result with `used_in_response` and its citations.
///
/// Pure function over its inputs, run once per generated answer. Each chunk
/// is judged independently; the first matching sentence of a chunk is the
/// one cited.
pub fn analyze_response_citations(
    response: &str,
    results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let response_lower = response.to_lowercase();
    let response_words = long_words(&response_lower);

    results
        .into_iter()
        .map(|mut result| {
            annotate(&mut result, &response_lower, &response_words);
            result
        })
        .collect()
}

fn annotate(result: &mut SearchResult, response_lower: &str, response_words: &HashSet<String>) {
    let content = &result.chunk.content;
    let sentences = candidate_sentences(content);

    for sentence in &sentences {
        if has_exact_phrase(sentence, response_lower) {
            result.used_in_response = Some(true);
            result.citations = Some(vec![make_citation(sentence, content, EXACT_CONFIDENCE)]);
            return;
        }
    }

    let chunk_words = long_words(&content.to_lowercase());
    let common: HashSet<&String> = chunk_words.intersection(response_words).collect();
    if common.len() >= MIN_COMMON_WORDS {
        result.used_in_response = Some(true);
        let cited = sentences.iter().find(|sentence| {
            let lower = sentence.to_lowercase();
            common.iter().any(|word| lower.contains(word.as_str()))
        });
        result.citations =
            cited.map(|sentence| vec![make_citation(sentence, content, OVERLAP_CONFIDENCE)]);
        return;
    }

    result.used_in_response = Some(false);
    result.citations = None;
}

/// Does any 5-word window of `sentence` appear verbatim in the response?
fn has_exact_phrase(sentence: &str, response_lower: &str) -> bool {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() < PHRASE_WINDOW {
        return false;
    }
    for window in words.windows(PHRASE_WINDOW) {
        let phrase = window.join(" ").to_lowercase();
        if phrase.chars().count() > MIN_PHRASE_CHARS && response_lower.contains(&phrase) {
            return true;
        }
    }
    false
}

/// Sentences of the chunk worth citing: split on `.!?`, trimmed, longer
/// than [`MIN_SENTENCE_CHARS`].
fn candidate_sentences(content: &str) -> Vec<String> {
    content
        .split(|c: char| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Words longer than [`MIN_OVERLAP_WORD_CHARS`], lowercased input assumed.
fn long_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > MIN_OVERLAP_WORD_CHARS)
        .map(str::to_string)
        .collect()
}

fn make_citation(sentence: &str, content: &str, confidence: f32) -> Citation {
    let start = content.find(sentence).unwrap_or(0);
    Citation {
        text: sentence.to_string(),
        start_index: start,
        end_index: start + sentence.len(),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, DocumentChunk};
    use chrono::Utc;

    fn result_with_content(content: &str) -> SearchResult {
        let chunk = DocumentChunk {
            id: "c".to_string(),
            content: content.to_string(),
            embedding: vec![1.0],
            metadata: ChunkMetadata {
                source_id: "kb".to_string(),
                source_name: "doc.txt".to_string(),
                chunk_index: 0,
                start_char: 0,
                end_char: content.len(),
                created_at: Utc::now(),
            },
        };
        SearchResult::new(chunk, 0.8)
    }

    #[test]
    fn verbatim_phrase_is_detected_with_high_confidence() {
        let content = "Les centrales nucléaires françaises produisent environ 70% de l'électricité du pays. \
                       Elles sont réparties sur dix-huit sites.";
        let response = "D'après les documents, les centrales nucléaires françaises produisent environ \
                        70% de l'électricité consommée.";
        let results = analyze_response_citations(response, vec![result_with_content(content)]);

        assert_eq!(results[0].used_in_response, Some(true));
        let citations = results[0].citations.as_ref().unwrap();
        assert_eq!(citations.len(), 1);
        assert!((citations[0].confidence - 0.9).abs() < 1e-6);
        assert!(citations[0].text.starts_with("Les centrales nucléaires"));
    }

    #[test]
    fn citation_offsets_locate_the_sentence_in_the_chunk() {
        let content = "Première phrase assez longue pour compter. La centrale de Gravelines est la plus puissante d'Europe occidentale.";
        let response = "La centrale de Gravelines est la plus puissante d'Europe selon le texte.";
        let results = analyze_response_citations(response, vec![result_with_content(content)]);

        let citation = &results[0].citations.as_ref().unwrap()[0];
        let located = &content[citation.start_index..citation.end_index];
        assert_eq!(located, citation.text);
    }

    #[test]
    fn paraphrase_falls_back_to_word_overlap() {
        let content = "La photosynthèse transforme le dioxyde de carbone en oxygène grâce à la chlorophylle des feuilles.";
        // No 5-word verbatim span, but several long words in common.
        let response = "Grâce à la chlorophylle, les feuilles absorbent le dioxyde de carbone pendant la photosynthèse.";
        let results = analyze_response_citations(response, vec![result_with_content(content)]);

        assert_eq!(results[0].used_in_response, Some(true));
        let citations = results[0].citations.as_ref().unwrap();
        assert!((citations[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn unrelated_chunk_is_not_marked_used() {
        let content = "Les fourmis communiquent par phéromones le long de leurs pistes de nourriture.";
        let response = "Le traité de Rome a été signé en 1957 par six pays fondateurs.";
        let results = analyze_response_citations(response, vec![result_with_content(content)]);

        assert_eq!(results[0].used_in_response, Some(false));
        assert!(results[0].citations.is_none());
    }

    #[test]
    fn each_chunk_is_judged_independently() {
        let used = "La tour Eiffel mesure trois cent trente mètres de hauteur depuis 2022 avec ses antennes.";
        let unused = "Les marées sont causées par l'attraction gravitationnelle de la Lune et du Soleil.";
        let response = "La tour Eiffel mesure trois cent trente mètres de hauteur, d'après le document.";
        let results = analyze_response_citations(
            response,
            vec![result_with_content(used), result_with_content(unused)],
        );

        assert_eq!(results[0].used_in_response, Some(true));
        assert_eq!(results[1].used_in_response, Some(false));
    }

    #[test]
    fn confidence_is_always_one_of_the_two_levels() {
        let contents = [
            "La photosynthèse transforme le dioxyde de carbone en oxygène grâce à la chlorophylle.",
            "Les centrales nucléaires françaises produisent environ 70% de l'électricité du pays.",
            "Un texte sans aucun rapport avec la réponse générée ci-dessous.",
        ];
        let response = "Les centrales nucléaires françaises produisent environ 70% de l'électricité.";
        let results = analyze_response_citations(
            response,
            contents.iter().map(|c| result_with_content(c)).collect(),
        );

        for result in &results {
            if let Some(citations) = &result.citations {
                for citation in citations {
                    assert!(
                        (citation.confidence - 0.9).abs() < 1e-6
                            || (citation.confidence - 0.6).abs() < 1e-6
                    );
                }
            }
            if result.used_in_response == Some(false) {
                assert!(result.citations.is_none());
            }
        }
    }
}
