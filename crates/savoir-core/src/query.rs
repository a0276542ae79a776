//! Query analysis and adaptive retrieval configuration.
//!
//! Classifies a query's intent and complexity, then derives a per-query
//! [`RagConfig`] from the classification and the target model's
//! capabilities. Word-list matching (prefix for interrogatives, whole-word
//! for verbs) keeps the classifier dependency-free.

use crate::capability::{capabilities_for, ModelCapabilities, DEFAULT_CAPABILITIES};
use crate::models::RagConfig;

/// Intent classification of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Question,
    Analysis,
    Search,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryComplexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub kind: QueryKind,
    pub keywords: Vec<String>,
    pub complexity: QueryComplexity,
}

/// Baseline similarity threshold before per-kind adjustment.
const BASE_THRESHOLD: f32 = 0.38;

const INTERROGATIVES: &[&str] = &[
    "qu'", "que", "qui", "comment", "pourquoi", "quand", "où", "combien", "quel", "quelle",
];

const ANALYSIS_VERBS: &[&str] = &["analyse", "compare", "explique", "détaille", "résume", "évalue"];

const SEARCH_VERBS: &[&str] = &["trouve", "cherche", "liste", "montre", "affiche"];

const STOP_WORDS: &[&str] = &["les", "des", "une", "dans", "avec", "pour", "sur", "par"];

/// Classify a query and extract its keywords.
pub fn analyze_query(query: &str) -> QueryAnalysis {
    let lower = query.trim().to_lowercase();
    let tokens: Vec<String> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let kind = if INTERROGATIVES.iter().any(|p| lower.starts_with(p)) {
        QueryKind::Question
    } else if contains_any(&tokens, ANALYSIS_VERBS) {
        QueryKind::Analysis
    } else if contains_any(&tokens, SEARCH_VERBS) {
        QueryKind::Search
    } else {
        QueryKind::General
    };

    let keywords: Vec<String> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect();

    let complexity = if keywords.len() < 3 {
        QueryComplexity::Simple
    } else if keywords.len() < 6 {
        QueryComplexity::Medium
    } else {
        QueryComplexity::Complex
    };

    QueryAnalysis {
        kind,
        keywords,
        complexity,
    }
}

fn contains_any(tokens: &[String], verbs: &[&str]) -> bool {
    tokens.iter().any(|t| verbs.contains(&t.as_str()))
}

/// Derive a per-query [`RagConfig`] from the query's intent and the target
/// model's capabilities.
///
/// Search queries widen the result set and raise the threshold (precision);
/// analysis queries widen it further, lower the threshold, and expand the
/// context budget (recall); plain questions keep the baseline.
pub fn adaptive_rag_config(query: &str, model_id: Option<&str>) -> RagConfig {
    let caps: ModelCapabilities = match model_id {
        Some(id) => capabilities_for(id),
        None => DEFAULT_CAPABILITIES,
    };

    let base = RagConfig {
        enabled: true,
        selected_knowledge_base: None,
        similarity_threshold: BASE_THRESHOLD,
        max_results: caps.max_chunks,
        use_reranking: true,
        context_length: caps.max_context,
    };

    match analyze_query(query).kind {
        QueryKind::Search => RagConfig {
            max_results: (base.max_results + 2).min(10),
            similarity_threshold: 0.42,
            ..base
        },
        QueryKind::Analysis => RagConfig {
            max_results: (base.max_results + 4).min(12),
            similarity_threshold: 0.35,
            context_length: (base.context_length + 2000).min(base.context_length * 3 / 2),
            ..base
        },
        QueryKind::Question => RagConfig {
            similarity_threshold: BASE_THRESHOLD,
            ..base
        },
        QueryKind::General => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn french_interrogative_is_a_question() {
        let analysis = analyze_query("Pourquoi le ciel est bleu ?");
        assert_eq!(analysis.kind, QueryKind::Question);
    }

    #[test]
    fn elided_interrogative_is_a_question() {
        let analysis = analyze_query("Qu'est-ce que la photosynthèse ?");
        assert_eq!(analysis.kind, QueryKind::Question);
    }

    #[test]
    fn analysis_verb_wins_over_search_verb() {
        let analysis = analyze_query("compare et liste les avantages du nucléaire");
        assert_eq!(analysis.kind, QueryKind::Analysis);
    }

    #[test]
    fn search_verb_is_detected_as_whole_word() {
        assert_eq!(
            analyze_query("liste les capitales européennes").kind,
            QueryKind::Search
        );
        // "listeria" must not trigger the "liste" verb.
        assert_eq!(
            analyze_query("la listeria en milieu hospitalier").kind,
            QueryKind::General
        );
    }

    #[test]
    fn keywords_drop_stop_words_and_short_tokens() {
        let analysis = analyze_query("Les centrales dans la région avec des turbines");
        assert!(analysis.keywords.contains(&"centrales".to_string()));
        assert!(analysis.keywords.contains(&"turbines".to_string()));
        assert!(!analysis.keywords.contains(&"les".to_string()));
        assert!(!analysis.keywords.contains(&"des".to_string()));
        assert!(!analysis.keywords.contains(&"la".to_string()));
    }

    #[test]
    fn complexity_follows_keyword_count() {
        assert_eq!(
            analyze_query("bonjour").complexity,
            QueryComplexity::Simple
        );
        assert_eq!(
            analyze_query("centrales nucléaires françaises production").complexity,
            QueryComplexity::Medium
        );
        assert_eq!(
            analyze_query("production annuelle électricité centrales nucléaires françaises région").complexity,
            QueryComplexity::Complex
        );
    }

    #[test]
    fn adaptive_config_widens_for_analysis() {
        let config = adaptive_rag_config("analyse la production électrique", None);
        assert_eq!(config.max_results, 10);
        assert!((config.similarity_threshold - 0.35).abs() < 1e-6);
        assert_eq!(config.context_length, 7000);
    }

    #[test]
    fn adaptive_config_raises_threshold_for_search() {
        let config = adaptive_rag_config("cherche des informations précises", None);
        assert_eq!(config.max_results, 8);
        assert!((config.similarity_threshold - 0.42).abs() < 1e-6);
    }

    #[test]
    fn adaptive_config_uses_model_capabilities() {
        let config = adaptive_rag_config("bonjour tout le monde", Some("llama-3.1-8b"));
        assert_eq!(config.max_results, 8);
        assert_eq!(config.context_length, 8000);
        assert!(config.use_reranking);
    }

    #[test]
    fn context_expansion_is_capped_at_150_percent() {
        let config = adaptive_rag_config("analyse le sujet", Some("llama-3.2-1b"));
        // base 3000: +2000 would be 5000, but 1.5× base caps it at 4500.
        assert_eq!(config.context_length, 4500);
    }
}
