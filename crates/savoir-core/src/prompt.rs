//! Context-window-aware prompt assembly.
//!
//! Turns ranked search results into a bounded context block, wraps it in an
//! instruction template matched to the target model's prompt mode, and
//! builds the role-tagged message list handed to the generation engine.
//! Callers are responsible for having ranked and truncated the results —
//! inclusion order always matches input order.

use crate::capability::{capabilities_for, PromptMode};
use crate::models::{ChatMessage, SearchResult};

/// Character budget used by [`create_rag_prompt`] when no model id is given.
const FALLBACK_CONTEXT_LENGTH: usize = 6000;

/// Minimum budget left over for a truncated tail block to be worth adding.
const MIN_TRUNCATED_BLOCK: usize = 100;

/// How many trailing conversation messages [`rag_messages`] keeps.
const HISTORY_WINDOW: usize = 7;

/// Assemble the labeled context block injected ahead of the question.
///
/// The character budget is the model's `max_context` when `model_id` is
/// given, `fallback_max_length` otherwise; likewise the chunk count is the
/// model's `max_chunks` or all results. When a block would overflow the
/// budget, a truncated version of its chunk text is appended only if at
/// least [`MIN_TRUNCATED_BLOCK`] characters of budget remain; afterwards
/// assembly stops.
pub fn build_rag_context(
    query: &str,
    results: &[SearchResult],
    fallback_max_length: usize,
    model_id: Option<&str>,
) -> String {
    if results.is_empty() {
        return String::new();
    }

    let (budget, max_chunks) = match model_id {
        Some(id) => {
            let caps = capabilities_for(id);
            (caps.max_context, caps.max_chunks)
        }
        None => (fallback_max_length, results.len()),
    };

    let header = format!("Contexte pertinent pour la question \"{query}\" :\n\n");
    let mut context = header.clone();
    let mut used = char_len(&header);

    for (i, result) in results.iter().take(max_chunks).enumerate() {
        let chunk_text = result.chunk.content.trim();
        let similarity_pct = (result.similarity * 100.0).round() as i64;
        let label = format!(
            "[Document {}] Source : {} (Pertinence : {}%)\n",
            i + 1,
            result.chunk.metadata.source_name,
            similarity_pct
        );
        let block_len = char_len(&label) + char_len(chunk_text) + 2;

        if used + block_len > budget {
            let remaining = budget.saturating_sub(used + char_len(&label) + 3);
            if remaining >= MIN_TRUNCATED_BLOCK {
                context.push_str(&label);
                context.push_str(head_chars(chunk_text, remaining));
                context.push_str("...");
            }
            break;
        }

        context.push_str(&label);
        context.push_str(chunk_text);
        context.push_str("\n\n");
        used += block_len;
    }

    context.trim_end().to_string()
}

/// Build the full prompt: context block wrapped in the mode-appropriate
/// instruction template, then the question.
///
/// An explicit `system_prompt` replaces the generated template entirely;
/// the context is still embedded inside it.
pub fn create_rag_prompt(
    query: &str,
    results: &[SearchResult],
    system_prompt: Option<&str>,
    model_id: Option<&str>,
) -> String {
    let context = build_rag_context(query, results, FALLBACK_CONTEXT_LENGTH, model_id);
    let mode = model_id
        .map(|id| capabilities_for(id).prompt_mode)
        .unwrap_or(PromptMode::Balanced);
    let instructions = system_prompt.unwrap_or_else(|| template_for(mode));

    format!("{instructions}\n\n{context}\n\nQuestion : {query}\n\nRéponse :")
}

/// Build the message list handed to the generation engine: the RAG prompt
/// as a system message, a recent slice of the conversation, then the
/// current question.
pub fn rag_messages(
    query: &str,
    results: &[SearchResult],
    history: &[ChatMessage],
    system_prompt: Option<&str>,
    model_id: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len().min(HISTORY_WINDOW) + 2);
    messages.push(ChatMessage::system(create_rag_prompt(
        query,
        results,
        system_prompt,
        model_id,
    )));

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    messages.extend(history[start..].iter().cloned());
    messages.push(ChatMessage::user(query));
    messages
}

fn template_for(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Strict => {
            "Tu es un assistant IA. Réponds UNIQUEMENT avec les informations des documents fournis.\n\
             Règles :\n\
             - N'utilise aucune connaissance extérieure aux documents.\n\
             - Si les documents ne contiennent pas la réponse, dis-le clairement.\n\
             - Réponds en une ou deux phrases, sans élaborer.\n\
             - Ne mentionne jamais les identifiants [Document N] dans ta réponse."
        }
        PromptMode::Balanced => {
            "Tu es un assistant IA qui répond aux questions en te basant sur le contexte fourni.\n\
             Instructions importantes :\n\
             - Utilise uniquement les informations des documents fournis pour répondre.\n\
             - Si plusieurs documents sont pertinents, synthétise leurs informations.\n\
             - Si le contexte ne contient pas d'information pertinente, dis-le clairement.\n\
             - Sois précis et concis ; exprime ton incertitude quand elle existe.\n\
             - Ne mentionne pas les identifiants [Document N] dans ta réponse."
        }
        PromptMode::Rich => {
            "Tu es un assistant IA expert en synthèse documentaire. Réponds en te basant sur le contexte fourni.\n\
             Instructions :\n\
             - Appuie chaque affirmation sur les documents fournis, sans connaissance extérieure.\n\
             - Croise et synthétise les documents lorsque plusieurs sont pertinents ; signale les contradictions.\n\
             - Structure ta réponse : idée principale, développement, nuances éventuelles.\n\
             - Si les documents ne couvrent pas la question, indique précisément ce qui manque.\n\
             - Ne fais jamais apparaître les identifiants [Document N] dans ta réponse."
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `n` characters of `s`, on a UTF-8 boundary.
fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, DocumentChunk, SearchResult};
    use chrono::Utc;

    fn result(source_name: &str, content: &str, similarity: f32) -> SearchResult {
        let chunk = DocumentChunk {
            id: "c".to_string(),
            content: content.to_string(),
            embedding: vec![1.0],
            metadata: ChunkMetadata {
                source_id: "kb".to_string(),
                source_name: source_name.to_string(),
                chunk_index: 0,
                start_char: 0,
                end_char: content.len(),
                created_at: Utc::now(),
            },
        };
        SearchResult::new(chunk, similarity)
    }

    #[test]
    fn empty_results_yield_empty_context() {
        assert_eq!(build_rag_context("question", &[], 3000, None), "");
    }

    #[test]
    fn blocks_are_labeled_and_ordered() {
        let results = vec![
            result("a.txt", &"alpha ".repeat(30), 0.91),
            result("b.txt", &"beta ".repeat(30), 0.87),
        ];
        let context = build_rag_context("quelle source ?", &results, 3000, None);
        assert!(context.starts_with("Contexte pertinent pour la question"));
        let first = context.find("[Document 1] Source : a.txt (Pertinence : 91%)").unwrap();
        let second = context.find("[Document 2] Source : b.txt (Pertinence : 87%)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn context_respects_the_budget() {
        let results = vec![
            result("a.txt", &"mot ".repeat(200), 0.9),
            result("b.txt", &"mot ".repeat(200), 0.8),
            result("c.txt", &"mot ".repeat(200), 0.7),
        ];
        let context = build_rag_context("question", &results, 1000, None);
        assert!(context.chars().count() <= 1000);
    }

    #[test]
    fn tail_block_is_truncated_only_with_enough_room() {
        let results = vec![
            result("a.txt", &"mot ".repeat(100), 0.9),
            result("b.txt", &"mot ".repeat(100), 0.8),
        ];
        // Budget large enough for block 1 plus a truncated tail of block 2.
        let context = build_rag_context("question", &results, 700, None);
        assert!(context.contains("[Document 2]"));
        assert!(context.ends_with("..."));
        assert!(context.chars().count() <= 700);

        // Budget that leaves fewer than 100 chars for the tail: no partial block.
        let tight = build_rag_context("question", &results, 500, None);
        assert!(!tight.contains("[Document 2]"));
    }

    #[test]
    fn model_id_overrides_budget_and_chunk_count() {
        let results: Vec<SearchResult> = (0..10)
            .map(|i| result(&format!("doc{i}.txt"), &"texte ".repeat(40), 0.9))
            .collect();
        // llama-3.2-1b: max_chunks 4.
        let context = build_rag_context("question", &results, 50_000, Some("llama-3.2-1b"));
        assert!(context.contains("[Document 4]"));
        assert!(!context.contains("[Document 5]"));
        assert!(context.chars().count() <= 3000);
    }

    #[test]
    fn prompt_mode_picks_the_template() {
        let results = vec![result("a.txt", &"contenu ".repeat(30), 0.9)];
        let strict = create_rag_prompt("question", &results, None, Some("llama-3.2-1b"));
        assert!(strict.contains("UNIQUEMENT"));
        let rich = create_rag_prompt("question", &results, None, Some("llama-3.1-8b"));
        assert!(rich.contains("synthèse documentaire"));
        assert!(rich.ends_with("Réponse :"));
    }

    #[test]
    fn explicit_system_prompt_replaces_the_template() {
        let results = vec![result("a.txt", &"contenu ".repeat(30), 0.9)];
        let prompt = create_rag_prompt("question", &results, Some("Réponds en anglais."), None);
        assert!(prompt.starts_with("Réponds en anglais."));
        // The context is still embedded.
        assert!(prompt.contains("[Document 1]"));
        assert!(!prompt.contains("assistant IA"));
    }

    #[test]
    fn rag_messages_wrap_prompt_history_and_question() {
        let results = vec![result("a.txt", &"contenu ".repeat(30), 0.9)];
        let history: Vec<ChatMessage> = (0..12)
            .map(|i| ChatMessage::user(format!("message {i}")))
            .collect();
        let messages = rag_messages("question finale", &results, &history, None, None);

        assert_eq!(messages.len(), 9);
        assert_eq!(messages[0].role, crate::models::ChatRole::System);
        assert!(messages[0].content.contains("[Document 1]"));
        assert_eq!(messages[1].content, "message 5");
        assert_eq!(messages.last().unwrap().content, "question finale");
    }
}
