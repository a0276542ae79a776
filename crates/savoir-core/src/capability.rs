//! Static capability table for the generation models.
//!
//! Maps a generation-model identifier to the context budget, chunk count,
//! and prompt verbosity the model can actually make use of. Unknown
//! identifiers fall back to [`DEFAULT_CAPABILITIES`] — never an error.

use serde::{Deserialize, Serialize};

/// Verbosity/strictness tier of the instruction template wrapped around
/// retrieved context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Small models: terse, hard-line "use only the documents" rules.
    Strict,
    /// Mid-size models: moderate explanation, still document-grounded.
    Balanced,
    /// Large models: full structured synthesis instructions.
    Rich,
}

/// What a generation model can usefully consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCapabilities {
    /// Character budget for the injected context block.
    pub max_context: usize,
    /// Maximum number of chunks worth injecting.
    pub max_chunks: usize,
    pub prompt_mode: PromptMode,
}

/// Fallback for unknown model identifiers: the mid-tier 3–4B entries are
/// the center of the supported model list, so an unknown model is assumed
/// comparable.
pub const DEFAULT_CAPABILITIES: ModelCapabilities = ModelCapabilities {
    max_context: 5000,
    max_chunks: 6,
    prompt_mode: PromptMode::Balanced,
};

const CAPABILITIES: &[(&str, ModelCapabilities)] = &[
    (
        "llama-3.2-1b",
        ModelCapabilities {
            max_context: 3000,
            max_chunks: 4,
            prompt_mode: PromptMode::Strict,
        },
    ),
    (
        "phi-3.5-3.8b",
        ModelCapabilities {
            max_context: 5000,
            max_chunks: 6,
            prompt_mode: PromptMode::Balanced,
        },
    ),
    (
        "qwen2.5-3b",
        ModelCapabilities {
            max_context: 5000,
            max_chunks: 6,
            prompt_mode: PromptMode::Balanced,
        },
    ),
    (
        "llama-3.1-8b",
        ModelCapabilities {
            max_context: 8000,
            max_chunks: 8,
            prompt_mode: PromptMode::Rich,
        },
    ),
];

/// Capabilities of `model_id`, falling back to [`DEFAULT_CAPABILITIES`].
pub fn capabilities_for(model_id: &str) -> ModelCapabilities {
    CAPABILITIES
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, caps)| *caps)
        .unwrap_or(DEFAULT_CAPABILITIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve() {
        let caps = capabilities_for("llama-3.1-8b");
        assert_eq!(caps.prompt_mode, PromptMode::Rich);
        assert_eq!(caps.max_chunks, 8);
    }

    #[test]
    fn unknown_model_falls_back_to_mid_tier() {
        let caps = capabilities_for("modèle-inconnu-99b");
        assert_eq!(caps, DEFAULT_CAPABILITIES);
        assert_eq!(caps.prompt_mode, PromptMode::Balanced);
    }

    #[test]
    fn small_models_are_strict() {
        assert_eq!(
            capabilities_for("llama-3.2-1b").prompt_mode,
            PromptMode::Strict
        );
    }
}
