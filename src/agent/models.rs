//! Catalog of known chat models.
//!
//! Maps a model name to its input context window and per-1K-token prices.
//! Lookup is by longest matching prefix, so dated snapshots such as
//! `gpt-4o-2024-08-06` resolve to their family.

use serde::Serialize;

/// Static facts about a model family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Name prefix of the family.
    pub prefix: &'static str,
    /// Maximum input context, in tokens.
    pub context_window: usize,
    /// USD per 1K prompt tokens.
    pub prompt_cost_per_1k: f64,
    /// USD per 1K completion tokens.
    pub completion_cost_per_1k: f64,
}

const fn model(
    prefix: &'static str,
    context_window: usize,
    prompt_cost_per_1k: f64,
    completion_cost_per_1k: f64,
) -> ModelInfo {
    ModelInfo {
        prefix,
        context_window,
        prompt_cost_per_1k,
        completion_cost_per_1k,
    }
}

/// Known model families.
pub const MODELS: &[ModelInfo] = &[
    model("gpt-3.5-turbo", 4_096, 0.0005, 0.0015),
    model("gpt-3.5-turbo-16k", 16_385, 0.003, 0.004),
    model("gpt-4", 8_192, 0.03, 0.06),
    model("gpt-4-32k", 32_768, 0.06, 0.12),
    model("gpt-4-turbo", 128_000, 0.01, 0.03),
    model("gpt-4o", 128_000, 0.0025, 0.01),
    model("gpt-4o-mini", 128_000, 0.000_15, 0.0006),
    model("gpt-4.1", 1_047_576, 0.002, 0.008),
    model("gpt-4.1-mini", 1_047_576, 0.0004, 0.0016),
];

/// Looks up a model by longest matching prefix.
#[must_use]
pub fn lookup(model: &str) -> Option<&'static ModelInfo> {
    MODELS
        .iter()
        .filter(|info| model.starts_with(info.prefix))
        .max_by_key(|info| info.prefix.len())
}

/// Context window of `model`, if known.
#[must_use]
pub fn context_window(model: &str) -> Option<usize> {
    lookup(model).map(|info| info.context_window)
}

/// USD cost of a call, or 0 for unknown models.
#[must_use]
pub fn cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    lookup(model).map_or(0.0, |info| {
        f64::from(prompt_tokens) / 1000.0 * info.prompt_cost_per_1k
            + f64::from(completion_tokens) / 1000.0 * info.completion_cost_per_1k
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("gpt-3.5-turbo", 4_096 ; "base turbo")]
    #[test_case("gpt-3.5-turbo-0613", 4_096 ; "dated turbo")]
    #[test_case("gpt-3.5-turbo-16k", 16_385 ; "16k turbo")]
    #[test_case("gpt-4-32k-0613", 32_768 ; "dated gpt-4 32k")]
    #[test_case("gpt-4o-2024-08-06", 128_000 ; "dated gpt-4o")]
    #[test_case("gpt-4o-mini", 128_000 ; "gpt-4o mini")]
    fn test_context_window(model: &str, expected: usize) {
        assert_eq!(context_window(model), Some(expected));
    }

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(lookup("gpt-4o-mini-2024-07-18").map(|m| m.prefix), Some("gpt-4o-mini"));
        assert_eq!(lookup("gpt-4-turbo").map(|m| m.prefix), Some("gpt-4-turbo"));
    }

    #[test]
    fn test_unknown_model() {
        assert!(lookup("llama-3-70b").is_none());
        assert!(cost("llama-3-70b", 1000, 1000).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cost() {
        let c = cost("gpt-4", 1000, 500);
        assert!((c - 0.06).abs() < 1e-12);
    }
}
