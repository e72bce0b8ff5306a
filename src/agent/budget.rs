//! Prompt-size based model selection.
//!
//! A prompt fits a model when its token count is at most the model's
//! context window minus a fixed reserve left for the completion. Prompts
//! that overflow the primary QA model move to the fallback model; prompts
//! that overflow both still go to the fallback, with a warning.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::message::ChatMessage;

/// Counts prompt tokens for a message list.
pub trait TokenCounter: Send + Sync {
    /// Estimated prompt tokens for `messages`.
    fn count(&self, messages: &[ChatMessage]) -> usize;
}

/// Character-based estimate: about four characters per token, plus a
/// small per-message overhead for role and framing tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

/// Framing tokens added per message.
const TOKENS_PER_MESSAGE: usize = 4;
/// Tokens priming the reply.
const REPLY_PRIMING_TOKENS: usize = 3;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, messages: &[ChatMessage]) -> usize {
        messages
            .iter()
            .map(|m| m.content.chars().count().div_ceil(4) + TOKENS_PER_MESSAGE)
            .sum::<usize>()
            + REPLY_PRIMING_TOKENS
    }
}

/// Which model a prompt was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetOutcome {
    /// Fits the primary model.
    Primary,
    /// Too large for the primary model, fits the fallback.
    Fallback,
    /// Too large for both; sent to the fallback anyway.
    Overflow,
}

impl BudgetOutcome {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Overflow => "overflow",
        }
    }
}

/// Routes a prompt of `prompt_tokens` given both windows and the reserve.
#[must_use]
pub const fn choose_model(
    prompt_tokens: usize,
    primary_window: usize,
    fallback_window: usize,
    reserve: usize,
) -> BudgetOutcome {
    if prompt_tokens <= primary_window.saturating_sub(reserve) {
        BudgetOutcome::Primary
    } else if prompt_tokens <= fallback_window.saturating_sub(reserve) {
        BudgetOutcome::Fallback
    } else {
        BudgetOutcome::Overflow
    }
}

/// A chosen model for one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSelection {
    /// Model to call.
    pub model: String,
    /// Estimated prompt tokens.
    pub prompt_tokens: usize,
    /// Routing decision.
    pub outcome: BudgetOutcome,
}

/// A model name with its context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelWindow {
    /// Model name.
    pub model: String,
    /// Context window in tokens.
    pub context_window: usize,
}

/// Picks the QA model for each node's prompt.
#[derive(Clone)]
pub struct ContextBudgetSelector {
    primary: ModelWindow,
    fallback: ModelWindow,
    reserve: usize,
    counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for ContextBudgetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBudgetSelector")
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("reserve", &self.reserve)
            .finish_non_exhaustive()
    }
}

impl ContextBudgetSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(
        primary: ModelWindow,
        fallback: ModelWindow,
        reserve: usize,
        counter: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            primary,
            fallback,
            reserve,
            counter,
        }
    }

    /// Chooses the model for `messages` of node `query_id`.
    #[must_use]
    pub fn select(&self, query_id: u32, messages: &[ChatMessage]) -> ModelSelection {
        let prompt_tokens = self.counter.count(messages);
        let outcome = choose_model(
            prompt_tokens,
            self.primary.context_window,
            self.fallback.context_window,
            self.reserve,
        );

        let model = match outcome {
            BudgetOutcome::Primary => {
                debug!(query_id, prompt_tokens, model = %self.primary.model, "prompt fits QA model");
                self.primary.model.clone()
            }
            BudgetOutcome::Fallback => {
                warn!(
                    query_id,
                    prompt_tokens,
                    context_window = self.primary.context_window,
                    model = %self.fallback.model,
                    "prompt too large for QA model, switching to fallback"
                );
                self.fallback.model.clone()
            }
            BudgetOutcome::Overflow => {
                warn!(
                    query_id,
                    prompt_tokens,
                    context_window = self.fallback.context_window,
                    model = %self.fallback.model,
                    "prompt larger than every available context window, proceeding with fallback"
                );
                self.fallback.model.clone()
            }
        };

        ModelSelection {
            model,
            prompt_tokens,
            outcome,
        }
    }
}
