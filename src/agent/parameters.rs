//! Retrieval parameter selection.
//!
//! With automatic parameter generation enabled, the reasoning model picks
//! `top_k`, the search mode and the hybrid `alpha` for each node's
//! question through the `SearchParameters` function. Otherwise the static
//! defaults from [`AgentConfig`] are used.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::config::AgentConfig;
use super::prompt::build_parameter_message;
use super::provider::LlmProvider;
use super::schema::FunctionSchema;
use super::tool::ToolDefinition;
use super::traits::Agent;
use crate::core::evidence::SearchMode;
use crate::error::AgentError;

/// Largest `top_k` the model may request.
pub const MAX_TOP_K: u32 = 10;

const fn default_top_k() -> u32 {
    3
}

const fn default_alpha() -> f64 {
    0.75
}

/// Retrieval parameters for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Number of results to keep, in `[1, 10]`.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Retrieval strategy.
    #[serde(default)]
    pub mode: SearchMode,
    /// Vector vs keyword weight for hybrid search, in `[0, 1]`.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            mode: SearchMode::default(),
            alpha: default_alpha(),
        }
    }
}

impl FunctionSchema for SearchParameters {
    const NAME: &'static str = "SearchParameters";
    const DESCRIPTION: &'static str = "Class representing a queries search parameters.";

    fn parameters() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_TOP_K,
                    "default": default_top_k(),
                    "description": "Number of most relevant search results to return."
                },
                "mode": {
                    "type": "string",
                    "enum": ["semantic", "hybrid", "keyword"],
                    "default": "hybrid",
                    "description": "The search mode can be semantic, keyword or both (hybrid). \
                        Semantic searches embed the query text into a vector and do a KNN \
                        similarity search. Keyword searches rank results with BM25. Hybrid \
                        searches combine semantic and keyword search."
                },
                "alpha": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "default": default_alpha(),
                    "description": "Weighting of keyword vs semantic results in hybrid mode. \
                        0.5 weights both equally, 0 is a pure keyword search and 1 is a pure \
                        semantic search."
                }
            }
        })
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(format!("top_k must be in [1, {MAX_TOP_K}], got {}", self.top_k));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(format!("alpha must be in [0, 1], got {}", self.alpha));
        }
        Ok(())
    }
}

/// Agent that chooses [`SearchParameters`] for a question.
pub struct ParameterAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ParameterAgent {
    /// Creates a parameter agent on the reasoning model.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.reasoning_model.clone(),
            max_tokens: config.reasoning_max_tokens,
            system_prompt,
        }
    }

    /// Asks the model for parameters for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on transport failure and
    /// [`AgentError::SchemaBinding`] if the function call does not bind.
    pub async fn select(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
    ) -> Result<SearchParameters, AgentError> {
        let response = self
            .execute(provider, &build_parameter_message(question))
            .await?;
        SearchParameters::from_response(&response)
    }
}

#[async_trait]
impl Agent for ParameterAgent {
    fn name(&self) -> &'static str {
        "parameters"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn function(&self) -> Option<ToolDefinition> {
        Some(SearchParameters::definition())
    }
}
