//! Final answer formatting.
//!
//! The optional excerpt pass asks the model to restate the root answer and
//! pull a supporting quote out of the sources, via the `GenerateAnswer`
//! function.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::config::AgentConfig;
use super::prompt::build_excerpt_message;
use super::provider::LlmProvider;
use super::schema::FunctionSchema;
use super::tool::ToolDefinition;
use super::traits::Agent;
use crate::core::rerank::RankedEvidence;
use crate::error::AgentError;

/// The answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerExcerpt {
    /// Answer text.
    pub answer: String,
    /// Short supporting quote from the sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl AnswerExcerpt {
    /// An answer without excerpt.
    #[must_use]
    pub fn plain(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            excerpt: None,
        }
    }
}

impl FunctionSchema for AnswerExcerpt {
    const NAME: &'static str = "GenerateAnswer";
    const DESCRIPTION: &'static str =
        "Generate a helpful, accurate and concise answer to the user's question.";

    fn parameters() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "Helpful, accurate and concise answer to the user's question."
                },
                "excerpt": {
                    "type": ["string", "null"],
                    "description": "Short snippet or quote from the sources that contains the \
                        answer. If there is no such excerpt, this field is null."
                }
            },
            "required": ["answer"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.answer.trim().is_empty() {
            Err("answer is empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Agent producing an [`AnswerExcerpt`] from a drafted answer.
pub struct ExcerptAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ExcerptAgent {
    /// Creates an excerpt agent on the QA model.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.qa_model.clone(),
            max_tokens: config.qa_max_tokens,
            system_prompt,
        }
    }

    /// Restates `answer` and extracts a supporting excerpt.
    ///
    /// Blank excerpts are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on transport failure and
    /// [`AgentError::SchemaBinding`] if the response does not bind.
    pub async fn format(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        answer: &str,
        sources: &[RankedEvidence],
    ) -> Result<AnswerExcerpt, AgentError> {
        let response = self
            .execute(provider, &build_excerpt_message(question, answer, sources))
            .await?;
        let mut formatted = AnswerExcerpt::from_response(&response)?;
        formatted.excerpt = formatted.excerpt.filter(|e| !e.trim().is_empty());
        Ok(formatted)
    }
}

#[async_trait]
impl Agent for ExcerptAgent {
    fn name(&self) -> &'static str {
        "excerpt"
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
        Some(AnswerExcerpt::definition())
    }
}
