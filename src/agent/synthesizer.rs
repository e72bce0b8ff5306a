//! Answer synthesizer for plan nodes.
//!
//! Sends a node's assembled prompt to the QA model chosen by the
//! [`ContextBudgetSelector`](super::budget::ContextBudgetSelector) and
//! returns the free-text answer.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::message::ChatMessage;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Agent that answers one node from evidence and dependency answers.
pub struct AnswerSynthesizer {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnswerSynthesizer {
    /// Creates a synthesizer on the QA model.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.qa_model.clone(),
            max_tokens: config.qa_max_tokens,
            system_prompt,
        }
    }

    /// Answers with `messages`, using `model` for this call only.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on transport failure.
    pub async fn answer(
        &self,
        provider: &dyn LlmProvider,
        messages: Vec<ChatMessage>,
        model: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = self.request(messages);
        model.clone_into(&mut request.model);
        let response = provider.chat(&request).await?;
        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
            tool_calls: response.tool_calls,
        })
    }
}

#[async_trait]
impl Agent for AnswerSynthesizer {
    fn name(&self) -> &'static str {
        "synthesizer"
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
}
