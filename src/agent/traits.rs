//! Agent trait definition.
//!
//! The planner, parameter selector, answer synthesizer and excerpt agent
//! implement this trait, which gives them one way of turning their
//! configuration into a [`ChatRequest`].

use async_trait::async_trait;
use tracing::debug;

use super::message::{ChatMessage, ChatRequest, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use super::tool::{ToolCall, ToolDefinition};
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
    /// Function calls returned by the model.
    pub tool_calls: Vec<ToolCall>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (planning, parameter tuning,
/// answering) with a fixed system prompt and model configuration.
/// Agents that return structured output override [`Agent::function`];
/// the model is then forced to call that function.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Function the model must call, if the agent expects structured output.
    fn function(&self) -> Option<ToolDefinition> {
        None
    }

    /// Builds the request for a prepared message list.
    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let function = self.function();
        let tool_choice = function.as_ref().map(|f| f.name.clone());
        ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            tools: function.into_iter().collect(),
            tool_choice,
        }
    }

    /// Executes the agent with its system prompt and one user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute_messages(
            provider,
            vec![system_message(self.system_prompt()), user_message(user_msg)],
        )
        .await
    }

    /// Executes the agent against a prepared message list.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute_messages(
        &self,
        provider: &dyn LlmProvider,
        messages: Vec<ChatMessage>,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.request(messages);
        debug!(
            agent = self.name(),
            model = %request.model,
            function = request.tool_choice.as_deref().unwrap_or("-"),
            provider = provider.name(),
            "agent call"
        );
        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
            tool_calls: response.tool_calls,
        })
    }
}
