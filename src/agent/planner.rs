//! Query planning agent.
//!
//! Decomposes a question into a [`QueryPlan`] of dependent sub-questions
//! through the forced `QueryPlan` function call.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::plan::QueryPlan;
use super::provider::LlmProvider;
use super::schema::FunctionSchema;
use super::tool::ToolDefinition;
use super::traits::Agent;
use crate::error::AgentError;

/// Agent that plans sub-questions for a query.
pub struct PlannerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl PlannerAgent {
    /// Creates a planner on the reasoning model.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.reasoning_model.clone(),
            max_tokens: config.reasoning_max_tokens,
            system_prompt,
        }
    }

    /// Returns the model's plan for `question`, as produced.
    ///
    /// The plan is not rooted or validated here; the caller inserts the
    /// original question at the root and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on transport failure and
    /// [`AgentError::SchemaBinding`] if the response does not bind.
    pub async fn plan(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
    ) -> Result<QueryPlan, AgentError> {
        let response = self.execute(provider, question).await?;
        QueryPlan::from_response(&response)
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
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
        Some(QueryPlan::definition())
    }
}
