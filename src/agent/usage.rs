//! Token and cost accounting for one agent run.
//!
//! A [`UsageScope`] is opened at the start of a run and every model call
//! made during the run goes through a [`MeteredProvider`] wrapping the real
//! provider, so nested calls from concurrent wave tasks all land in the
//! same totals.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::models;
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Accumulated usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Number of model calls.
    pub calls: u32,
    /// Prompt tokens across all calls.
    pub prompt_tokens: u64,
    /// Completion tokens across all calls.
    pub completion_tokens: u64,
    /// Total tokens across all calls.
    pub total_tokens: u64,
    /// USD cost from the model catalog.
    pub cost: f64,
}

/// Thread-safe usage accumulator.
#[derive(Debug, Default)]
pub struct UsageScope {
    totals: Mutex<UsageTotals>,
}

impl UsageScope {
    /// Opens an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call made with `model`.
    pub fn record(&self, model: &str, usage: &TokenUsage) {
        let cost = models::cost(model, usage.prompt_tokens, usage.completion_tokens);
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.calls += 1;
        totals.prompt_tokens += u64::from(usage.prompt_tokens);
        totals.completion_tokens += u64::from(usage.completion_tokens);
        totals.total_tokens += u64::from(usage.total_tokens);
        totals.cost += cost;
    }

    /// Snapshot of the totals so far.
    #[must_use]
    pub fn totals(&self) -> UsageTotals {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Provider wrapper that records every call into a [`UsageScope`].
pub struct MeteredProvider<'a> {
    inner: &'a dyn LlmProvider,
    scope: &'a UsageScope,
}

impl<'a> MeteredProvider<'a> {
    /// Wraps `inner`, recording into `scope`.
    #[must_use]
    pub fn new(inner: &'a dyn LlmProvider, scope: &'a UsageScope) -> Self {
        Self { inner, scope }
    }
}

#[async_trait]
impl LlmProvider for MeteredProvider<'_> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self.inner.chat(request).await?;
        self.scope.record(&request.model, &response.usage);
        debug!(
            model = %request.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "model call recorded"
        );
        Ok(response)
    }
}
