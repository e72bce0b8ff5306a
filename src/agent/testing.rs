//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::LlmProvider;
use super::tool::ToolCall;
use crate::core::evidence::{Evidence, EvidenceRetriever, SearchRequest};
use crate::error::AgentError;

type Answerer = Box<dyn Fn(&ChatRequest) -> String + Send + Sync>;

/// Provider answering from scripts instead of a model.
///
/// Requests forcing a function are answered from the queue registered for
/// that function; plain requests from the text queue or the answerer. The
/// last queued entry repeats once the queue is down to one.
#[derive(Default)]
pub struct ScriptedProvider {
    calls: Mutex<HashMap<String, VecDeque<(String, String)>>>,
    texts: Mutex<VecDeque<ChatResponse>>,
    answerer: Option<Answerer>,
    failure: Option<String>,
    usage: TokenUsage,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests forcing `name` with a call to `name`.
    pub fn with_function(self, name: &str, arguments: &str) -> Self {
        self.with_call(name, name, arguments)
    }

    /// Answers requests forcing `choice` with a call to `called`.
    pub fn with_call(self, choice: &str, called: &str, arguments: &str) -> Self {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(choice.to_string())
            .or_default()
            .push_back((called.to_string(), arguments.to_string()));
        self
    }

    /// Queues a plain text response.
    pub fn with_text(self, content: &str, usage: TokenUsage) -> Self {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(ChatResponse {
                content: content.to_string(),
                usage,
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            });
        self
    }

    /// Computes plain text responses from the request.
    pub fn with_answerer(
        mut self,
        answerer: impl Fn(&ChatRequest) -> String + Send + Sync + 'static,
    ) -> Self {
        self.answerer = Some(Box::new(answerer));
        self
    }

    /// Usage reported for function calls and answerer responses.
    pub const fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Fails every plain text request.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(choice) = &request.tool_choice {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            let call = calls.get_mut(choice).and_then(Self::next);
            return Ok(ChatResponse {
                content: String::new(),
                usage: self.usage,
                tool_calls: call
                    .map(|(name, arguments)| ToolCall {
                        id: "call_scripted".to_string(),
                        name,
                        arguments,
                    })
                    .into_iter()
                    .collect(),
                finish_reason: Some("tool_calls".to_string()),
            });
        }

        if let Some(message) = &self.failure {
            return Err(AgentError::ApiRequest {
                message: message.clone(),
                status: Some(500),
            });
        }
        if let Some(answerer) = &self.answerer {
            return Ok(ChatResponse {
                content: answerer(request),
                usage: self.usage,
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            });
        }
        let mut texts = self.texts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Self::next(&mut texts).unwrap_or_else(|| ChatResponse {
            content: "answer".to_string(),
            usage: self.usage,
            ..ChatResponse::default()
        }))
    }
}

/// Retriever returning fixed evidence.
#[derive(Default)]
pub struct ScriptedRetriever {
    by_query: HashMap<String, Vec<Evidence>>,
    fallback: Vec<Evidence>,
    failure: Option<String>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedRetriever {
    /// Returns `evidence` for every query.
    pub fn new(evidence: Vec<Evidence>) -> Self {
        Self {
            fallback: evidence,
            ..Self::default()
        }
    }

    /// Returns `evidence` for exactly `query`.
    pub fn with_results_for(mut self, query: &str, evidence: Vec<Evidence>) -> Self {
        self.by_query.insert(query.to_string(), evidence);
        self
    }

    /// Fails every search.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EvidenceRetriever for ScriptedRetriever {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Evidence>, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if let Some(message) = &self.failure {
            return Err(AgentError::Retrieval {
                message: message.clone(),
            });
        }
        let results = self.by_query.get(&request.query).unwrap_or(&self.fallback);
        Ok(results.iter().take(request.top_k).cloned().collect())
    }
}

/// Evidence with ids `doc-0..` and the given scores.
pub fn evidence(prefix: &str, scores: &[f64]) -> Vec<Evidence> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| Evidence::new(format!("{prefix} text {i}"), format!("{prefix}-{i}"), *s))
        .collect()
}
