//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use super::models;
use super::parameters::SearchParameters;
use super::plan::ExistingRootPolicy;
use super::result::Feature;
use super::schema::FunctionSchema;
use crate::core::rerank::{ReRanker, Signal, SignalWeight};
use crate::error::AgentError;

/// Default model for planning and parameter selection.
const DEFAULT_REASONING_MODEL: &str = "gpt-4o";
/// Default model for answering nodes.
const DEFAULT_QA_MODEL: &str = "gpt-3.5-turbo";
/// Default model for prompts too large for the QA model.
const DEFAULT_FALLBACK_QA_MODEL: &str = "gpt-3.5-turbo-16k";
/// Tokens kept free for the completion when sizing prompts.
const DEFAULT_CONTEXT_RESERVE_TOKENS: usize = 500;
/// Default reasoning agent max tokens.
const DEFAULT_REASONING_MAX_TOKENS: u32 = 1024;
/// Default QA max tokens.
const DEFAULT_QA_MAX_TOKENS: u32 = 500;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Candidates fetched when backend re-ranking is enabled.
const DEFAULT_RERANK_CANDIDATE_POOL: usize = 50;
/// Default concurrent blocking retrieval calls.
const DEFAULT_RETRIEVAL_WORKERS: usize = 8;
/// Default maximum question length in characters.
const DEFAULT_MAX_QUERY_CHARS: usize = 2000;

/// Configuration for the search agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for query planning and parameter selection.
    pub reasoning_model: String,
    /// Model answering each node.
    pub qa_model: String,
    /// Larger-context model used when a prompt overflows `qa_model`.
    pub fallback_qa_model: String,
    /// Context window of `qa_model`, when the catalog does not know it.
    pub qa_context_window: Option<usize>,
    /// Context window of `fallback_qa_model`, when the catalog does not know it.
    pub fallback_context_window: Option<usize>,
    /// Tokens kept free for the completion.
    pub context_reserve_tokens: usize,
    /// Maximum tokens for planning and parameter responses.
    pub reasoning_max_tokens: u32,
    /// Maximum tokens for answers.
    pub qa_max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Enabled features.
    pub features: BTreeSet<Feature>,
    /// Retrieval parameters when automatic selection is off.
    pub default_search: SearchParameters,
    /// Retrieval `top_k` when backend re-ranking is on.
    pub rerank_candidate_pool: usize,
    /// Concurrent blocking retrieval calls.
    pub retrieval_workers: usize,
    /// Re-ranking signal weights.
    pub rerank_weights: Vec<SignalWeight>,
    /// Retrieval filters applied to every search.
    pub filters: BTreeMap<String, String>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
    /// Behaviour when the planner already rooted the plan at the question.
    pub existing_root_policy: ExistingRootPolicy,
    /// Longest accepted question, in characters.
    pub max_query_chars: usize,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Whether `feature` is enabled.
    #[must_use]
    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Context window of the QA model.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if the model is unknown and no
    /// override is set.
    pub fn qa_window(&self) -> Result<usize, AgentError> {
        resolve_window(&self.qa_model, self.qa_context_window)
    }

    /// Context window of the fallback QA model.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if the model is unknown and no
    /// override is set.
    pub fn fallback_window(&self) -> Result<usize, AgentError> {
        resolve_window(&self.fallback_qa_model, self.fallback_context_window)
    }
}

fn resolve_window(model: &str, window: Option<usize>) -> Result<usize, AgentError> {
    window
        .or_else(|| models::context_window(model))
        .ok_or_else(|| AgentError::InvalidConfig {
            message: format!("unknown context window for model '{model}'; set it explicitly"),
        })
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    reasoning_model: Option<String>,
    qa_model: Option<String>,
    fallback_qa_model: Option<String>,
    qa_context_window: Option<usize>,
    fallback_context_window: Option<usize>,
    context_reserve_tokens: Option<usize>,
    reasoning_max_tokens: Option<u32>,
    qa_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    features: Option<BTreeSet<Feature>>,
    default_search: Option<SearchParameters>,
    rerank_candidate_pool: Option<usize>,
    retrieval_workers: Option<usize>,
    rerank_weights: Option<Vec<SignalWeight>>,
    filters: BTreeMap<String, String>,
    prompt_dir: Option<PathBuf>,
    existing_root_policy: Option<ExistingRootPolicy>,
    max_query_chars: Option<usize>,
    invalid: Vec<String>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// Unparseable values are reported by [`AgentConfigBuilder::build`].
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("SEARCH_AGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("SEARCH_AGENT_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("SEARCH_AGENT_BASE_URL"))
                .ok();
        }
        if self.reasoning_model.is_none() {
            self.reasoning_model = std::env::var("SEARCH_AGENT_REASONING_MODEL").ok();
        }
        if self.qa_model.is_none() {
            self.qa_model = std::env::var("SEARCH_AGENT_QA_MODEL").ok();
        }
        if self.fallback_qa_model.is_none() {
            self.fallback_qa_model = std::env::var("SEARCH_AGENT_FALLBACK_MODEL").ok();
        }
        if self.features.is_none()
            && let Ok(list) = std::env::var("SEARCH_AGENT_FEATURES")
        {
            match Feature::parse_list(&list) {
                Ok(features) => self.features = Some(features),
                Err(e) => self.invalid.push(format!("SEARCH_AGENT_FEATURES: {e}")),
            }
        }
        if self.retrieval_workers.is_none()
            && let Ok(raw) = std::env::var("SEARCH_AGENT_RETRIEVAL_WORKERS")
        {
            match raw.parse() {
                Ok(n) => self.retrieval_workers = Some(n),
                Err(_) => self
                    .invalid
                    .push(format!("SEARCH_AGENT_RETRIEVAL_WORKERS: not a number: {raw}")),
            }
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("SEARCH_AGENT_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the reasoning model.
    #[must_use]
    pub fn reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning_model = Some(model.into());
        self
    }

    /// Sets the QA model.
    #[must_use]
    pub fn qa_model(mut self, model: impl Into<String>) -> Self {
        self.qa_model = Some(model.into());
        self
    }

    /// Sets the fallback QA model.
    #[must_use]
    pub fn fallback_qa_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_qa_model = Some(model.into());
        self
    }

    /// Overrides the QA model's context window.
    #[must_use]
    pub const fn qa_context_window(mut self, tokens: usize) -> Self {
        self.qa_context_window = Some(tokens);
        self
    }

    /// Overrides the fallback model's context window.
    #[must_use]
    pub const fn fallback_context_window(mut self, tokens: usize) -> Self {
        self.fallback_context_window = Some(tokens);
        self
    }

    /// Sets the tokens kept free for the completion.
    #[must_use]
    pub const fn context_reserve_tokens(mut self, tokens: usize) -> Self {
        self.context_reserve_tokens = Some(tokens);
        self
    }

    /// Sets the reasoning max tokens.
    #[must_use]
    pub const fn reasoning_max_tokens(mut self, n: u32) -> Self {
        self.reasoning_max_tokens = Some(n);
        self
    }

    /// Sets the QA max tokens.
    #[must_use]
    pub const fn qa_max_tokens(mut self, n: u32) -> Self {
        self.qa_max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Replaces the enabled features.
    #[must_use]
    pub fn features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features = Some(features.into_iter().collect());
        self
    }

    /// Enables one feature.
    #[must_use]
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.get_or_insert_with(BTreeSet::new).insert(feature);
        self
    }

    /// Sets the static retrieval parameters.
    #[must_use]
    pub const fn default_search(mut self, params: SearchParameters) -> Self {
        self.default_search = Some(params);
        self
    }

    /// Sets the candidate pool used with backend re-ranking.
    #[must_use]
    pub const fn rerank_candidate_pool(mut self, n: usize) -> Self {
        self.rerank_candidate_pool = Some(n);
        self
    }

    /// Sets the number of concurrent retrieval calls.
    #[must_use]
    pub const fn retrieval_workers(mut self, n: usize) -> Self {
        self.retrieval_workers = Some(n);
        self
    }

    /// Sets the re-ranking signal weights.
    #[must_use]
    pub fn rerank_weights(mut self, weights: Vec<SignalWeight>) -> Self {
        self.rerank_weights = Some(weights);
        self
    }

    /// Adds a retrieval filter.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the behaviour for an already rooted question.
    #[must_use]
    pub const fn existing_root_policy(mut self, policy: ExistingRootPolicy) -> Self {
        self.existing_root_policy = Some(policy);
        self
    }

    /// Sets the longest accepted question.
    #[must_use]
    pub const fn max_query_chars(mut self, n: usize) -> Self {
        self.max_query_chars = Some(n);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set and
    /// [`AgentError::InvalidConfig`] for unparseable environment values, a
    /// zero worker count, out-of-range default search parameters or
    /// re-ranking weights that [`ReRanker::new`] rejects.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        if !self.invalid.is_empty() {
            return Err(AgentError::InvalidConfig {
                message: self.invalid.join("; "),
            });
        }
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let retrieval_workers = self.retrieval_workers.unwrap_or(DEFAULT_RETRIEVAL_WORKERS);
        if retrieval_workers == 0 {
            return Err(AgentError::InvalidConfig {
                message: "retrieval_workers must be at least 1".to_string(),
            });
        }

        let default_search = self.default_search.unwrap_or_default();
        default_search
            .validate()
            .map_err(|message| AgentError::InvalidConfig {
                message: format!("default search parameters: {message}"),
            })?;
        let rerank_weights = self.rerank_weights.unwrap_or_else(|| {
            vec![SignalWeight {
                signal: Signal::Relevance,
                weight: 1.0,
            }]
        });
        ReRanker::new(rerank_weights.clone())?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            reasoning_model: self
                .reasoning_model
                .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
            qa_model: self
                .qa_model
                .unwrap_or_else(|| DEFAULT_QA_MODEL.to_string()),
            fallback_qa_model: self
                .fallback_qa_model
                .unwrap_or_else(|| DEFAULT_FALLBACK_QA_MODEL.to_string()),
            qa_context_window: self.qa_context_window,
            fallback_context_window: self.fallback_context_window,
            context_reserve_tokens: self
                .context_reserve_tokens
                .unwrap_or(DEFAULT_CONTEXT_RESERVE_TOKENS),
            reasoning_max_tokens: self
                .reasoning_max_tokens
                .unwrap_or(DEFAULT_REASONING_MAX_TOKENS),
            qa_max_tokens: self.qa_max_tokens.unwrap_or(DEFAULT_QA_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            features: self.features.unwrap_or_default(),
            default_search,
            rerank_candidate_pool: self
                .rerank_candidate_pool
                .unwrap_or(DEFAULT_RERANK_CANDIDATE_POOL),
            retrieval_workers,
            rerank_weights,
            filters: self.filters,
            prompt_dir: self.prompt_dir,
            existing_root_policy: self.existing_root_policy.unwrap_or_default(),
            max_query_chars: self.max_query_chars.unwrap_or(DEFAULT_MAX_QUERY_CHARS),
        })
    }
}
