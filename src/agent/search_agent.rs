//! The search agent facade.
//!
//! ```text
//! question → plan (single node, or planner + insert_at_root)
//!          → validate
//!          → QueryPlanExecutor, wave by wave
//!              └── NodePipeline per node:
//!                  parameters → retrieve → re-rank → prompt → model → answer
//!          → root answer (+ optional excerpt pass)
//!          → AgentResult with deduplicated sources and usage totals
//! ```
//!
//! Every model call of one `run()` goes through a single [`UsageScope`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::budget::{ContextBudgetSelector, HeuristicTokenCounter, ModelWindow, TokenCounter};
use super::config::AgentConfig;
use super::executor::QueryPlanExecutor;
use super::formatting::{AnswerExcerpt, ExcerptAgent};
use super::node::{NodePipeline, RetrievalSettings};
use super::parameters::ParameterAgent;
use super::plan::{QueryId, QueryPlan};
use super::planner::PlannerAgent;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::result::{AgentResult, Context, Feature, QueryResult};
use super::synthesizer::AnswerSynthesizer;
use super::usage::{MeteredProvider, UsageScope};
use crate::core::evidence::EvidenceRetriever;
use crate::core::rerank::{RankedEvidence, ReRanker};
use crate::error::AgentError;

/// Answers questions over an evidence backend.
pub struct SearchAgent {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn EvidenceRetriever>,
    config: AgentConfig,
    prompts: PromptSet,
    planner: PlannerAgent,
    parameter_agent: ParameterAgent,
    synthesizer: AnswerSynthesizer,
    excerpt_agent: ExcerptAgent,
    reranker: ReRanker,
    budget: ContextBudgetSelector,
    retrieval_permits: Arc<Semaphore>,
}

impl SearchAgent {
    /// Creates an agent with the heuristic token counter.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] when a QA model's context
    /// window is unknown or the re-rank weights are invalid.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn EvidenceRetriever>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        Self::with_token_counter(provider, retriever, config, Arc::new(HeuristicTokenCounter))
    }

    /// Creates an agent counting prompt tokens with `counter`.
    ///
    /// # Errors
    ///
    /// Same as [`SearchAgent::new`].
    pub fn with_token_counter(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn EvidenceRetriever>,
        config: AgentConfig,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, AgentError> {
        let budget = ContextBudgetSelector::new(
            ModelWindow {
                model: config.qa_model.clone(),
                context_window: config.qa_window()?,
            },
            ModelWindow {
                model: config.fallback_qa_model.clone(),
                context_window: config.fallback_window()?,
            },
            config.context_reserve_tokens,
            counter,
        );
        let reranker = ReRanker::new(config.rerank_weights.clone())?;
        let prompts = PromptSet::load(config.prompt_dir.as_deref());

        Ok(Self {
            planner: PlannerAgent::new(&config, prompts.planner.clone()),
            parameter_agent: ParameterAgent::new(&config, prompts.parameters.clone()),
            synthesizer: AnswerSynthesizer::new(&config, prompts.role.clone()),
            excerpt_agent: ExcerptAgent::new(&config, prompts.excerpt.clone()),
            retrieval_permits: Arc::new(Semaphore::new(config.retrieval_workers)),
            provider,
            retriever,
            prompts,
            reranker,
            budget,
            config,
        })
    }

    /// The agent's configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answers `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for an empty or oversized
    /// question, any plan validation error, and the first node error.
    pub async fn run(&self, query: &str, context: &Context) -> Result<AgentResult, AgentError> {
        let started = Instant::now();
        let question = query.trim();
        self.check_question(question)?;

        let scope = UsageScope::new();
        let provider = MeteredProvider::new(self.provider.as_ref(), &scope);
        info!(
            user_id = context.user_id.as_deref().unwrap_or("anonymous"),
            features = ?self.config.features,
            "search agent run started"
        );

        let plan = self.build_plan(&provider, question).await?;
        plan.validate()?;
        let root_id = plan.get_root_query_id()?;

        let pipeline = self.pipeline(&provider, context);
        let results = QueryPlanExecutor::new(&pipeline).execute(&plan).await?;

        let root = results.get(&root_id).ok_or_else(|| AgentError::Orchestration {
            message: format!("no result for root query {root_id}"),
        })?;
        let order = plan.get_execution_order()?;
        let sources = collect_sources(&order, &results);

        let answer = if self.config.has(Feature::AnswerExcerpt) {
            self.excerpt_agent
                .format(&provider, question, &root.result, &sources)
                .await?
        } else {
            AnswerExcerpt::plain(root.result.clone())
        };

        let totals = scope.totals();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            nodes = plan.len(),
            sources = sources.len(),
            model_calls = totals.calls,
            total_tokens = totals.total_tokens,
            cost = totals.cost,
            elapsed_ms,
            "search agent run finished"
        );

        Ok(AgentResult {
            query: question.to_string(),
            answer,
            sources,
            query_plan: plan,
            query_plan_results: results,
            features: self.config.features.clone(),
            context: context.clone(),
            total_tokens_used: totals.total_tokens,
            total_tokens_cost: totals.cost,
            model_calls: totals.calls,
            elapsed_ms,
        })
    }

    fn check_question(&self, question: &str) -> Result<(), AgentError> {
        if question.is_empty() {
            return Err(AgentError::InvalidConfig {
                message: "question is empty".to_string(),
            });
        }
        let chars = question.chars().count();
        if chars > self.config.max_query_chars {
            return Err(AgentError::InvalidConfig {
                message: format!(
                    "question is {chars} characters, longer than the limit of {}",
                    self.config.max_query_chars
                ),
            });
        }
        Ok(())
    }

    async fn build_plan(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
    ) -> Result<QueryPlan, AgentError> {
        if !self.config.has(Feature::QueryPlanning) {
            return Ok(QueryPlan::single(question));
        }

        let mut plan = self.planner.plan(provider, question).await?;
        let root = plan.insert_at_root(question, self.config.existing_root_policy)?;
        debug!(nodes = plan.len(), root, "query plan built");
        Ok(plan)
    }

    fn pipeline<'a>(&'a self, provider: &'a dyn LlmProvider, context: &Context) -> NodePipeline<'a> {
        let mut filters = self.config.filters.clone();
        filters.extend(context.filters.clone());

        NodePipeline {
            provider,
            retriever: Arc::clone(&self.retriever),
            retrieval_permits: Arc::clone(&self.retrieval_permits),
            parameter_agent: self
                .config
                .has(Feature::AutoSearchParameters)
                .then_some(&self.parameter_agent),
            reranker: &self.reranker,
            budget: &self.budget,
            synthesizer: &self.synthesizer,
            role_prompt: &self.prompts.role,
            profile: context.profile.as_ref().map(ToString::to_string),
            settings: RetrievalSettings {
                default_search: self.config.default_search,
                cross_encoder: self.config.has(Feature::CrossEncoderReRanking),
                candidate_pool: self.config.rerank_candidate_pool,
                filters,
                personalization: context.profile_vector.clone(),
            },
        }
    }
}

/// Sources of every node in execution order, first occurrence of each
/// identity kept.
fn collect_sources(
    order: &[QueryId],
    results: &BTreeMap<QueryId, QueryResult>,
) -> Vec<RankedEvidence> {
    let mut seen = HashSet::new();
    order
        .iter()
        .filter_map(|id| results.get(id))
        .flat_map(|r| r.sources.iter())
        .filter(|s| seen.insert(s.evidence.identity.clone()))
        .cloned()
        .collect()
}
