//! Per-node pipeline: parameters, retrieval, re-ranking, prompt, model
//! selection and synthesis.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use super::budget::ContextBudgetSelector;
use super::executor::NodeRunner;
use super::parameters::{ParameterAgent, SearchParameters};
use super::plan::Query;
use super::prompt::{AnsweredQuestion, build_answer_messages};
use super::provider::LlmProvider;
use super::result::{AppliedSearchParameters, QueryResult};
use super::synthesizer::AnswerSynthesizer;
use crate::core::evidence::{Evidence, EvidenceRetriever, SearchRequest};
use crate::core::rerank::ReRanker;
use crate::error::AgentError;

/// Retrieval settings shared by every node of one run.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Parameters used when no parameter agent is configured.
    pub default_search: SearchParameters,
    /// Ask the backend to re-rank and widen the candidate pool.
    pub cross_encoder: bool,
    /// Candidates fetched when `cross_encoder` is on.
    pub candidate_pool: usize,
    /// Filters sent with every search.
    pub filters: BTreeMap<String, String>,
    /// Personalisation vector sent with every search.
    pub personalization: Option<Vec<f32>>,
}

/// The [`NodeRunner`] used by the search agent.
pub struct NodePipeline<'a> {
    pub(crate) provider: &'a dyn LlmProvider,
    pub(crate) retriever: Arc<dyn EvidenceRetriever>,
    pub(crate) retrieval_permits: Arc<Semaphore>,
    pub(crate) parameter_agent: Option<&'a ParameterAgent>,
    pub(crate) reranker: &'a ReRanker,
    pub(crate) budget: &'a ContextBudgetSelector,
    pub(crate) synthesizer: &'a AnswerSynthesizer,
    pub(crate) role_prompt: &'a str,
    pub(crate) profile: Option<String>,
    pub(crate) settings: RetrievalSettings,
}

impl NodePipeline<'_> {
    async fn search_parameters(&self, question: &str) -> Result<SearchParameters, AgentError> {
        match self.parameter_agent {
            Some(agent) => agent.select(self.provider, question).await,
            None => Ok(self.settings.default_search),
        }
    }

    /// Runs the blocking retriever on the blocking pool, at most
    /// `retrieval_workers` at a time.
    async fn retrieve(&self, request: SearchRequest) -> Result<Vec<Evidence>, AgentError> {
        let permit = Arc::clone(&self.retrieval_permits)
            .acquire_owned()
            .await
            .map_err(|e| AgentError::Orchestration {
                message: format!("retrieval pool closed: {e}"),
            })?;
        let retriever = Arc::clone(&self.retriever);

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            retriever.search(&request)
        })
        .await
        .map_err(|e| AgentError::Retrieval {
            message: format!("retrieval task failed: {e}"),
        })?
    }
}

#[async_trait]
impl NodeRunner for NodePipeline<'_> {
    async fn run_node(
        &self,
        query: &Query,
        dependencies: &[&QueryResult],
    ) -> Result<QueryResult, AgentError> {
        let params = self.search_parameters(&query.question).await?;

        let top_k = usize::try_from(params.top_k).unwrap_or(usize::MAX).max(1);
        let re_rank = self.settings.cross_encoder;
        let retrieval_top_k = if re_rank {
            self.settings.candidate_pool.max(top_k)
        } else {
            top_k
        };

        let request = SearchRequest {
            query: query.question.clone(),
            mode: params.mode,
            top_k: retrieval_top_k,
            alpha: params.alpha,
            re_rank,
            filters: self.settings.filters.clone(),
            personalization: self.settings.personalization.clone(),
        };
        let candidates = self.retrieve(request).await?;
        let retrieved = candidates.len();
        let sources = self.reranker.rerank(candidates, top_k);
        debug!(
            query_id = query.id,
            retriever = self.retriever.name(),
            retrieved,
            kept = sources.len(),
            "evidence re-ranked"
        );

        let answered: Vec<AnsweredQuestion<'_>> = dependencies
            .iter()
            .map(|d| AnsweredQuestion {
                question: &d.query.question,
                answer: &d.result,
            })
            .collect();
        let messages = build_answer_messages(
            self.role_prompt,
            &query.question,
            &sources,
            &answered,
            self.profile.as_deref(),
        );

        let selection = self.budget.select(query.id, &messages);
        let response = self
            .synthesizer
            .answer(self.provider, messages, &selection.model)
            .await?;

        Ok(QueryResult {
            query: query.clone(),
            result: response.content,
            sources,
            search_parameters: AppliedSearchParameters {
                top_k,
                retrieval_top_k,
                mode: params.mode,
                alpha: params.alpha,
                re_rank,
                filters: self.settings.filters.clone(),
            },
            model: selection.model,
            budget: selection.outcome,
        })
    }
}
