//! Run inputs and outputs: features, caller context and results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::budget::BudgetOutcome;
use super::formatting::AnswerExcerpt;
use super::plan::{Query, QueryId, QueryPlan};
use crate::core::evidence::SearchMode;
use crate::core::rerank::RankedEvidence;
use crate::error::AgentError;

/// Optional engine behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    /// Decompose the question into a plan with the reasoning model.
    QueryPlanning,
    /// Let the reasoning model choose retrieval parameters per node.
    AutoSearchParameters,
    /// Widen retrieval and ask the backend to re-rank with its cross-encoder.
    CrossEncoderReRanking,
    /// Run the excerpt pass over the final answer.
    AnswerExcerpt,
}

impl Feature {
    /// All features.
    pub const ALL: [Self; 4] = [
        Self::QueryPlanning,
        Self::AutoSearchParameters,
        Self::CrossEncoderReRanking,
        Self::AnswerExcerpt,
    ];

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::QueryPlanning => "QUERY_PLANNING",
            Self::AutoSearchParameters => "AUTO_SEARCH_PARAMETERS",
            Self::CrossEncoderReRanking => "CROSS_ENCODER_RE_RANKING",
            Self::AnswerExcerpt => "ANSWER_EXCERPT",
        }
    }

    /// Parses a comma-separated list, ignoring blanks.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for an unknown name.
    pub fn parse_list(list: &str) -> Result<BTreeSet<Self>, AgentError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| AgentError::InvalidConfig {
                message: format!("unknown feature: {s}"),
            })
    }
}

/// Caller-supplied context for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Identifier of the asking user, for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Profile shown to the model when the user asks about themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<serde_json::Value>,
    /// Profile embedding passed to the retriever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_vector: Option<Vec<f32>>,
    /// Retrieval filters, overriding configured filters with the same key.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

/// Retrieval parameters a node actually ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedSearchParameters {
    /// Results kept after re-ranking.
    pub top_k: usize,
    /// Candidates requested from the retriever.
    pub retrieval_top_k: usize,
    /// Retrieval strategy.
    pub mode: SearchMode,
    /// Hybrid weight.
    pub alpha: f64,
    /// Whether backend re-ranking was requested.
    pub re_rank: bool,
    /// Filters sent to the retriever.
    pub filters: BTreeMap<String, String>,
}

/// Outcome of one plan node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The node.
    pub query: Query,
    /// Answer text.
    pub result: String,
    /// Re-ranked evidence the answer was based on.
    pub sources: Vec<RankedEvidence>,
    /// Retrieval parameters used.
    pub search_parameters: AppliedSearchParameters,
    /// Model that produced the answer.
    pub model: String,
    /// Why that model was chosen.
    pub budget: BudgetOutcome,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    /// The user's question.
    pub query: String,
    /// Final answer.
    pub answer: AnswerExcerpt,
    /// Sources of every node, deduplicated by identity in first-seen order.
    pub sources: Vec<RankedEvidence>,
    /// The executed plan.
    pub query_plan: QueryPlan,
    /// Per-node results.
    pub query_plan_results: BTreeMap<QueryId, QueryResult>,
    /// Enabled features.
    pub features: BTreeSet<Feature>,
    /// Caller context.
    pub context: Context,
    /// Tokens used by every model call of the run.
    pub total_tokens_used: u64,
    /// USD cost of every model call of the run.
    pub total_tokens_cost: f64,
    /// Number of model calls.
    pub model_calls: u32,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
}
