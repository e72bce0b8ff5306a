//! Retrieved evidence and the retriever interface.
//!
//! The engine never talks to a vector store directly. Anything that can
//! answer a [`SearchRequest`] with a ranked list of [`Evidence`] can be
//! plugged in as an [`EvidenceRetriever`].

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Retrieval strategy understood by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Pure vector similarity search.
    Semantic,
    /// Weighted blend of vector and keyword search (see `alpha`).
    #[default]
    Hybrid,
    /// BM25 keyword search.
    Keyword,
}

impl SearchMode {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
            Self::Keyword => "keyword",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            "keyword" | "bm25" => Ok(Self::Keyword),
            other => Err(AgentError::InvalidConfig {
                message: format!("unknown search mode: {other}"),
            }),
        }
    }
}

/// A retrieved text snippet.
///
/// Two pieces of evidence are equal when their `identity` (document id or
/// URL) is equal, regardless of text or score. This is what source
/// deduplication relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Snippet text.
    pub text: String,
    /// Document identity (id or URL).
    pub identity: String,
    /// Backend relevance score. Its scale depends on the search mode.
    #[serde(default)]
    pub relevance_score: f64,
    /// Number of documents referencing this one, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_references: Option<u32>,
    /// Last update time as unix seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Evidence {
    /// Creates evidence with only the required fields.
    #[must_use]
    pub fn new(text: impl Into<String>, identity: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            text: text.into(),
            identity: identity.into(),
            relevance_score,
            num_references: None,
            updated_at: None,
        }
    }
}

impl PartialEq for Evidence {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Evidence {}

impl Hash for Evidence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

/// One retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Query text, sent to the backend as is.
    pub query: String,
    /// Retrieval strategy.
    pub mode: SearchMode,
    /// Number of candidates to return (at least 1).
    pub top_k: usize,
    /// Vector vs keyword weight for hybrid search, in `[0, 1]`.
    pub alpha: f64,
    /// Ask the backend to apply its cross-encoder re-ranking.
    pub re_rank: bool,
    /// Exact-match metadata filters.
    pub filters: BTreeMap<String, String>,
    /// Optional user profile vector used to personalise vector search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization: Option<Vec<f32>>,
}

/// Vector/keyword search backend.
///
/// `search` is a blocking call. The engine runs it on the blocking thread
/// pool, possibly from several nodes at once, so implementations must be
/// safe to call concurrently.
pub trait EvidenceRetriever: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Returns candidates ordered by the backend's own relevance.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] when the backend fails.
    fn search(&self, request: &SearchRequest) -> Result<Vec<Evidence>, AgentError>;
}
