//! File-backed keyword retriever.
//!
//! Loads a JSON array of documents and answers [`SearchRequest`]s by
//! counting how many distinct query words each document contains. It has
//! no vector index, so every search mode is served by the same term
//! overlap score; it exists so the engine can run end to end from the
//! command line without an external search service.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::evidence::{Evidence, EvidenceRetriever, SearchRequest};
use crate::error::AgentError;

/// One document in a corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Document text.
    pub text: String,
    /// Document identity (id or URL).
    pub identity: String,
    /// Metadata used for exact-match filtering.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Number of referencing documents.
    #[serde(default)]
    pub num_references: Option<u32>,
    /// Last update time as unix seconds.
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// In-memory corpus with precomputed word sets.
#[derive(Debug, Clone)]
pub struct CorpusRetriever {
    documents: Vec<(CorpusDocument, HashSet<String>)>,
}

impl CorpusRetriever {
    /// Builds a retriever over the given documents.
    #[must_use]
    pub fn new(documents: Vec<CorpusDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|doc| {
                let words = words(&doc.text);
                (doc, words)
            })
            .collect();
        Self { documents }
    }

    /// Loads a corpus from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] if the file cannot be read or is
    /// not a JSON array of documents.
    pub fn from_path(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AgentError::Retrieval {
            message: format!("cannot read corpus {}: {e}", path.display()),
        })?;
        let documents: Vec<CorpusDocument> =
            serde_json::from_str(&raw).map_err(|e| AgentError::Retrieval {
                message: format!("invalid corpus {}: {e}", path.display()),
            })?;
        Ok(Self::new(documents))
    }

    /// Number of documents in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the corpus holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl EvidenceRetriever for CorpusRetriever {
    fn name(&self) -> &'static str {
        "corpus"
    }

    #[allow(clippy::cast_precision_loss)]
    fn search(&self, request: &SearchRequest) -> Result<Vec<Evidence>, AgentError> {
        let query_words = words(&request.query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Evidence> = self
            .documents
            .iter()
            .filter(|(doc, _)| {
                request
                    .filters
                    .iter()
                    .all(|(k, v)| doc.metadata.get(k) == Some(v))
            })
            .filter_map(|(doc, doc_words)| {
                let matched = query_words.intersection(doc_words).count();
                (matched > 0).then(|| Evidence {
                    text: doc.text.clone(),
                    identity: doc.identity.clone(),
                    relevance_score: matched as f64 / query_words.len() as f64,
                    num_references: doc.num_references,
                    updated_at: doc.updated_at,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        hits.truncate(request.top_k);

        debug!(
            query = %request.query,
            mode = %request.mode,
            hits = hits.len(),
            "corpus search"
        );
        Ok(hits)
    }
}

/// Lowercased unicode words of `text`.
fn words(text: &str) -> HashSet<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}
