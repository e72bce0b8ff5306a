//! Retrieval building blocks with no LLM involvement.

pub mod corpus;
pub mod evidence;
pub mod rerank;

pub use corpus::{CorpusDocument, CorpusRetriever};
pub use evidence::{Evidence, EvidenceRetriever, SearchMode, SearchRequest};
pub use rerank::{RankedEvidence, ReRanker, Signal, SignalWeight};
