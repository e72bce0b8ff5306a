//! # search-agent-rs
//!
//! Query plan execution engine for retrieval-augmented question answering.
//!
//! A question is optionally decomposed by a reasoning model into a DAG of
//! dependent sub-questions ([`QueryPlan`]). The plan is executed in waves:
//! every node whose dependencies are answered runs concurrently, retrieving
//! evidence, re-ranking it, and asking a QA model sized to the prompt. The
//! root node's answer, the deduplicated sources and token/cost totals come
//! back as an [`AgentResult`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use search_agent::agent::{AgentConfig, Context, Feature, SearchAgent, create_provider};
//! use search_agent::core::CorpusRetriever;
//!
//! # async fn demo() -> Result<(), search_agent::AgentError> {
//! let config = AgentConfig::builder()
//!     .from_env()
//!     .feature(Feature::QueryPlanning)
//!     .build()?;
//! let provider = create_provider(&config)?;
//! let retriever = Arc::new(CorpusRetriever::from_path("docs.json".as_ref())?);
//!
//! let agent = SearchAgent::new(provider, retriever, config)?;
//! let result = agent.run("Capital and population of France?", &Context::default()).await?;
//! assert!(!result.answer.answer.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod logging;

pub use crate::agent::{AgentConfig, AgentResult, Context, Feature, QueryPlan, SearchAgent};
pub use crate::core::{Evidence, EvidenceRetriever, ReRanker, SearchMode, SearchRequest};
pub use crate::error::{AgentError, CommandError, Error, Result};
