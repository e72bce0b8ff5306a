//! Query plan execution engine.
//!
//! Decomposes a question into a DAG of sub-questions, answers them in
//! concurrent waves with retrieved evidence, and aggregates the root
//! answer. Uses a pluggable provider abstraction backed by
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → SearchAgent
//!   ├── PlannerAgent (optional, QueryPlan function call)
//!   ├── QueryPlan::insert_at_root + validate
//!   ├── QueryPlanExecutor: waves of concurrent NodePipelines
//!   │   ├── ParameterAgent (optional, SearchParameters function call)
//!   │   ├── EvidenceRetriever on the blocking pool
//!   │   ├── ReRanker
//!   │   ├── ContextBudgetSelector (QA or fallback model)
//!   │   └── AnswerSynthesizer
//!   └── ExcerptAgent (optional, GenerateAnswer function call)
//! ```

pub mod budget;
pub mod client;
pub mod config;
pub mod executor;
pub mod formatting;
pub mod message;
pub mod models;
pub mod node;
pub mod parameters;
pub mod plan;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod result;
pub mod schema;
pub mod search_agent;
pub mod synthesizer;
#[cfg(test)]
pub mod testing;
pub mod tool;
pub mod traits;
pub mod usage;

// Re-export key types
pub use budget::{BudgetOutcome, ContextBudgetSelector, HeuristicTokenCounter, TokenCounter};
pub use client::create_provider;
pub use config::{AgentConfig, AgentConfigBuilder};
pub use executor::{NodeRunner, QueryPlanExecutor};
pub use formatting::AnswerExcerpt;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use parameters::SearchParameters;
pub use plan::{ExistingRootPolicy, Query, QueryId, QueryPlan};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use result::{AgentResult, AppliedSearchParameters, Context, Feature, QueryResult};
pub use schema::FunctionSchema;
pub use search_agent::SearchAgent;
pub use tool::{ToolCall, ToolDefinition};
pub use traits::{Agent, AgentResponse};
pub use usage::{UsageScope, UsageTotals};
