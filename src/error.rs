//! Error types for the search agent.
//!
//! [`AgentError`] covers everything the query plan engine can fail with.
//! [`CommandError`] and [`Error`] are used by the CLI layer on top of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use thiserror::Error;

use crate::agent::plan::QueryId;

/// Errors raised by the query plan engine and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the LLM provider.
    #[error("no API key configured (set OPENAI_API_KEY or SEARCH_AGENT_API_KEY)")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The LLM API call failed.
    #[error("LLM API request failed: {message}")]
    ApiRequest {
        /// Transport or API error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// A model response could not be bound to a function-call schema.
    #[error("failed to bind {schema} function call: {message}")]
    SchemaBinding {
        /// Name of the schema that was expected.
        schema: &'static str,
        /// What went wrong.
        message: String,
    },

    /// The plan has zero or several root candidates.
    #[error("query plan must have exactly one root query, found candidates {candidates:?}")]
    AmbiguousRoot {
        /// Ids that are never referenced as a dependency.
        candidates: Vec<QueryId>,
    },

    /// Topological sort left nodes that can never become ready.
    #[error(
        "circular dependencies exist among these queries: {}",
        format_residual(.residual)
    )]
    CircularDependency {
        /// Unresolved id to remaining dependency set.
        residual: BTreeMap<QueryId, BTreeSet<QueryId>>,
    },

    /// Two plan nodes share the same id.
    #[error("query id {id} appears more than once in the plan")]
    DuplicateQueryId {
        /// The repeated id.
        id: QueryId,
    },

    /// A node depends on an id that is not in the plan.
    #[error("query {query_id} depends on unknown query {dependency}")]
    UnknownDependency {
        /// The node declaring the dependency.
        query_id: QueryId,
        /// The missing dependency id.
        dependency: QueryId,
    },

    /// `insert_at_root` was asked to reject an already-rooted question.
    #[error("query '{question}' is already the root of the plan")]
    QuestionAlreadyAtRoot {
        /// The question that was being inserted.
        question: String,
    },

    /// The evidence retriever failed.
    #[error("evidence retrieval failed: {message}")]
    Retrieval {
        /// Backend error message.
        message: String,
    },

    /// Configuration is inconsistent or incomplete.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Anything else that goes wrong while coordinating a run.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Description of the failure.
        message: String,
    },
}

/// Renders a residual dependency map as `{id:{deps}, ...}`.
fn format_residual(residual: &BTreeMap<QueryId, BTreeSet<QueryId>>) -> String {
    let mut out = String::from("{");
    for (i, (id, deps)) in residual.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let deps: Vec<String> = deps.iter().map(ToString::to_string).collect();
        let _ = write!(out, "{id}:{{{}}}", deps.join(", "));
    }
    out.push('}');
    out
}

/// Errors raised while executing a CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A command-line argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The command failed while running.
    #[error("command failed: {0}")]
    ExecutionFailed(String),
}

/// Top-level error for the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_message_lists_residual() {
        let mut residual = BTreeMap::new();
        residual.insert(1, BTreeSet::from([2]));
        residual.insert(2, BTreeSet::from([1]));
        let err = AgentError::CircularDependency { residual };
        assert_eq!(
            err.to_string(),
            "circular dependencies exist among these queries: {1:{2}, 2:{1}}"
        );
    }

    #[test]
    fn test_ambiguous_root_message() {
        let err = AgentError::AmbiguousRoot {
            candidates: vec![3, 4],
        };
        assert!(err.to_string().contains("[3, 4]"));
    }

    #[test]
    fn test_agent_error_converts_to_crate_error() {
        let err: Error = AgentError::ApiKeyMissing.into();
        assert!(matches!(err, Error::Agent(AgentError::ApiKeyMissing)));
    }
}
