//! Wave-by-wave execution of a query plan.
//!
//! Each iteration collects every node whose dependencies all have results,
//! runs them concurrently, and waits for the whole wave before computing
//! the next one. The first node error aborts the plan; the remaining
//! futures of that wave are dropped and nothing partial is returned.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, info};

use super::plan::{Query, QueryId, QueryPlan};
use super::result::QueryResult;
use crate::error::AgentError;

/// Answers a single plan node.
#[async_trait]
pub trait NodeRunner: Send + Sync {
    /// Runs `query` given the results of exactly its declared dependencies,
    /// in the order they are listed in `sub_queries`.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole plan.
    async fn run_node(
        &self,
        query: &Query,
        dependencies: &[&QueryResult],
    ) -> Result<QueryResult, AgentError>;
}

/// Executes plans with a [`NodeRunner`].
pub struct QueryPlanExecutor<'a> {
    runner: &'a dyn NodeRunner,
}

impl<'a> QueryPlanExecutor<'a> {
    /// Creates an executor.
    #[must_use]
    pub fn new(runner: &'a dyn NodeRunner) -> Self {
        Self { runner }
    }

    /// Runs every node of `plan` and returns the results by id.
    ///
    /// # Errors
    ///
    /// Returns the plan's validation error before running anything, or the
    /// first node error.
    pub async fn execute(
        &self,
        plan: &QueryPlan,
    ) -> Result<BTreeMap<QueryId, QueryResult>, AgentError> {
        plan.validate()?;
        let order = plan.get_execution_order()?;

        let mut results: BTreeMap<QueryId, QueryResult> = BTreeMap::new();
        let mut wave = 0_usize;

        while results.len() < plan.len() {
            let ready: Vec<&Query> = order
                .iter()
                .filter_map(|id| plan.get(*id))
                .filter(|q| {
                    !results.contains_key(&q.id)
                        && q.sub_queries.iter().all(|d| results.contains_key(d))
                })
                .collect();

            if ready.is_empty() {
                return Err(AgentError::Orchestration {
                    message: format!(
                        "no runnable query while {} of {} remain",
                        plan.len() - results.len(),
                        plan.len()
                    ),
                });
            }

            wave += 1;
            let ids: Vec<QueryId> = ready.iter().map(|q| q.id).collect();
            info!(wave, queries = ?ids, "executing wave");

            let finished = {
                let results = &results;
                try_join_all(ready.iter().map(|query| async move {
                    let dependencies: Vec<&QueryResult> = query
                        .sub_queries
                        .iter()
                        .filter_map(|d| results.get(d))
                        .collect();
                    debug!(query_id = query.id, question = %query.question, "node started");
                    self.runner.run_node(query, &dependencies).await
                }))
                .await?
            };

            for (id, result) in ids.into_iter().zip(finished) {
                results.insert(id, result);
            }
        }

        Ok(results)
    }
}
