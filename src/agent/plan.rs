//! Query plans: a DAG of sub-questions.
//!
//! A [`QueryPlan`] is a flat list of [`Query`] nodes, each naming the ids it
//! depends on. The node nobody depends on is the root; its answer is the
//! answer to the user's question. Ordering is Kahn's algorithm emitting
//! waves of nodes whose dependencies are all satisfied, each wave sorted by
//! id so the order is deterministic.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use super::schema::FunctionSchema;
use crate::error::AgentError;

/// Identifier of a node within one plan.
pub type QueryId = u32;

/// One question in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Unique id within the plan.
    pub id: QueryId,
    /// Question to answer.
    pub question: String,
    /// Ids that must be answered before this one. Duplicates are dropped.
    #[serde(default, deserialize_with = "dedup_ids")]
    pub sub_queries: Vec<QueryId>,
}

impl Query {
    /// Creates a node, dropping repeated dependency ids.
    #[must_use]
    pub fn new(id: QueryId, question: impl Into<String>, sub_queries: Vec<QueryId>) -> Self {
        Self {
            id,
            question: question.into(),
            sub_queries: dedup(sub_queries),
        }
    }
}

fn dedup(ids: Vec<QueryId>) -> Vec<QueryId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn dedup_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<QueryId>, D::Error> {
    Vec::<QueryId>::deserialize(deserializer).map(dedup)
}

/// What [`QueryPlan::insert_at_root`] does when the question is already the root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingRootPolicy {
    /// Leave the plan unchanged.
    #[default]
    Skip,
    /// Fail with [`AgentError::QuestionAlreadyAtRoot`].
    Reject,
}

/// A DAG of questions answered bottom-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// All nodes, in no particular order.
    pub query_graph: Vec<Query>,
}

impl QueryPlan {
    /// Plan with one node (id 1) and no dependencies.
    #[must_use]
    pub fn single(question: impl Into<String>) -> Self {
        Self {
            query_graph: vec![Query::new(1, question, Vec::new())],
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.query_graph.len()
    }

    /// Returns `true` if the plan has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query_graph.is_empty()
    }

    /// Node with the given id.
    #[must_use]
    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.query_graph.iter().find(|q| q.id == id)
    }

    /// Id to dependency set.
    #[must_use]
    pub fn dependency_map(&self) -> BTreeMap<QueryId, BTreeSet<QueryId>> {
        self.query_graph
            .iter()
            .map(|q| (q.id, q.sub_queries.iter().copied().collect()))
            .collect()
    }

    /// Ids that no node lists as a dependency, ascending.
    #[must_use]
    pub fn root_candidates(&self) -> Vec<QueryId> {
        let referenced: HashSet<QueryId> = self
            .query_graph
            .iter()
            .flat_map(|q| q.sub_queries.iter().copied())
            .collect();
        let candidates: BTreeSet<QueryId> = self
            .query_graph
            .iter()
            .map(|q| q.id)
            .filter(|id| !referenced.contains(id))
            .collect();
        candidates.into_iter().collect()
    }

    /// Id of the unique root.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AmbiguousRoot`] unless exactly one candidate
    /// exists.
    pub fn get_root_query_id(&self) -> Result<QueryId, AgentError> {
        match self.root_candidates().as_slice() {
            [root] => Ok(*root),
            candidates => Err(AgentError::AmbiguousRoot {
                candidates: candidates.to_vec(),
            }),
        }
    }

    /// Makes `question` the root of the plan.
    ///
    /// A new node with id `max + 1` is appended, depending on every current
    /// top-level node. Nothing is inserted when the current unique root
    /// already asks the same question, compared case-insensitively and
    /// ignoring trailing `?`. Returns the root id.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::QuestionAlreadyAtRoot`] when the question is
    /// already the root and `policy` is [`ExistingRootPolicy::Reject`], and
    /// [`AgentError::SchemaBinding`] when the plan already uses `u32::MAX`.
    pub fn insert_at_root(
        &mut self,
        question: &str,
        policy: ExistingRootPolicy,
    ) -> Result<QueryId, AgentError> {
        let candidates = self.root_candidates();
        let wanted = normalize_question(question);

        if let [root] = candidates.as_slice()
            && self
                .get(*root)
                .is_some_and(|q| normalize_question(&q.question) == wanted)
        {
            return match policy {
                ExistingRootPolicy::Skip => Ok(*root),
                ExistingRootPolicy::Reject => Err(AgentError::QuestionAlreadyAtRoot {
                    question: question.to_string(),
                }),
            };
        }

        let max_id = self.query_graph.iter().map(|q| q.id).max().unwrap_or(0);
        let id = max_id.checked_add(1).ok_or_else(|| AgentError::SchemaBinding {
            schema: Self::NAME,
            message: format!("no id left above {max_id} for the root question"),
        })?;
        self.query_graph.push(Query::new(id, question, candidates));
        Ok(id)
    }

    /// Nodes grouped into waves; each wave depends only on earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownDependency`] for a dependency on an id
    /// outside the plan and [`AgentError::CircularDependency`] when some
    /// nodes can never become ready.
    pub fn execution_waves(&self) -> Result<Vec<Vec<QueryId>>, AgentError> {
        let mut pending = self.dependency_map();

        for (id, deps) in &pending {
            if let Some(missing) = deps.iter().find(|d| !pending.contains_key(d)) {
                return Err(AgentError::UnknownDependency {
                    query_id: *id,
                    dependency: *missing,
                });
            }
        }

        let mut waves = Vec::new();
        while !pending.is_empty() {
            let ready: BTreeSet<QueryId> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(id, _)| *id)
                .collect();
            if ready.is_empty() {
                return Err(AgentError::CircularDependency { residual: pending });
            }
            pending.retain(|id, _| !ready.contains(id));
            for deps in pending.values_mut() {
                deps.retain(|d| !ready.contains(d));
            }
            waves.push(ready.into_iter().collect());
        }
        Ok(waves)
    }

    /// Flattened [`QueryPlan::execution_waves`].
    ///
    /// # Errors
    ///
    /// Same as [`QueryPlan::execution_waves`].
    pub fn get_execution_order(&self) -> Result<Vec<QueryId>, AgentError> {
        Ok(self.execution_waves()?.into_iter().flatten().collect())
    }

    /// Checks everything execution relies on.
    ///
    /// Runs, in order: duplicate ids, dangling dependencies, a unique root,
    /// and an acyclic ordering.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.query_graph.iter().find(|q| !seen.insert(q.id)) {
            return Err(AgentError::DuplicateQueryId { id: dup.id });
        }
        for q in &self.query_graph {
            if let Some(missing) = q.sub_queries.iter().find(|d| !seen.contains(*d)) {
                return Err(AgentError::UnknownDependency {
                    query_id: q.id,
                    dependency: *missing,
                });
            }
        }
        self.get_root_query_id()?;
        self.execution_waves()?;
        Ok(())
    }
}

/// Lowercased, trimmed, without trailing question marks.
fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase().trim_end_matches('?').trim_end().to_string()
}

impl FunctionSchema for QueryPlan {
    const NAME: &'static str = "QueryPlan";
    const DESCRIPTION: &'static str = "Container class representing a tree of queries and \
        sub-queries. Make sure every query is in the tree and every query is done only once.";

    fn parameters() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query_graph": {
                    "type": "array",
                    "description": "List of the queries and sub-queries that need to be done to \
                        complete the main query. Consists of the main query and its dependencies.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "description": "Unique id of the query."
                            },
                            "question": {
                                "type": "string",
                                "description": "Question we are asking using a question answer \
                                    system. If there are multiple queries, this query can only be \
                                    executed when all dependant sub-queries have been answered."
                            },
                            "sub_queries": {
                                "type": "array",
                                "items": {"type": "integer"},
                                "description": "List of the IDs of sub-queries that need to be \
                                    answered before we can answer this question. Use a sub-query \
                                    when anything may be unknown and we need to ask multiple \
                                    questions to get the answer. Dependencies must only be other \
                                    queries."
                            }
                        },
                        "required": ["id", "question"]
                    }
                }
            },
            "required": ["query_graph"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.query_graph.is_empty() {
            return Err("query_graph is empty".to_string());
        }
        match self.query_graph.iter().find(|q| q.question.trim().is_empty()) {
            Some(q) => Err(format!("query {} has an empty question", q.id)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn france() -> QueryPlan {
        QueryPlan {
            query_graph: vec![
                Query::new(1, "What is the capital of France?", vec![]),
                Query::new(2, "What is the population of Paris?", vec![]),
                Query::new(3, "Capital and population of France?", vec![1, 2]),
            ],
        }
    }

    #[test]
    fn test_single() {
        let plan = QueryPlan::single("Who teaches CS101?");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get_root_query_id().ok(), Some(1));
        assert_eq!(plan.get_execution_order().unwrap_or_default(), vec![1]);
    }

    #[test]
    fn test_execution_order_places_dependencies_first() {
        let plan = france();
        assert_eq!(plan.get_execution_order().unwrap_or_default(), vec![1, 2, 3]);
        assert_eq!(
            plan.execution_waves().unwrap_or_default(),
            vec![vec![1, 2], vec![3]]
        );
    }

    #[test]
    fn test_waves_sorted_by_id() {
        let plan = QueryPlan {
            query_graph: vec![
                Query::new(9, "root", vec![7, 3]),
                Query::new(7, "b", vec![5]),
                Query::new(3, "a", vec![]),
                Query::new(5, "c", vec![]),
            ],
        };
        assert_eq!(
            plan.execution_waves().unwrap_or_default(),
            vec![vec![3, 5], vec![7], vec![9]]
        );
    }

    #[test]
    fn test_two_node_cycle() {
        let plan = QueryPlan {
            query_graph: vec![Query::new(1, "A", vec![2]), Query::new(2, "B", vec![1])],
        };
        let err = plan.get_execution_order().err();
        match err {
            Some(AgentError::CircularDependency { residual }) => {
                assert_eq!(residual.len(), 2);
                assert_eq!(residual[&1], BTreeSet::from([2]));
            }
            other => unreachable!("expected circular dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_residual_excludes_resolved_nodes() {
        let plan = QueryPlan {
            query_graph: vec![
                Query::new(1, "leaf", vec![]),
                Query::new(2, "A", vec![1, 3]),
                Query::new(3, "B", vec![2]),
            ],
        };
        let msg = plan.get_execution_order().err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(msg, "circular dependencies exist among these queries: {2:{3}, 3:{2}}");
    }

    #[test]
    fn test_unknown_dependency() {
        let plan = QueryPlan {
            query_graph: vec![Query::new(1, "A", vec![42])],
        };
        assert!(matches!(
            plan.get_execution_order(),
            Err(AgentError::UnknownDependency {
                query_id: 1,
                dependency: 42
            })
        ));
    }

    #[test]
    fn test_root_ambiguous() {
        let plan = QueryPlan {
            query_graph: vec![Query::new(1, "A", vec![]), Query::new(2, "B", vec![])],
        };
        assert!(matches!(
            plan.get_root_query_id(),
            Err(AgentError::AmbiguousRoot { ref candidates }) if candidates == &vec![1, 2]
        ));
    }

    #[test]
    fn test_root_zero_candidates() {
        let plan = QueryPlan {
            query_graph: vec![Query::new(1, "A", vec![2]), Query::new(2, "B", vec![1])],
        };
        assert!(matches!(
            plan.get_root_query_id(),
            Err(AgentError::AmbiguousRoot { ref candidates }) if candidates.is_empty()
        ));
    }

    #[test]
    fn test_insert_at_root_adds_node_over_top_level() {
        let mut plan = QueryPlan {
            query_graph: vec![
                Query::new(1, "What is the capital of France?", vec![]),
                Query::new(2, "What is the population of Paris?", vec![]),
            ],
        };
        let root = plan
            .insert_at_root("Capital and population of France?", ExistingRootPolicy::Skip)
            .unwrap_or_default();
        assert_eq!(root, 3);
        assert_eq!(plan.get(3).map(|q| q.sub_queries.clone()), Some(vec![1, 2]));
        assert_eq!(plan.get_root_query_id().ok(), Some(3));
    }

    #[test]
    fn test_insert_at_root_idempotent() {
        let mut plan = france();
        let root = plan
            .insert_at_root("capital and population of france", ExistingRootPolicy::Skip)
            .unwrap_or_default();
        assert_eq!(root, 3);
        assert_eq!(plan, france());

        let again = plan
            .insert_at_root("Capital and population of France?", ExistingRootPolicy::Skip)
            .unwrap_or_default();
        assert_eq!(again, 3);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_insert_at_root_fails_when_ids_exhausted() {
        let mut plan = QueryPlan {
            query_graph: vec![Query::new(u32::MAX, "sub?", vec![])],
        };
        let result = plan.insert_at_root("Top?", ExistingRootPolicy::Skip);
        assert!(matches!(
            result,
            Err(AgentError::SchemaBinding { schema: "QueryPlan", .. })
        ));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_insert_at_root_reject_policy() {
        let mut plan = france();
        let result = plan.insert_at_root("Capital and population of France??", ExistingRootPolicy::Reject);
        assert!(matches!(result, Err(AgentError::QuestionAlreadyAtRoot { .. })));
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_insert_at_root_matching_non_root_still_inserts() {
        let mut plan = france();
        let root = plan
            .insert_at_root("What is the capital of France", ExistingRootPolicy::Reject)
            .unwrap_or_default();
        assert_eq!(root, 4);
        assert_eq!(plan.get(4).map(|q| q.sub_queries.clone()), Some(vec![3]));
    }

    #[test]
    fn test_insert_at_root_repairs_forest() {
        let mut plan = QueryPlan {
            query_graph: vec![
                Query::new(2, "Who founded the college?", vec![]),
                Query::new(5, "When was it founded?", vec![]),
            ],
        };
        plan.insert_at_root("History of the college", ExistingRootPolicy::Skip)
            .unwrap_or_default();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.get_root_query_id().ok(), Some(6));
    }

    #[test]
    fn test_validate_duplicate_id() {
        let plan = QueryPlan {
            query_graph: vec![Query::new(1, "A", vec![]), Query::new(1, "B", vec![])],
        };
        assert!(matches!(
            plan.validate(),
            Err(AgentError::DuplicateQueryId { id: 1 })
        ));
    }

    #[test]
    fn test_validate_ok() {
        assert!(france().validate().is_ok());
    }

    #[test]
    fn test_sub_queries_deduplicated_on_deserialize() {
        let json = r#"{"query_graph": [
            {"id": 1, "question": "a"},
            {"id": 2, "question": "b", "sub_queries": [1, 1]}
        ]}"#;
        let plan: QueryPlan = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(plan.get(2).map(|q| q.sub_queries.clone()), Some(vec![1]));
        assert!(plan.get(1).is_some_and(|q| q.sub_queries.is_empty()));
    }

    #[test]
    fn test_schema_binding_rejects_empty_graph() {
        let result = QueryPlan::from_arguments(r#"{"query_graph": []}"#);
        assert!(matches!(
            result,
            Err(AgentError::SchemaBinding {
                schema: "QueryPlan",
                ..
            })
        ));
    }

    #[test]
    fn test_schema_binding_missing_graph() {
        assert!(QueryPlan::from_arguments(r#"{"queries": []}"#).is_err());
    }

    #[test]
    fn test_normalize_question() {
        assert_eq!(normalize_question("  Where Is It?? "), "where is it");
        assert_eq!(normalize_question("where is it"), "where is it");
    }
}
