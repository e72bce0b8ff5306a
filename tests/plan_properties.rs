//! Property tests for plan ordering, rooting and re-ranking.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use search_agent::agent::plan::{ExistingRootPolicy, Query, QueryId, QueryPlan};
use search_agent::core::{Evidence, ReRanker};
use search_agent::error::AgentError;

/// Acyclic plans: node `i` (id `i + 1`) may only depend on lower ids.
fn acyclic_plan() -> impl Strategy<Value = QueryPlan> {
    prop::collection::vec(prop::collection::vec(any::<u32>(), 0..4), 1..12).prop_map(|raw| {
        let query_graph = raw
            .iter()
            .enumerate()
            .map(|(i, picks)| {
                let id = u32::try_from(i).unwrap_or(0) + 1;
                let deps = if id == 1 {
                    Vec::new()
                } else {
                    picks.iter().map(|p| p % (id - 1) + 1).collect()
                };
                Query::new(id, format!("question {id}?"), deps)
            })
            .collect();
        QueryPlan { query_graph }
    })
}

fn referenced(plan: &QueryPlan) -> BTreeSet<QueryId> {
    plan.query_graph
        .iter()
        .flat_map(|q| q.sub_queries.iter().copied())
        .collect()
}

proptest! {
    #[test]
    fn prop_order_is_dependency_respecting_permutation(plan in acyclic_plan()) {
        let order = plan.get_execution_order().unwrap_or_default();
        prop_assert_eq!(order.len(), plan.len());

        let position: HashMap<QueryId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        prop_assert_eq!(position.len(), plan.len());
        for q in &plan.query_graph {
            for dep in &q.sub_queries {
                prop_assert!(position[dep] < position[&q.id]);
            }
        }
    }

    #[test]
    fn prop_waves_are_sorted_and_only_depend_on_earlier_waves(plan in acyclic_plan()) {
        let waves = plan.execution_waves().unwrap_or_default();
        let mut done = BTreeSet::new();
        for wave in &waves {
            prop_assert!(wave.windows(2).all(|w| w[0] < w[1]));
            for id in wave {
                let node = plan.get(*id);
                prop_assert!(node.is_some());
                if let Some(node) = node {
                    prop_assert!(node.sub_queries.iter().all(|d| done.contains(d)));
                }
            }
            done.extend(wave.iter().copied());
        }
    }

    #[test]
    fn prop_root_lookup_fails_iff_not_exactly_one_candidate(plan in acyclic_plan()) {
        let refs = referenced(&plan);
        let candidates = plan.query_graph.iter().filter(|q| !refs.contains(&q.id)).count();
        let root = plan.get_root_query_id();
        if candidates == 1 {
            prop_assert!(root.is_ok());
        } else {
            let is_ambiguous = matches!(root, Err(AgentError::AmbiguousRoot { .. }));
            prop_assert!(is_ambiguous);
        }
    }

    #[test]
    fn prop_insert_at_root_gives_unique_root_and_is_idempotent(plan in acyclic_plan()) {
        let mut rooted = plan.clone();
        let root = rooted
            .insert_at_root("What is the overall answer?", ExistingRootPolicy::Skip)
            .unwrap_or(0);
        prop_assert_eq!(rooted.get_root_query_id().ok(), Some(root));
        prop_assert!(rooted.validate().is_ok());

        let mut again = rooted.clone();
        let second = again
            .insert_at_root("  what is the overall answer ", ExistingRootPolicy::Skip)
            .unwrap_or(0);
        prop_assert_eq!(second, root);
        prop_assert_eq!(again, rooted);
    }

    #[test]
    fn prop_rerank_bounded_sorted_and_truncated(
        scores in prop::collection::vec(-10.0_f64..10.0, 0..30),
        top_k in 1_usize..15,
    ) {
        let candidates: Vec<Evidence> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| Evidence::new(format!("text {i}"), format!("doc-{i}"), *s))
            .collect();
        let ranked = ReRanker::default().rerank(candidates, top_k);

        prop_assert_eq!(ranked.len(), top_k.min(scores.len()));
        prop_assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.rank_score)));
        prop_assert!(ranked.windows(2).all(|w| w[0].rank_score >= w[1].rank_score));
    }
}

#[test]
fn test_two_node_cycle_is_reported() {
    let plan = QueryPlan {
        query_graph: vec![Query::new(1, "A", vec![2]), Query::new(2, "B", vec![1])],
    };
    let err = plan.get_execution_order().err();
    assert!(matches!(err, Some(AgentError::CircularDependency { .. })));
    assert_eq!(
        err.map(|e| e.to_string()).unwrap_or_default(),
        "circular dependencies exist among these queries: {1:{2}, 2:{1}}"
    );
}

#[test]
fn test_france_plan_answers_subquestions_first() {
    let plan = QueryPlan {
        query_graph: vec![
            Query::new(3, "Capital and population of France?", vec![1, 2]),
            Query::new(1, "capital of France?", vec![]),
            Query::new(2, "population of Paris?", vec![]),
        ],
    };
    assert_eq!(plan.get_root_query_id().ok(), Some(3));
    assert_eq!(plan.get_execution_order().unwrap_or_default(), vec![1, 2, 3]);
}
