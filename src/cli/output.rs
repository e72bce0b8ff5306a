//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::plan::QueryId;
use crate::agent::result::AgentResult;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, falling back to text for anything unknown.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value).map_or_else(
            |e| format!("{{\"error\": \"serialization failed: {e}\"}}\n"),
            |json| json + "\n",
        )
    }
}

/// Validated plan ordering.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOrder {
    /// Root query id.
    pub root: QueryId,
    /// Ids per wave.
    pub waves: Vec<Vec<QueryId>>,
    /// Flattened execution order.
    pub order: Vec<QueryId>,
}

fn join_ids(ids: &[QueryId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Formats a plan ordering.
#[must_use]
pub fn format_plan_order(plan: &PlanOrder, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(plan),
        OutputFormat::Text => {
            let mut out = format!("Root: {}\n", plan.root);
            for (i, wave) in plan.waves.iter().enumerate() {
                let _ = writeln!(out, "Wave {}: {}", i + 1, join_ids(wave));
            }
            let _ = writeln!(out, "Order: {}", join_ids(&plan.order));
            out
        }
    }
}

/// Formats a run result.
///
/// Text output is the answer, the excerpt and sources, then a one-line
/// summary. `verbose` adds a line per plan node.
#[must_use]
pub fn format_agent_result(result: &AgentResult, verbose: bool, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format.to_json(result);
    }

    let mut out = result.answer.answer.trim_end().to_string();
    out.push('\n');
    if let Some(excerpt) = &result.answer.excerpt {
        let _ = write!(out, "\n> {excerpt}\n");
    }

    if !result.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in result.sources.iter().enumerate() {
            let _ = writeln!(
                out,
                "  [{}] {} (score {:.3})",
                i + 1,
                source.evidence.identity,
                source.rank_score
            );
        }
    }

    if verbose {
        out.push_str("\nPlan:\n");
        for (id, node) in &result.query_plan_results {
            let deps = if node.query.sub_queries.is_empty() {
                String::new()
            } else {
                format!(" <- [{}]", join_ids(&node.query.sub_queries))
            };
            let _ = writeln!(
                out,
                "  #{id}{deps} {} [{}, {}, k={}]",
                node.query.question,
                node.model,
                node.budget.as_str(),
                node.search_parameters.top_k,
            );
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let secs = result.elapsed_ms as f64 / 1000.0;
    let _ = write!(
        out,
        "\n---\nNodes: {} | Sources: {} | Model calls: {} | Tokens: {} | Cost: ${:.4} | Time: {secs:.1}s\n",
        result.query_plan.len(),
        result.sources.len(),
        result.model_calls,
        result.total_tokens_used,
        result.total_tokens_cost,
    );
    out
}
