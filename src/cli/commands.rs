//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::parameters::SearchParameters;
use crate::agent::plan::QueryPlan;
use crate::agent::prompt::PromptSet;
use crate::agent::result::{Context, Feature};
use crate::agent::schema::FunctionSchema;
use crate::agent::search_agent::SearchAgent;
use crate::cli::output::{OutputFormat, PlanOrder, format_agent_result, format_plan_order};
use crate::cli::parser::{Cli, Commands, PlanCommands};
use crate::core::corpus::CorpusRetriever;
use crate::core::evidence::SearchMode;
use crate::error::{CommandError, Result};

/// Parameters for the ask command.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// The question.
    pub query: &'a str,
    /// Corpus file.
    pub corpus: &'a Path,
    /// Enable query planning.
    pub plan: bool,
    /// Enable automatic search parameters.
    pub auto_params: bool,
    /// Enable backend re-ranking.
    pub rerank: bool,
    /// Enable the excerpt pass.
    pub excerpt: bool,
    /// Static `top_k`.
    pub top_k: Option<u32>,
    /// Static search mode.
    pub mode: Option<&'a str>,
    /// Static hybrid weight.
    pub alpha: Option<f64>,
    /// Reasoning model override.
    pub reasoning_model: Option<&'a str>,
    /// QA model override.
    pub qa_model: Option<&'a str>,
    /// Fallback model override.
    pub fallback_model: Option<&'a str>,
    /// Raw `key=value` filters.
    pub filters: &'a [String],
    /// User profile file.
    pub profile: Option<&'a Path>,
    /// Asking user.
    pub user_id: Option<&'a str>,
    /// Retrieval worker count.
    pub workers: Option<usize>,
    /// Prompt template directory.
    pub prompt_dir: Option<&'a Path>,
    /// Print per-node details.
    pub verbose: bool,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            query,
            corpus,
            plan,
            auto_params,
            rerank,
            excerpt,
            top_k,
            mode,
            alpha,
            reasoning_model,
            qa_model,
            fallback_model,
            filters,
            profile,
            user_id,
            workers,
            prompt_dir,
        } => {
            let params = AskParams {
                query,
                corpus,
                plan: *plan,
                auto_params: *auto_params,
                rerank: *rerank,
                excerpt: *excerpt,
                top_k: *top_k,
                mode: mode.as_deref(),
                alpha: *alpha,
                reasoning_model: reasoning_model.as_deref(),
                qa_model: qa_model.as_deref(),
                fallback_model: fallback_model.as_deref(),
                filters,
                profile: profile.as_deref(),
                user_id: user_id.as_deref(),
                workers: *workers,
                prompt_dir: prompt_dir.as_deref(),
                verbose: cli.verbose,
            };
            cmd_ask(&params, format)
        }
        Commands::Plan(PlanCommands::Order { file }) => cmd_plan_order(file, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Splits a `key=value` filter.
fn parse_filter(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CommandError::InvalidArgument(format!(
            "filter must look like key=value, got '{raw}'"
        ))
        .into()),
    }
}

/// Static search parameters from the command line, on top of the defaults.
fn static_search(params: &AskParams<'_>) -> Result<SearchParameters> {
    let mut search = SearchParameters::default();
    if let Some(k) = params.top_k {
        search.top_k = k;
    }
    if let Some(mode) = params.mode {
        search.mode = mode.parse::<SearchMode>()?;
    }
    if let Some(alpha) = params.alpha {
        search.alpha = alpha;
    }
    search
        .validate()
        .map_err(|e| CommandError::InvalidArgument(format!("search parameters: {e}")))?;
    Ok(search)
}

fn build_config(params: &AskParams<'_>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder()
        .from_env()
        .default_search(static_search(params)?);

    for (enabled, feature) in [
        (params.plan, Feature::QueryPlanning),
        (params.auto_params, Feature::AutoSearchParameters),
        (params.rerank, Feature::CrossEncoderReRanking),
        (params.excerpt, Feature::AnswerExcerpt),
    ] {
        if enabled {
            builder = builder.feature(feature);
        }
    }
    if let Some(model) = params.reasoning_model {
        builder = builder.reasoning_model(model);
    }
    if let Some(model) = params.qa_model {
        builder = builder.qa_model(model);
    }
    if let Some(model) = params.fallback_model {
        builder = builder.fallback_qa_model(model);
    }
    if let Some(n) = params.workers {
        builder = builder.retrieval_workers(n);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn build_context(params: &AskParams<'_>) -> Result<Context> {
    let mut context = Context {
        user_id: params.user_id.map(String::from),
        ..Context::default()
    };
    for raw in params.filters {
        let (key, value) = parse_filter(raw)?;
        context.filters.insert(key, value);
    }
    if let Some(path) = params.profile {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CommandError::InvalidArgument(format!("cannot read profile {}: {e}", path.display()))
        })?;
        context.profile = Some(serde_json::from_str(&raw)?);
    }
    Ok(context)
}

fn cmd_ask(params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let config = build_config(params)?;
    let context = build_context(params)?;

    let retriever = CorpusRetriever::from_path(params.corpus)?;
    debug!(documents = retriever.len(), corpus = %params.corpus.display(), "corpus loaded");

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let agent = SearchAgent::new(provider, Arc::new(retriever), config)?;

    // Sync/async bridge for the blocking CLI.
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;
    let result = rt
        .block_on(agent.run(params.query, &context))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;

    Ok(format_agent_result(&result, params.verbose, format))
}

fn cmd_plan_order(file: &Path, format: OutputFormat) -> Result<String> {
    let raw = std::fs::read_to_string(file).map_err(|e| {
        CommandError::InvalidArgument(format!("cannot read plan {}: {e}", file.display()))
    })?;
    let plan: QueryPlan = serde_json::from_str(&raw)?;
    plan.validate()?;

    let order = PlanOrder {
        root: plan.get_root_query_id()?,
        waves: plan.execution_waves()?,
        order: plan.get_execution_order()?,
    };
    Ok(format_plan_order(&order, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, Error};
    use tempfile::TempDir;

    fn ask(query: &str) -> AskParams<'_> {
        AskParams {
            query,
            corpus: Path::new("corpus.json"),
            plan: false,
            auto_params: false,
            rerank: false,
            excerpt: false,
            top_k: None,
            mode: None,
            alpha: None,
            reasoning_model: None,
            qa_model: None,
            fallback_model: None,
            filters: &[],
            profile: None,
            user_id: None,
            workers: None,
            prompt_dir: None,
            verbose: false,
        }
    }

    fn write_plan(dir: &TempDir, json: &str) -> std::path::PathBuf {
        let path = dir.path().join("plan.json");
        std::fs::write(&path, json).unwrap_or_else(|_| unreachable!());
        path
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("campus = north").ok(),
            Some(("campus".to_string(), "north".to_string()))
        );
        assert_eq!(
            parse_filter("tag=a=b").ok(),
            Some(("tag".to_string(), "a=b".to_string()))
        );
        assert!(parse_filter("campus").is_err());
        assert!(parse_filter("=north").is_err());
    }

    #[test]
    fn test_static_search_overrides() {
        let params = AskParams {
            top_k: Some(7),
            mode: Some("bm25"),
            ..ask("q")
        };
        let search = static_search(&params).unwrap_or_default();
        assert_eq!(search.top_k, 7);
        assert_eq!(search.mode, SearchMode::Keyword);
        assert!((search.alpha - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_static_search_rejects_bad_alpha() {
        let params = AskParams {
            alpha: Some(1.5),
            ..ask("q")
        };
        assert!(matches!(
            static_search(&params),
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_plan_order_text() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = write_plan(
            &dir,
            r#"{"query_graph": [
                {"id": 3, "question": "Capital and population of France?", "sub_queries": [1, 2]},
                {"id": 1, "question": "capital of France?", "sub_queries": []},
                {"id": 2, "question": "population of Paris?", "sub_queries": []}
            ]}"#,
        );
        let output = cmd_plan_order(&path, OutputFormat::Text).unwrap_or_default();
        assert_eq!(output, "Root: 3\nWave 1: 1, 2\nWave 2: 3\nOrder: 1, 2, 3\n");
    }

    #[test]
    fn test_plan_order_cycle() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = write_plan(
            &dir,
            r#"{"query_graph": [
                {"id": 1, "question": "A", "sub_queries": [2]},
                {"id": 2, "question": "B", "sub_queries": [1]},
                {"id": 3, "question": "root", "sub_queries": [1]}
            ]}"#,
        );
        assert!(matches!(
            cmd_plan_order(&path, OutputFormat::Text),
            Err(Error::Agent(AgentError::CircularDependency { .. }))
        ));
    }

    #[test]
    fn test_plan_order_invalid_json() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = write_plan(&dir, "{not json");
        assert!(matches!(
            cmd_plan_order(&path, OutputFormat::Text),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_init_prompts_writes_once() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let target = dir.path().join("prompts");

        let first = cmd_init_prompts(Some(&target), OutputFormat::Text).unwrap_or_default();
        assert!(first.contains("Wrote 4 prompt template(s)"));
        assert!(target.join("role.md").exists());

        let second = cmd_init_prompts(Some(&target), OutputFormat::Json).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&second).unwrap_or_default();
        assert_eq!(value["count"], 0);
    }

    #[test]
    fn test_build_context_reads_profile_and_filters() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let profile = dir.path().join("me.json");
        std::fs::write(&profile, r#"{"name": "Sam"}"#).unwrap_or_else(|_| unreachable!());
        let filters = vec!["campus=north".to_string()];
        let params = AskParams {
            filters: &filters,
            profile: Some(&profile),
            user_id: Some("u-1"),
            ..ask("q")
        };

        let context = build_context(&params).unwrap_or_default();
        assert_eq!(context.user_id.as_deref(), Some("u-1"));
        assert_eq!(context.filters.get("campus").map(String::as_str), Some("north"));
        assert_eq!(context.profile, Some(serde_json::json!({"name": "Sam"})));
    }
}
