//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::parameters::MAX_TOP_K;

/// search-agent: answer questions by planning sub-questions over a corpus.
///
/// Decomposes a question into dependent sub-questions, answers them in
/// concurrent waves with retrieved evidence, and prints the root answer.
#[derive(Parser, Debug)]
#[command(name = "search-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging, per-node details).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Log filter directive, e.g. `info` or `search_agent=debug`.
    #[arg(long, global = true, env = "SEARCH_AGENT_LOG")]
    pub log_level: Option<String>,

    /// Disable colored log output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from a JSON corpus.
    ///
    /// Requires an API key in `OPENAI_API_KEY` or `SEARCH_AGENT_API_KEY`.
    #[command(after_help = r#"Examples:
  search-agent ask "Who teaches CS101?" --corpus docs.json
  search-agent ask "Capital and population of France?" --corpus wiki.json --plan
  search-agent ask "Library hours?" --corpus docs.json --auto-params --rerank --excerpt
  search-agent ask "Where is my dorm?" --corpus docs.json --profile me.json --filter campus=north
  search-agent --format json ask "..." --corpus docs.json | jq '.query_plan'
"#)]
    Ask {
        /// The question to answer.
        query: String,

        /// JSON file with an array of `{text, identity, metadata?}` documents.
        #[arg(short, long)]
        corpus: PathBuf,

        /// Decompose the question into a plan of sub-questions.
        #[arg(long)]
        plan: bool,

        /// Let the reasoning model pick retrieval parameters per node.
        #[arg(long)]
        auto_params: bool,

        /// Widen retrieval and request backend re-ranking.
        #[arg(long)]
        rerank: bool,

        /// Extract a supporting excerpt for the final answer.
        #[arg(long)]
        excerpt: bool,

        /// Results per node when automatic parameters are off.
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TOP_K)))]
        top_k: Option<u32>,

        /// Search mode when automatic parameters are off: hybrid, semantic, keyword.
        #[arg(short, long)]
        mode: Option<String>,

        /// Hybrid weight when automatic parameters are off (0.0-1.0).
        #[arg(long)]
        alpha: Option<f64>,

        /// Model for planning and parameter selection.
        #[arg(long)]
        reasoning_model: Option<String>,

        /// Model answering each node.
        #[arg(long)]
        qa_model: Option<String>,

        /// Larger-context model for prompts that overflow the QA model.
        #[arg(long)]
        fallback_model: Option<String>,

        /// Retrieval filter as `key=value` (repeatable).
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// JSON file describing the asking user.
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Identifier of the asking user.
        #[arg(long)]
        user_id: Option<String>,

        /// Concurrent retrieval calls.
        #[arg(long)]
        workers: Option<usize>,

        /// Directory containing prompt template files.
        #[arg(long, env = "SEARCH_AGENT_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Query plan utilities that need no model.
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are left untouched.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  search-agent init-prompts                      # Write to ~/.config/search-agent/prompts/
  search-agent init-prompts --dir ./my-prompts   # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/search-agent/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Plan subcommands.
#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Validate a plan file and print its execution order.
    #[command(after_help = r#"Examples:
  search-agent plan order plan.json
  search-agent --format json plan order plan.json | jq '.waves'
"#)]
    Order {
        /// JSON file with a `{"query_graph": [...]}` plan.
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_flags() {
        let cli = Cli::try_parse_from([
            "search-agent",
            "ask",
            "Who teaches CS101?",
            "--corpus",
            "docs.json",
            "--plan",
            "-f",
            "campus=north",
            "--filter",
            "lang=en",
            "-k",
            "5",
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));
        match cli.command {
            Commands::Ask {
                query,
                plan,
                auto_params,
                filters,
                top_k,
                ..
            } => {
                assert_eq!(query, "Who teaches CS101?");
                assert!(plan);
                assert!(!auto_params);
                assert_eq!(filters, vec!["campus=north", "lang=en"]);
                assert_eq!(top_k, Some(5));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_top_k_range_enforced() {
        let result = Cli::try_parse_from([
            "search-agent",
            "ask",
            "q",
            "--corpus",
            "docs.json",
            "-k",
            "11",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["search-agent", "plan", "order", "p.json", "--format", "json"])
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(cli.format, "json");
        assert!(matches!(cli.command, Commands::Plan(PlanCommands::Order { .. })));
    }
}
