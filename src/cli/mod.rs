//! CLI layer for the search agent.
//!
//! Provides the command-line interface using clap, with commands for
//! asking questions over a corpus, checking plan files, and scaffolding
//! prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, PlanCommands};
