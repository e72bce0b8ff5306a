//! System prompts and message builders for agents.
//!
//! Prompts can be overridden per file from a prompt directory; anything
//! missing falls back to the compiled-in text. The builders assemble the
//! message sequences each agent sends.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use super::message::{ChatMessage, assistant_message, system_message, user_message};
use crate::core::rerank::RankedEvidence;

/// System prompt describing the answering assistant's role.
pub const ROLE_SYSTEM_PROMPT: &str = "You are a helpful, knowledgeable and confident assistant. \
Your task is to respond to the user's question with a helpful, accurate and concise answer \
based only on the information that can be found in the organization's data. Before answering \
the user's question, first search for supporting information from the organization's data.";

/// System prompt for the query planning agent.
pub const PLANNER_SYSTEM_PROMPT: &str = "You are a world class query planning algorithm capable \
of breaking apart questions into dependant sub-questions, such that the answers can be used to \
inform the parent question. Do not answer the questions, simply provide a correct compute graph \
with good specific questions to ask and relevant sub-questions. Before you call the function, \
think step by step to get a better understanding the problem.";

/// System prompt for the search parameter agent.
pub const PARAMETERS_SYSTEM_PROMPT: &str = "You are a world class search optimization algorithm \
capable of tuning search parameters to return the most relevant and comprehensive search results \
for a given query. The query will be sent to the database as is, you can't modify it. The search \
query along with the parameters you select will be executed against a database containing rows \
of text such as messages and document chunks. Do not answer the query, simply provide the optimal \
search parameters that would result in the most relevant and comprehensive search results. \
Before you call the function, think step by step to get a better understanding the problem.";

/// System prompt for the answer excerpt agent.
pub const EXCERPT_SYSTEM_PROMPT: &str = "You are given a question, a drafted answer and the \
search results the answer was based on. Return the answer as a helpful, accurate and concise \
reply to the question, without changing its meaning. If one search result contains a short \
snippet or quote that directly supports the answer, return it verbatim as the excerpt; \
otherwise leave the excerpt empty.";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/search-agent/prompts";

/// Filename for the role prompt template.
const ROLE_FILENAME: &str = "role.md";
/// Filename for the planner prompt template.
const PLANNER_FILENAME: &str = "planner.md";
/// Filename for the parameters prompt template.
const PARAMETERS_FILENAME: &str = "parameters.md";
/// Filename for the excerpt prompt template.
const EXCERPT_FILENAME: &str = "excerpt.md";

/// A set of system prompts for all agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Role of the answering assistant.
    pub role: String,
    /// Query planning agent.
    pub planner: String,
    /// Search parameter agent.
    pub parameters: String,
    /// Answer excerpt agent.
    pub excerpt: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `SEARCH_AGENT_PROMPT_DIR` environment variable
    /// 3. `~/.config/search-agent/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("SEARCH_AGENT_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            role: load_file(ROLE_FILENAME, ROLE_SYSTEM_PROMPT),
            planner: load_file(PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            parameters: load_file(PARAMETERS_FILENAME, PARAMETERS_SYSTEM_PROMPT),
            excerpt: load_file(EXCERPT_FILENAME, EXCERPT_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            role: ROLE_SYSTEM_PROMPT.to_string(),
            planner: PLANNER_SYSTEM_PROMPT.to_string(),
            parameters: PARAMETERS_SYSTEM_PROMPT.to_string(),
            excerpt: EXCERPT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (ROLE_FILENAME, ROLE_SYSTEM_PROMPT),
            (PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            (PARAMETERS_FILENAME, PARAMETERS_SYSTEM_PROMPT),
            (EXCERPT_FILENAME, EXCERPT_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// An already answered dependency of the node being answered.
#[derive(Debug, Clone, Copy)]
pub struct AnsweredQuestion<'a> {
    /// The dependency's question.
    pub question: &'a str,
    /// Its answer.
    pub answer: &'a str,
}

/// Formats ranked evidence as numbered, quoted search results.
#[must_use]
pub fn format_sources(sources: &[RankedEvidence]) -> String {
    let mut out = String::new();
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "Search Result {}:\n\"\"\"\n{}\n\"\"\"",
            i + 1,
            source.evidence.text
        );
    }
    out
}

/// Builds the message sequence that answers one node.
///
/// Order: role, question, evidence, dependency answers (if any),
/// personalisation (if any), closing rules.
#[must_use]
pub fn build_answer_messages(
    role_prompt: &str,
    question: &str,
    sources: &[RankedEvidence],
    dependencies: &[AnsweredQuestion<'_>],
    profile: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages = vec![
        system_message(role_prompt),
        user_message(&format!("Question: {question}")),
        assistant_message(&format!(
            "I searched the organization's data for supporting information and found the \
             following results related to your question. The search results are in order of \
             trustworthiness:\n{}",
            format_sources(sources)
        )),
    ];

    if !dependencies.is_empty() {
        let answered = dependencies
            .iter()
            .map(|d| format!("Question: {}\nMy Answer: {}", d.question, d.answer))
            .collect::<Vec<_>>()
            .join("\n\n");
        messages.push(assistant_message(&format!(
            "I have also previously answered these questions that may be relevant to answering \
             your question:\n{answered}"
        )));
    }

    if let Some(profile) = profile {
        messages.push(system_message(&format!(
            "If the user asks about themselves or uses 'I' in their question, use the following \
             information about them to answer the question:\n{profile}"
        )));
    }

    let related = if dependencies.is_empty() {
        ""
    } else {
        "and answers to related questions "
    };
    messages.push(system_message(&format!(
        "Use the above search results {related}to provide a helpful, accurate and concise answer \
         to the user's question. If there is conflicting information between search results, use \
         the more trustworthy result (higher up in search results). If you can't answer the \
         question, be honest and tell the user what information you were able to find and what \
         information is missing to answer their question."
    )));

    messages
}

/// Builds the user message for the search parameter agent.
#[must_use]
pub fn build_parameter_message(question: &str) -> String {
    format!("Query: {question}")
}

/// Builds the user message for the excerpt agent.
#[must_use]
pub fn build_excerpt_message(question: &str, answer: &str, sources: &[RankedEvidence]) -> String {
    format!(
        "Question: {question}\n\nDrafted answer:\n{answer}\n\nSearch results:\n{}",
        format_sources(sources)
    )
}
