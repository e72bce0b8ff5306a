//! Function-calling types shared by the provider and the schemas.
//!
//! The engine never runs tools itself. It offers exactly one function per
//! request and forces the model to call it, so the call's arguments carry
//! the structured answer (a plan, search parameters, an excerpt).

use serde::{Deserialize, Serialize};

/// A function definition sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name the model must call.
    pub name: String,
    /// Human-readable description of what the function produces.
    pub description: String,
    /// JSON Schema object describing the arguments.
    pub parameters: serde_json::Value,
}

/// A function call returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the provider.
    pub id: String,
    /// Name of the called function.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

impl ToolCall {
    /// Parses the JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the arguments are not valid JSON.
    pub fn parse_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}
