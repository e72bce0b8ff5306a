//! Binding of forced function calls to typed structs.
//!
//! Each structured LLM output has a struct implementing [`FunctionSchema`]
//! with a hand-written JSON schema. The schema is offered to the model as
//! the only callable function; the call's arguments are then deserialized
//! and range-checked. Any failure in that path is a
//! [`AgentError::SchemaBinding`] naming the schema.

use serde::de::DeserializeOwned;

use super::tool::ToolDefinition;
use super::traits::AgentResponse;
use crate::error::AgentError;

/// A struct the model fills in by calling a function.
pub trait FunctionSchema: DeserializeOwned {
    /// Function name the model must call.
    const NAME: &'static str;

    /// Function description shown to the model.
    const DESCRIPTION: &'static str;

    /// JSON Schema of the function arguments.
    fn parameters() -> serde_json::Value;

    /// Function definition to send with a request.
    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            parameters: Self::parameters(),
        }
    }

    /// Checks constraints serde cannot express (ranges, non-empty lists).
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Binds the first function call in `response`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SchemaBinding`] if there is no call, the call
    /// names another function, or its arguments do not bind.
    fn from_response(response: &AgentResponse) -> Result<Self, AgentError> {
        let call = response
            .tool_calls
            .first()
            .ok_or_else(|| AgentError::SchemaBinding {
                schema: Self::NAME,
                message: "response contains no function call".to_string(),
            })?;
        if call.name != Self::NAME {
            return Err(AgentError::SchemaBinding {
                schema: Self::NAME,
                message: format!("model called '{}' instead", call.name),
            });
        }
        Self::from_arguments(&call.arguments)
    }

    /// Deserializes and validates raw JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SchemaBinding`] on malformed JSON or a failed
    /// [`FunctionSchema::validate`].
    fn from_arguments(arguments: &str) -> Result<Self, AgentError> {
        let value: Self = serde_json::from_str(arguments).map_err(|e| AgentError::SchemaBinding {
            schema: Self::NAME,
            message: format!("invalid arguments: {e}"),
        })?;
        value
            .validate()
            .map_err(|message| AgentError::SchemaBinding {
                schema: Self::NAME,
                message,
            })?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tool::ToolCall;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Rating {
        stars: u8,
    }

    impl FunctionSchema for Rating {
        const NAME: &'static str = "Rating";
        const DESCRIPTION: &'static str = "Rate something.";

        fn parameters() -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {"stars": {"type": "integer"}},
                "required": ["stars"]
            })
        }

        fn validate(&self) -> Result<(), String> {
            if (1..=5).contains(&self.stars) {
                Ok(())
            } else {
                Err(format!("stars must be in [1, 5], got {}", self.stars))
            }
        }
    }

    fn response(name: &str, arguments: &str) -> AgentResponse {
        AgentResponse {
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            ..AgentResponse::default()
        }
    }

    #[test]
    fn test_definition() {
        let def = Rating::definition();
        assert_eq!(def.name, "Rating");
        assert_eq!(def.parameters["required"][0], "stars");
    }

    #[test]
    fn test_from_response_binds() {
        let rating = Rating::from_response(&response("Rating", r#"{"stars": 4}"#))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(rating.stars, 4);
    }

    #[test]
    fn test_from_response_missing_call() {
        let result = Rating::from_response(&AgentResponse::default());
        assert!(matches!(
            result,
            Err(AgentError::SchemaBinding { schema: "Rating", .. })
        ));
    }

    #[test]
    fn test_from_response_wrong_function() {
        let result = Rating::from_response(&response("Review", r#"{"stars": 4}"#));
        assert!(matches!(result, Err(AgentError::SchemaBinding { .. })));
    }

    #[test]
    fn test_from_response_malformed_arguments() {
        let result = Rating::from_response(&response("Rating", r#"{"stars": "#));
        assert!(matches!(result, Err(AgentError::SchemaBinding { .. })));
    }

    #[test]
    fn test_from_response_out_of_range() {
        let err = Rating::from_response(&response("Rating", r#"{"stars": 9}"#))
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("stars must be in [1, 5]"));
    }
}
