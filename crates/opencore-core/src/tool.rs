// ABOUTME: Provider-agnostic tool definition advertised to the model on every request.
// ABOUTME: Each provider adapter reshapes it into its own wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool the model may call: unique name, human description, and a JSON-Schema-like
/// parameter tree (`type` / `properties` / `required` / `items` / `enum`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// A tool that takes no arguments.
    pub fn without_parameters(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            json!({"type": "object", "properties": {}, "required": []}),
        )
    }

    /// OpenAI function-calling wrapper: `{type: "function", function: {...}}`.
    pub fn to_openai_value(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}
