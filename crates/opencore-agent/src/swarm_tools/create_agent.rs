// ABOUTME: Implements the create_agent tool, letting an agent spawn a new peer in the swarm.
// ABOUTME: The calling agent is recorded as the creator; failures come back as "Error: ..." text.

use async_trait::async_trait;
use serde_json::json;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler, optional_str, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "create_agent",
        "Creates a new agent with a specific role and instructions.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Unique name of the new agent"
                },
                "role": {
                    "type": "string",
                    "description": "Short role description, e.g. 'Python Developer'"
                },
                "instructions": {
                    "type": "string",
                    "description": "Detailed instructions for the new agent"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model identifier; defaults to the swarm default model"
                }
            },
            "required": ["name", "role", "instructions"]
        }),
    )
}

#[derive(Clone)]
pub struct CreateAgentTool {
    pub(crate) swarm: WeakSwarm,
    pub(crate) owner: String,
}

#[async_trait]
impl ToolHandler for CreateAgentTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let name = required_str(&args, "name")?;
        let role = required_str(&args, "role")?;
        let instructions = required_str(&args, "instructions")?;
        let model = optional_str(&args, "model");

        let swarm = super::live(&self.swarm)?;
        Ok(
            match swarm.create_agent_by(name, role, instructions, model, Some(&self.owner)) {
                Ok(message) => message,
                Err(e) => format!("Error: {}", e),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmSettings;
    use crate::swarm::Swarm;
    use crate::testing::{ScriptedProvider, StaticProviderFactory};
    use std::sync::Arc;

    fn swarm() -> Swarm {
        let factory = Arc::new(StaticProviderFactory::new(Arc::new(ScriptedProvider::new())));
        Swarm::new(SwarmSettings::default(), factory)
    }

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn definition_requires_name_role_instructions() {
        let def = definition();
        assert_eq!(def.name, "create_agent");
        assert_eq!(
            def.parameters["required"],
            json!(["name", "role", "instructions"])
        );
        assert!(def.parameters["properties"]["model"].is_object());
    }

    #[tokio::test]
    async fn creates_agent_with_owner_as_creator() {
        let swarm = swarm();
        let tool = CreateAgentTool {
            swarm: swarm.downgrade(),
            owner: "Manager".to_string(),
        };

        let out = tool
            .call(args(json!({"name": "Coder", "role": "Dev", "instructions": "Code.", "model": "groq/llama3"})))
            .await
            .unwrap();

        assert_eq!(
            out,
            "Agent 'Coder' created successfully using model 'groq/llama3'."
        );
        assert_eq!(
            swarm.get_graph_data().node("Coder").unwrap().parent.as_deref(),
            Some("Manager")
        );
    }

    #[tokio::test]
    async fn duplicate_name_is_reported_as_text() {
        let swarm = swarm();
        let tool = CreateAgentTool {
            swarm: swarm.downgrade(),
            owner: "Manager".to_string(),
        };

        let out = tool
            .call(args(json!({"name": "Manager", "role": "Dev", "instructions": "x"})))
            .await
            .unwrap();

        assert_eq!(out, "Error: Agent 'Manager' already exists.");
    }

    #[tokio::test]
    async fn missing_argument_is_an_error() {
        let swarm = swarm();
        let tool = CreateAgentTool {
            swarm: swarm.downgrade(),
            owner: "Manager".to_string(),
        };

        let err = tool.call(args(json!({"name": "X"}))).await.unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[tokio::test]
    async fn dropped_swarm_fails_the_call() {
        let weak = swarm().downgrade();
        let tool = CreateAgentTool {
            swarm: weak,
            owner: "Manager".to_string(),
        };

        let err = tool
            .call(args(json!({"name": "X", "role": "r", "instructions": "i"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no longer running"));
    }
}
