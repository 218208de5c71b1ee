// ABOUTME: Implements the toggle_agent tool for the main agent, switching an agent on or off.
// ABOUTME: Inactive agents refuse chats and delegations until toggled back.

use async_trait::async_trait;
use serde_json::json;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "toggle_agent",
        "Activates or deactivates an agent.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name of the agent to toggle"
                }
            },
            "required": ["name"]
        }),
    )
}

#[derive(Clone)]
pub struct ToggleAgentTool {
    pub(crate) swarm: WeakSwarm,
    pub(crate) owner: String,
}

#[async_trait]
impl ToolHandler for ToggleAgentTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let name = required_str(&args, "name")?;
        let swarm = super::live(&self.swarm)?;

        Ok(match swarm.toggle_agent_by(name, Some(&self.owner)) {
            Ok(message) => message,
            Err(e) => format!("Error: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmSettings;
    use crate::swarm::Swarm;
    use crate::testing::{ScriptedProvider, StaticProviderFactory};
    use std::sync::Arc;

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn toggles_back_and_forth() {
        let factory = Arc::new(StaticProviderFactory::new(Arc::new(ScriptedProvider::new())));
        let swarm = Swarm::new(SwarmSettings::default(), factory);
        swarm.create_agent("Worker", "Dev", "x", None).unwrap();
        let tool = ToggleAgentTool {
            swarm: swarm.downgrade(),
            owner: "Manager".to_string(),
        };

        let off = tool.call(args(json!({"name": "Worker"}))).await.unwrap();
        assert_eq!(off, "Agent 'Worker' deactivated.");
        let on = tool.call(args(json!({"name": "Worker"}))).await.unwrap();
        assert_eq!(on, "Agent 'Worker' activated.");
        assert_eq!(swarm.activity_log().last().unwrap().source, "Manager");

        let main = tool.call(args(json!({"name": "Manager"}))).await.unwrap();
        assert!(main.starts_with("Error:"));
    }
}
