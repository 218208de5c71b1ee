// ABOUTME: Implements the remove_agent tool for the main agent.
// ABOUTME: Removing the main agent or an unknown agent is reported as error text.

use async_trait::async_trait;
use serde_json::json;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "remove_agent",
        "Removes an agent from the swarm.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name of the agent to remove"
                }
            },
            "required": ["name"]
        }),
    )
}

#[derive(Clone)]
pub struct RemoveAgentTool {
    pub(crate) swarm: WeakSwarm,
    pub(crate) owner: String,
}

#[async_trait]
impl ToolHandler for RemoveAgentTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let name = required_str(&args, "name")?;
        let swarm = super::live(&self.swarm)?;

        Ok(match swarm.remove_agent_by(name, Some(&self.owner)) {
            Ok(()) => format!("Agent '{}' removed.", name),
            Err(e) => format!("Error: {}", e),
        })
    }
}
