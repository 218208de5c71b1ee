// ABOUTME: Implements the delegate_task tool, handing work to another agent and waiting for its answer.
// ABOUTME: The tool's owner is the delegation source; unknown or busy targets come back as error text.

use async_trait::async_trait;
use serde_json::json;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "delegate_task",
        "Delegates a task to another existing agent and waits for the result.",
        json!({
            "type": "object",
            "properties": {
                "to_agent": {
                    "type": "string",
                    "description": "Name of the agent that should perform the task"
                },
                "task": {
                    "type": "string",
                    "description": "Full description of the task"
                }
            },
            "required": ["to_agent", "task"]
        }),
    )
}

#[derive(Clone)]
pub struct DelegateTaskTool {
    pub(crate) swarm: WeakSwarm,
    pub(crate) owner: String,
}

#[async_trait]
impl ToolHandler for DelegateTaskTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let to = required_str(&args, "to_agent")?;
        let task = required_str(&args, "task")?;

        let swarm = super::live(&self.swarm)?;
        Ok(swarm.delegate_task(&self.owner, to, task).await)
    }
}
