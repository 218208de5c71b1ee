// ABOUTME: Implements the list_agents tool, reporting every agent with its status and any teams.
// ABOUTME: Registered on every agent so peers can discover delegation targets.

use async_trait::async_trait;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler};

pub fn definition() -> ToolDefinition {
    ToolDefinition::without_parameters("list_agents", "Lists all available agents in the swarm.")
}

#[derive(Clone)]
pub struct ListAgentsTool {
    pub(crate) swarm: WeakSwarm,
}

#[async_trait]
impl ToolHandler for ListAgentsTool {
    async fn call(&self, _args: ToolArgs) -> anyhow::Result<String> {
        Ok(super::live(&self.swarm)?.list_agents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmSettings;
    use crate::swarm::Swarm;
    use crate::testing::{ScriptedProvider, StaticProviderFactory};
    use std::sync::Arc;

    #[tokio::test]
    async fn lists_agents_and_status() {
        let factory = Arc::new(StaticProviderFactory::new(Arc::new(ScriptedProvider::new())));
        let swarm = Swarm::new(SwarmSettings::default(), factory);
        swarm.create_agent("Worker", "Dev", "x", None).unwrap();
        swarm.toggle_agent("Worker").unwrap();

        let tool = ListAgentsTool {
            swarm: swarm.downgrade(),
        };
        let out = tool.call(ToolArgs::new()).await.unwrap();

        assert!(out.starts_with("Available agents:"));
        assert!(out.contains("Manager (active)"));
        assert!(out.contains("Worker (inactive)"));
    }
}
