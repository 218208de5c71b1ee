// ABOUTME: Tools through which agents manage the swarm: creation, delegation, listing, teams and lifecycle.
// ABOUTME: Every agent gets the common set; only the main agent gets team and lifecycle control.

pub mod create_agent;
pub mod create_team;
pub mod delegate_task;
pub mod list_agents;
pub mod remove_agent;
pub mod toggle_agent;

use std::sync::Arc;

use crate::agent::Agent;
use crate::swarm::{Swarm, WeakSwarm};

pub use create_agent::CreateAgentTool;
pub use create_team::CreateTeamTool;
pub use delegate_task::DelegateTaskTool;
pub use list_agents::ListAgentsTool;
pub use remove_agent::RemoveAgentTool;
pub use toggle_agent::ToggleAgentTool;

/// Register the swarm tools on `agent`, bound to the agent's own name.
pub fn register_swarm_tools(agent: &mut Agent, swarm: &WeakSwarm, is_main: bool) {
    let owner = agent.name().to_string();

    agent.register_tool(
        create_agent::definition(),
        Arc::new(CreateAgentTool {
            swarm: swarm.clone(),
            owner: owner.clone(),
        }),
    );
    agent.register_tool(
        delegate_task::definition(),
        Arc::new(DelegateTaskTool {
            swarm: swarm.clone(),
            owner: owner.clone(),
        }),
    );
    agent.register_tool(
        list_agents::definition(),
        Arc::new(ListAgentsTool {
            swarm: swarm.clone(),
        }),
    );

    if is_main {
        agent.register_tool(
            create_team::definition(),
            Arc::new(CreateTeamTool {
                swarm: swarm.clone(),
                owner: owner.clone(),
            }),
        );
        agent.register_tool(
            remove_agent::definition(),
            Arc::new(RemoveAgentTool {
                swarm: swarm.clone(),
                owner: owner.clone(),
            }),
        );
        agent.register_tool(
            toggle_agent::definition(),
            Arc::new(ToggleAgentTool {
                swarm: swarm.clone(),
                owner,
            }),
        );
    }
}

/// Resolve the weak handle, failing the tool call once the swarm is gone.
pub(crate) fn live(swarm: &WeakSwarm) -> anyhow::Result<Swarm> {
    swarm
        .upgrade()
        .ok_or_else(|| anyhow::anyhow!("swarm is no longer running"))
}
