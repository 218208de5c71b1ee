// ABOUTME: Implements the create_team tool, forming a team around a newly created lead agent.
// ABOUTME: Registered only on the main agent; the lead can hire members but cannot form teams.

use async_trait::async_trait;
use serde_json::json;

use opencore_core::ToolDefinition;

use crate::swarm::WeakSwarm;
use crate::tools::{ToolArgs, ToolHandler, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "create_team",
        "Creates a team with a lead agent who will build and manage the team to achieve a goal.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Team name; the lead is named '<name>_Lead'"
                },
                "goal": {
                    "type": "string",
                    "description": "What the team must achieve"
                },
                "lead_role": {
                    "type": "string",
                    "description": "Role of the team lead"
                },
                "lead_instructions": {
                    "type": "string",
                    "description": "Instructions for the team lead"
                }
            },
            "required": ["name", "goal", "lead_role", "lead_instructions"]
        }),
    )
}

#[derive(Clone)]
pub struct CreateTeamTool {
    pub(crate) swarm: WeakSwarm,
    pub(crate) owner: String,
}

#[async_trait]
impl ToolHandler for CreateTeamTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let name = required_str(&args, "name")?;
        let goal = required_str(&args, "goal")?;
        let lead_role = required_str(&args, "lead_role")?;
        let lead_instructions = required_str(&args, "lead_instructions")?;

        let swarm = super::live(&self.swarm)?;
        Ok(
            match swarm.create_team_by(name, goal, lead_role, lead_instructions, Some(&self.owner)) {
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

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn forms_team_under_owner() {
        let factory = Arc::new(StaticProviderFactory::new(Arc::new(ScriptedProvider::new())));
        let swarm = Swarm::new(SwarmSettings::default(), factory);
        let tool = CreateTeamTool {
            swarm: swarm.downgrade(),
            owner: "Manager".to_string(),
        };

        let team = json!({
            "name": "Research",
            "goal": "Survey the field",
            "lead_role": "Principal Investigator",
            "lead_instructions": "Hire two analysts."
        });
        let out = tool.call(args(team.clone())).await.unwrap();
        assert!(out.contains("Team 'Research' created"));
        assert_eq!(
            swarm.get_graph_data().node("Research_Lead").unwrap().parent.as_deref(),
            Some("Manager")
        );

        let again = tool.call(args(team)).await.unwrap();
        assert_eq!(again, "Error: Team 'Research' already exists.");
    }
}
