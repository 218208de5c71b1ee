// ABOUTME: Read-only topology snapshot of a swarm for visualization collaborators.
// ABOUTME: Nodes are agents (with creator back-references); edges are logged interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::Interaction;

/// Whether an agent accepts new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AgentStatus::Active)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    /// Name of the creating agent, if any. Lookup only.
    pub parent: Option<String>,
    pub status: AgentStatus,
    pub last_thought: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Interaction> for GraphEdge {
    fn from(interaction: &Interaction) -> Self {
        Self {
            source: interaction.source.clone(),
            target: interaction.target.clone(),
            label: interaction.summary.clone(),
            timestamp: interaction.timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}
