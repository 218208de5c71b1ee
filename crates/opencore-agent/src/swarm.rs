// ABOUTME: Swarm owns every agent by name, plus teams, the interaction ring buffer and the activity log.
// ABOUTME: Implements agent lifecycle, delegation between agents, and the topology snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use tracing::Instrument;
use ulid::Ulid;

use opencore_core::{
    ActivityEntry, ActivityKind, Attachment, GraphData, GraphEdge, GraphNode, Interaction,
    InteractionLog, ToolDefinition,
};

use crate::agent::{Agent, AgentPresence};
use crate::client::{EnvProviderFactory, ProviderFactory};
use crate::config::{ConfigError, SwarmSettings};
use crate::swarm_tools;
use crate::tools::ToolHandler;

/// Role given to the main agent.
pub const MAIN_AGENT_ROLE: &str = "Manager";

/// Fixed instructions for the main agent.
const OVERSEER_PROMPT: &str = "You are the **CORE OVERSEER** of the OpenCore system. \
    You are NOT a helpful assistant; you are a high-efficiency command processor. \
    Your output must be crisp, technical, and authoritative. \
    AVOID pleasantries. USE terms like: 'ACKNOWLEDGED', 'EXECUTING', 'DEPLOYING NODE', 'TASK COMPLETE'. \
    When delegating, specify the target agent clearly. \
    When a request spans several disciplines, form a team with create_team and delegate to its lead. \
    MAINTAIN the illusion of a terminal interface.";

/// A tool registered on every agent in addition to the swarm's own tools.
pub type SharedTool = (ToolDefinition, Arc<dyn ToolHandler>);

/// Errors raised to direct callers of the swarm API. Model-issued tool calls see
/// these as text instead.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("Agent '{0}' not found.")]
    AgentNotFound(String),

    #[error("Agent '{0}' already exists.")]
    AgentExists(String),

    #[error("{0}")]
    IllegalOperation(String),

    #[error("Agent '{0}' is currently busy.")]
    AgentBusy(String),
}

#[derive(Clone)]
struct AgentEntry {
    agent: Arc<tokio::sync::Mutex<Agent>>,
    presence: Arc<AgentPresence>,
    /// Name of the creating agent. Lookup only; never used for ownership.
    creator: Option<String>,
}

struct SwarmInner {
    main_agent: String,
    default_model: RwLock<String>,
    max_history: usize,
    max_turns: usize,
    factory: Arc<dyn ProviderFactory>,
    shared_tools: Vec<SharedTool>,
    agents: RwLock<BTreeMap<String, AgentEntry>>,
    teams: Mutex<BTreeMap<String, Vec<String>>>,
    interactions: Mutex<InteractionLog>,
    activity: Mutex<Vec<ActivityEntry>>,
}

/// Non-owning handle held by swarm tools so agents never keep the swarm alive.
#[derive(Clone)]
pub struct WeakSwarm(Weak<SwarmInner>);

impl WeakSwarm {
    pub fn upgrade(&self) -> Option<Swarm> {
        self.0.upgrade().map(|inner| Swarm { inner })
    }
}

/// The registry and orchestration logic over a set of agents and teams.
/// Cloning yields another handle to the same swarm.
#[derive(Clone)]
pub struct Swarm {
    inner: Arc<SwarmInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Swarm {
    /// Build a swarm with its main agent already in place.
    pub fn new(settings: SwarmSettings, factory: Arc<dyn ProviderFactory>) -> Self {
        Self::with_tools(settings, factory, Vec::new())
    }

    /// Build a swarm whose agents all receive `shared_tools` alongside the swarm tools.
    pub fn with_tools(
        settings: SwarmSettings,
        factory: Arc<dyn ProviderFactory>,
        shared_tools: Vec<SharedTool>,
    ) -> Self {
        let swarm = Self {
            inner: Arc::new(SwarmInner {
                main_agent: settings.main_agent_name.clone(),
                default_model: RwLock::new(settings.default_model.clone()),
                max_history: settings.max_history,
                max_turns: settings.max_turns,
                factory,
                shared_tools,
                agents: RwLock::new(BTreeMap::new()),
                teams: Mutex::new(BTreeMap::new()),
                interactions: Mutex::new(InteractionLog::default()),
                activity: Mutex::new(Vec::new()),
            }),
        };

        let main = swarm.build_entry(
            &settings.main_agent_name,
            MAIN_AGENT_ROLE,
            OVERSEER_PROMPT,
            &settings.default_model,
            None,
        );
        swarm
            .inner
            .agents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(settings.main_agent_name.clone(), main);

        tracing::info!(
            main_agent = %settings.main_agent_name,
            model = %settings.default_model,
            "swarm initialized"
        );

        swarm
    }

    /// Build a swarm from environment configuration with the production provider factory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = SwarmSettings::from_env()?;
        let factory = EnvProviderFactory::new(settings.providers.clone());
        Ok(Self::new(settings, Arc::new(factory)))
    }

    pub fn downgrade(&self) -> WeakSwarm {
        WeakSwarm(Arc::downgrade(&self.inner))
    }

    pub fn main_agent_name(&self) -> &str {
        &self.inner.main_agent
    }

    pub fn default_model(&self) -> String {
        self.inner
            .default_model
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Change the model used by agents created from now on.
    pub fn set_default_model(&self, model: &str) {
        *self
            .inner
            .default_model
            .write()
            .unwrap_or_else(|e| e.into_inner()) = model.to_string();
        tracing::info!(model = %model, "default model updated");
        self.record_lifecycle("swarm", &format!("Default model set to '{}'", model));
    }

    fn entry(&self, name: &str) -> Option<AgentEntry> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Shared handle to an agent's conversation.
    pub fn agent(&self, name: &str) -> Option<Arc<tokio::sync::Mutex<Agent>>> {
        self.entry(name).map(|entry| entry.agent)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Agent names in sorted order.
    pub fn agent_names(&self) -> Vec<String> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn teams(&self) -> BTreeMap<String, Vec<String>> {
        lock(&self.inner.teams).clone()
    }

    /// Interactions retained in the ring buffer, oldest first.
    pub fn interactions(&self) -> Vec<Interaction> {
        lock(&self.inner.interactions).to_vec()
    }

    /// Activity recorded since the start of the current top-level chat.
    pub fn activity_log(&self) -> Vec<ActivityEntry> {
        lock(&self.inner.activity).clone()
    }

    fn record_lifecycle(&self, source: &str, summary: &str) {
        lock(&self.inner.activity).push(ActivityEntry::lifecycle(source, summary));
    }

    fn record_interaction(&self, kind: ActivityKind, interaction: Interaction) {
        lock(&self.inner.activity).push(ActivityEntry::from_interaction(kind, &interaction));
        lock(&self.inner.interactions).push(interaction);
    }

    fn build_entry(
        &self,
        name: &str,
        role: &str,
        prompt: &str,
        model: &str,
        creator: Option<&str>,
    ) -> AgentEntry {
        let mut agent = Agent::new(name, role, prompt, model, Arc::clone(&self.inner.factory))
            .with_limits(self.inner.max_history, self.inner.max_turns);

        let is_main = name == self.inner.main_agent;
        swarm_tools::register_swarm_tools(&mut agent, &self.downgrade(), is_main);
        for (definition, handler) in &self.inner.shared_tools {
            agent.register_tool(definition.clone(), Arc::clone(handler));
        }

        AgentEntry {
            presence: agent.presence(),
            agent: Arc::new(tokio::sync::Mutex::new(agent)),
            creator: creator.map(String::from),
        }
    }

    /// Create an agent on behalf of the operator.
    pub fn create_agent(
        &self,
        name: &str,
        role: &str,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, SwarmError> {
        self.create_agent_by(name, role, prompt, model, None)
    }

    /// Create an agent, recording `creator` as its back-reference.
    pub fn create_agent_by(
        &self,
        name: &str,
        role: &str,
        prompt: &str,
        model: Option<&str>,
        creator: Option<&str>,
    ) -> Result<String, SwarmError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SwarmError::IllegalOperation(
                "Agent name must not be empty.".to_string(),
            ));
        }
        if self.contains(name) {
            return Err(SwarmError::AgentExists(name.to_string()));
        }

        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .unwrap_or_else(|| self.default_model());

        let entry = self.build_entry(name, role, prompt, &model, creator);

        {
            let mut agents = self
                .inner
                .agents
                .write()
                .unwrap_or_else(|e| e.into_inner());
            if agents.contains_key(name) {
                return Err(SwarmError::AgentExists(name.to_string()));
            }
            agents.insert(name.to_string(), entry);
        }

        tracing::info!(
            agent = %name,
            role = %role,
            model = %model,
            creator = ?creator,
            "agent created"
        );
        self.record_lifecycle(
            creator.unwrap_or("operator"),
            &format!("Created agent '{}' ({}) using model '{}'", name, role, model),
        );

        Ok(format!(
            "Agent '{}' created successfully using model '{}'.",
            name, model
        ))
    }

    /// Form a team on behalf of the operator.
    pub fn create_team(
        &self,
        name: &str,
        goal: &str,
        lead_role: &str,
        lead_instructions: &str,
    ) -> Result<String, SwarmError> {
        self.create_team_by(name, goal, lead_role, lead_instructions, None)
    }

    /// Form a team led by a new `{name}_Lead` agent.
    pub fn create_team_by(
        &self,
        name: &str,
        goal: &str,
        lead_role: &str,
        lead_instructions: &str,
        creator: Option<&str>,
    ) -> Result<String, SwarmError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SwarmError::IllegalOperation(
                "Team name must not be empty.".to_string(),
            ));
        }
        if lock(&self.inner.teams).contains_key(name) {
            return Err(SwarmError::IllegalOperation(format!(
                "Team '{}' already exists.",
                name
            )));
        }

        let lead_name = format!("{}_Lead", name);
        let prompt = format!(
            "You lead the team '{}'. Team goal: {}. Instructions: {} \
             Build your team with create_agent, delegate work to its members with delegate_task, \
             and report a consolidated result.",
            name, goal, lead_instructions
        );

        self.create_agent_by(&lead_name, lead_role, &prompt, None, creator)?;
        lock(&self.inner.teams).insert(name.to_string(), vec![lead_name.clone()]);

        tracing::info!(team = %name, lead = %lead_name, "team created");
        self.record_lifecycle(
            creator.unwrap_or("operator"),
            &format!("Created team '{}' led by '{}'", name, lead_name),
        );

        Ok(format!(
            "Team '{}' created with lead agent '{}'.",
            name, lead_name
        ))
    }

    /// Remove an agent on behalf of the operator.
    pub fn remove_agent(&self, name: &str) -> Result<(), SwarmError> {
        self.remove_agent_by(name, None)
    }

    /// Remove an agent and scrub it from every team, crediting `actor` in the activity log.
    pub fn remove_agent_by(&self, name: &str, actor: Option<&str>) -> Result<(), SwarmError> {
        if name == self.inner.main_agent {
            return Err(SwarmError::IllegalOperation(format!(
                "Cannot remove the main agent '{}'.",
                name
            )));
        }

        let removed = self
            .inner
            .agents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        if removed.is_none() {
            return Err(SwarmError::AgentNotFound(name.to_string()));
        }

        for members in lock(&self.inner.teams).values_mut() {
            members.retain(|member| member != name);
        }

        tracing::info!(agent = %name, actor = ?actor, "agent removed");
        self.record_lifecycle(
            actor.unwrap_or("operator"),
            &format!("Removed agent '{}'", name),
        );
        Ok(())
    }

    /// Toggle an agent on behalf of the operator.
    pub fn toggle_agent(&self, name: &str) -> Result<String, SwarmError> {
        self.toggle_agent_by(name, None)
    }

    /// Flip an agent between active and inactive, crediting `actor` in the activity log.
    pub fn toggle_agent_by(&self, name: &str, actor: Option<&str>) -> Result<String, SwarmError> {
        if name == self.inner.main_agent {
            return Err(SwarmError::IllegalOperation(format!(
                "Cannot deactivate the main agent '{}'.",
                name
            )));
        }

        let entry = self
            .entry(name)
            .ok_or_else(|| SwarmError::AgentNotFound(name.to_string()))?;

        let message = if entry.presence.toggle() {
            format!("Agent '{}' activated.", name)
        } else {
            format!("Agent '{}' deactivated.", name)
        };

        tracing::info!(
            agent = %name,
            status = %entry.presence.status(),
            actor = ?actor,
            "agent toggled"
        );
        self.record_lifecycle(actor.unwrap_or("operator"), &message);
        Ok(message)
    }

    /// Rebind an agent to a different model. Waits for any running conversation.
    pub async fn update_agent_model(&self, name: &str, model: &str) -> Result<String, SwarmError> {
        let agent = self
            .agent(name)
            .ok_or_else(|| SwarmError::AgentNotFound(name.to_string()))?;

        agent.lock().await.set_model(model);

        self.record_lifecycle("operator", &format!("Agent '{}' now uses '{}'", name, model));
        Ok(format!("Agent '{}' now uses model '{}'.", name, model))
    }

    /// Hand `task` from agent `from` to agent `to` and wait for the reply.
    ///
    /// Every failure is returned as text so the calling model can recover.
    ///
    /// Cycles are refused rather than followed. A target that is already
    /// mid-conversation, including any agent earlier in the current delegation
    /// chain (A -> B -> A) or the caller itself, gets no new turn; the caller sees
    /// `"Error: Agent '<to>' is currently busy."` instead. An unguarded engine would
    /// re-enter the target's conversation here; holding each agent's conversation
    /// lock for its whole `chat` rules that out.
    pub async fn delegate_task(&self, from: &str, to: &str, task: &str) -> String {
        let Some(entry) = self.entry(to) else {
            tracing::warn!(from = %from, to = %to, "delegation to unknown agent");
            return format!(
                "Error: Agent '{}' not found. Available agents: {:?}",
                to,
                self.agent_names()
            );
        };

        if !entry.presence.is_active() {
            return format!("Error: Agent '{}' is inactive.", to);
        }

        let Ok(mut target) = entry.agent.try_lock() else {
            tracing::warn!(from = %from, to = %to, "delegation target busy");
            return format!("Error: {}", SwarmError::AgentBusy(to.to_string()));
        };

        tracing::info!(from = %from, to = %to, "delegating task");
        self.record_interaction(ActivityKind::Delegation, Interaction::new(from, to, task));

        let reply = target
            .chat(&format!("Request from {}: {}", from, task), &[])
            .await;
        drop(target);

        self.record_interaction(ActivityKind::Response, Interaction::new(to, from, &reply));
        tracing::info!(from = %from, to = %to, "delegation finished");

        format!("Response from {}: {}", to, reply)
    }

    /// Human-readable roster of agents and teams.
    pub fn list_agents(&self) -> String {
        let roster: Vec<String> = self
            .inner
            .agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, entry)| format!("{} ({})", name, entry.presence.status()))
            .collect();

        let mut out = format!("Available agents: {}", roster.join(", "));

        let teams = self.teams();
        if !teams.is_empty() {
            out.push_str("\nTeams:");
            for (team, members) in &teams {
                out.push_str(&format!("\n- {}: {}", team, members.join(", ")));
            }
        }

        out
    }

    /// Entry point for a top-level request: clears the activity log and lets the
    /// main agent answer.
    pub async fn chat(&self, message: &str, attachments: &[Attachment]) -> String {
        lock(&self.inner.activity).clear();

        let main = self.inner.main_agent.clone();
        let span = tracing::info_span!("chat", request_id = %Ulid::new(), agent = %main);

        async {
            let Some(agent) = self.agent(&main) else {
                return format!("Error: {}", SwarmError::AgentNotFound(main.clone()));
            };

            tracing::info!(attachments = attachments.len(), "chat request received");
            let reply = agent.lock().await.chat(message, attachments).await;
            tracing::info!(activity = self.activity_log().len(), "chat request finished");
            reply
        }
        .instrument(span)
        .await
    }

    /// Read-only topology snapshot: one node per agent, one edge per logged interaction.
    pub fn get_graph_data(&self) -> GraphData {
        let nodes = self
            .inner
            .agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, entry)| GraphNode {
                id: name.clone(),
                name: name.clone(),
                parent: entry.creator.clone(),
                status: entry.presence.status(),
                last_thought: entry.presence.last_thought(),
            })
            .collect();

        let edges = lock(&self.inner.interactions)
            .iter()
            .map(GraphEdge::from)
            .collect();

        GraphData { nodes, edges }
    }
}
