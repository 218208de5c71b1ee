// ABOUTME: A single agent: one conversation history, its tool registry, and the bounded think loop.
// ABOUTME: Also hosts history pruning and the presence record (status, last thought) shared with the swarm.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use opencore_core::{AgentStatus, Attachment, Message, Role, ToolDefinition};

use crate::client::ProviderFactory;
use crate::config::{DEFAULT_MAX_HISTORY, DEFAULT_MAX_TURNS};
use crate::runtime::ProviderError;
use crate::tools::{ToolHandler, ToolRegistry};

pub const CONFIG_INVALID_MESSAGE: &str =
    "Error: Configuration invalid. Please check your settings (API key or credentials).";
pub const MAX_TURNS_MESSAGE: &str = "Error: Max turns reached.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Error: Empty response from model.";

/// Fragments that mark a provider failure as a credential problem.
const CREDENTIAL_MARKERS: &[&str] = &[
    "api key",
    "api_key",
    "apikey",
    "credential",
    "unauthorized",
    "authentication",
    "permission denied",
    "401",
];

/// Status and last thought of an agent, readable without the conversation lock.
#[derive(Debug)]
pub struct AgentPresence {
    active: AtomicBool,
    last_thought: Mutex<Option<String>>,
}

impl Default for AgentPresence {
    fn default() -> Self {
        Self {
            active: AtomicBool::new(true),
            last_thought: Mutex::new(None),
        }
    }
}

impl AgentPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Flip the status and return the new value.
    pub fn toggle(&self) -> bool {
        !self.active.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn status(&self) -> AgentStatus {
        if self.is_active() {
            AgentStatus::Active
        } else {
            AgentStatus::Inactive
        }
    }

    pub fn last_thought(&self) -> Option<String> {
        self.last_thought
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_thought(&self, thought: impl Into<String>) {
        *self.last_thought.lock().unwrap_or_else(|e| e.into_inner()) = Some(thought.into());
    }
}

/// Keep the system message plus the newest `max_history` messages, then drop any
/// tool messages left at the front without their originating assistant turn.
pub fn prune_history(messages: &mut Vec<Message>, max_history: usize) {
    let kept = messages.len().saturating_sub(1);
    if kept > max_history {
        let excess = kept - max_history;
        messages.drain(1..1 + excess);
    }

    while messages.len() > 1 && messages[1].role == Role::Tool {
        messages.remove(1);
    }
}

/// Turn a provider failure into the text the caller sees.
pub fn classify_provider_error(error: &ProviderError) -> String {
    let text = error.to_string();
    let lowered = text.to_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        CONFIG_INVALID_MESSAGE.to_string()
    } else {
        format!("Error during thought process: {}", text)
    }
}

/// One conversational context with its own history, tools and model binding.
pub struct Agent {
    name: String,
    role: String,
    model: String,
    messages: Vec<Message>,
    tools: ToolRegistry,
    factory: Arc<dyn ProviderFactory>,
    presence: Arc<AgentPresence>,
    max_history: usize,
    max_turns: usize,
}

impl Agent {
    pub fn new(
        name: &str,
        role: &str,
        prompt: &str,
        model: &str,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        let system = format!("You are {}, a {}. {}", name, role, prompt);
        Self {
            name: name.to_string(),
            role: role.to_string(),
            model: model.to_string(),
            messages: vec![Message::system(system)],
            tools: ToolRegistry::new(),
            factory,
            presence: Arc::new(AgentPresence::new()),
            max_history: DEFAULT_MAX_HISTORY,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_limits(mut self, max_history: usize, max_turns: usize) -> Self {
        self.max_history = max_history;
        self.max_turns = max_turns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Bind a different model; the next request resolves its backend.
    pub fn set_model(&mut self, model: &str) {
        tracing::info!(agent = %self.name, model = %model, "agent model updated");
        self.model = model.to_string();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        self.tools.definitions()
    }

    pub fn register_tool(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        self.tools.register(definition, handler);
    }

    pub fn presence(&self) -> Arc<AgentPresence> {
        Arc::clone(&self.presence)
    }

    pub fn is_active(&self) -> bool {
        self.presence.is_active()
    }

    pub fn inactive_message(&self) -> String {
        format!("Error: Agent '{}' is inactive.", self.name)
    }

    /// Apply the history cap to this agent's conversation.
    pub fn prune(&mut self) {
        prune_history(&mut self.messages, self.max_history);
    }

    /// Append a user turn (with any attachments) and run the think loop.
    pub async fn chat(&mut self, message: &str, attachments: &[Attachment]) -> String {
        if !self.is_active() {
            return self.inactive_message();
        }

        self.messages
            .push(Message::user_with_attachments(message, attachments));
        self.think().await
    }

    /// Run the think loop over the current history until the model answers, the
    /// turn budget runs out, or the provider fails.
    pub async fn think(&mut self) -> String {
        if !self.is_active() {
            return self.inactive_message();
        }

        let outcome = match self.run_turns().await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(agent = %self.name, model = %self.model, error = %e, "provider call failed");
                classify_provider_error(&e)
            }
        };

        self.presence.set_thought(outcome.clone());
        outcome
    }

    async fn run_turns(&mut self) -> Result<String, ProviderError> {
        let mut turns_left = self.max_turns;

        loop {
            if turns_left == 0 {
                tracing::warn!(agent = %self.name, "max turns reached");
                return Ok(MAX_TURNS_MESSAGE.to_string());
            }

            self.prune();

            let provider = self.factory.create(&self.model)?;
            let tools = (!self.tools.is_empty()).then(|| self.tools.definitions());

            tracing::debug!(
                agent = %self.name,
                provider = %provider.provider_name(),
                model = %provider.model_name(),
                turns_left,
                history = self.messages.len(),
                "requesting completion"
            );

            let response = provider.chat(&self.messages, tools).await?;

            if response.has_tool_calls() {
                let calls = response.tool_calls;
                let names: Vec<String> = calls.iter().map(|c| c.name.clone()).collect();
                self.presence
                    .set_thought(format!("Calling tools: {}", names.join(", ")));
                tracing::info!(agent = %self.name, tools = ?names, "model requested tools");

                self.messages
                    .push(Message::assistant_tool_calls(response.content, calls.clone()));
                let results = self.tools.dispatch(&calls).await;
                self.messages.extend(results);

                turns_left -= 1;
                continue;
            }

            return match response.content {
                Some(content) if !content.is_empty() => {
                    self.messages.push(Message::assistant(content.clone()));
                    Ok(content)
                }
                _ => {
                    tracing::warn!(agent = %self.name, "model returned neither text nor tool calls");
                    Ok(EMPTY_RESPONSE_MESSAGE.to_string())
                }
            };
        }
    }
}
