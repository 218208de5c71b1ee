// ABOUTME: Agent engine for opencore: provider adapters, tool dispatch, the think loop and swarm orchestration.
// ABOUTME: Agents hold per-conversation state; the swarm routes delegations between them.

pub mod agent;
pub mod client;
pub mod config;
pub mod providers;
pub mod runtime;
pub mod swarm;
pub mod swarm_tools;
pub mod testing;
pub mod tools;

pub use agent::{Agent, AgentPresence};
pub use client::{EnvProviderFactory, ProviderFactory, resolve_model};
pub use config::{ConfigError, ProviderSettings, SwarmSettings};
pub use runtime::{ChatProvider, LlmResponse, ProviderError};
pub use swarm::{SharedTool, Swarm, SwarmError, WeakSwarm};
pub use tools::{FnTool, ToolArgs, ToolHandler, ToolRegistry};
