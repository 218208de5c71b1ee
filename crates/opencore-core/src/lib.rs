// ABOUTME: Core library for opencore, containing the canonical conversation and topology types.
// ABOUTME: This crate defines the data model shared by the agent engine and provider adapters.

pub mod activity;
pub mod graph;
pub mod message;
pub mod tool;

pub use activity::{ActivityEntry, ActivityKind, Interaction, InteractionLog};
pub use graph::{AgentStatus, GraphData, GraphEdge, GraphNode};
pub use message::{Attachment, Content, ContentPart, ImageUrl, Message, Role, ToolCallRequest};
pub use tool::ToolDefinition;
