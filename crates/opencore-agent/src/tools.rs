// ABOUTME: Per-agent tool registry: named handlers paired with the definitions advertised to the model.
// ABOUTME: Dispatch turns every tool call into exactly one tool message, converting failures into text.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};

use opencore_core::{Message, ToolCallRequest, ToolDefinition};

/// Decoded tool arguments.
pub type ToolArgs = Map<String, Value>;

/// A callable tool. Handlers receive decoded keyword arguments and return text
/// for the model; errors are reported back to the model rather than aborting.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String>;
}

/// Adapter that turns a synchronous closure into a `ToolHandler`.
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(ToolArgs) -> anyhow::Result<String> + Send + Sync,
{
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        (self.0)(args)
    }
}

/// Tools available to one agent. Names are unique; re-registering a name replaces
/// both its handler and its definition, keeping the original position.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        let name = definition.name.clone();
        match self.definitions.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
        self.handlers.insert(name, handler);
    }

    /// Register a synchronous closure as a tool.
    pub fn register_fn<F>(&mut self, definition: ToolDefinition, f: F)
    where
        F: Fn(ToolArgs) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.register(definition, Arc::new(FnTool(f)));
    }

    /// Definitions in registration order, as advertised to the model.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Execute one call and produce its tool message.
    pub async fn dispatch_one(&self, call: &ToolCallRequest) -> Message {
        let args = match normalize_tool_call(call) {
            Ok(args) => args,
            Err(detail) => {
                tracing::warn!(tool = %call.name, error = %detail, "tool arguments failed to decode");
                return Message::tool(
                    &call.id,
                    format!(
                        "Error: Failed to decode arguments for tool '{}': {}",
                        call.name, detail
                    ),
                );
            }
        };

        let Some(handler) = self.handlers.get(&call.name) else {
            tracing::warn!(tool = %call.name, "model requested unknown tool");
            return Message::tool(&call.id, format!("Error: Tool {} not found.", call.name));
        };

        tracing::info!(tool = %call.name, call_id = %call.id, "executing tool");

        let outcome = AssertUnwindSafe(handler.call(args)).catch_unwind().await;
        let content = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "tool failed");
                format!("Error executing {}: {}", call.name, e)
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(tool = %call.name, panic = %detail, "tool panicked");
                format!("Error executing {}: {}", call.name, detail)
            }
        };

        Message::tool(&call.id, content)
    }

    /// Execute calls sequentially in the order given, one tool message per call.
    pub async fn dispatch(&self, calls: &[ToolCallRequest]) -> Vec<Message> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch_one(call).await);
        }
        results
    }
}

/// Decode a call's argument string. Empty input is an empty argument set; anything
/// that is not a JSON object is rejected with a description of the problem.
pub fn normalize_tool_call(call: &ToolCallRequest) -> Result<ToolArgs, String> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a ToolArgs, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing required argument '{}'", key))
}

/// Fetch an optional string argument, treating blanks as absent.
pub fn optional_str<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "tool panicked".to_string()
    }
}
