// ABOUTME: Anthropic Messages API adapter implementing the ChatProvider trait.
// ABOUTME: Replays tool turns as tool_use/tool_result blocks and merges consecutive same-role turns.

use async_trait::async_trait;
use serde_json::{Value, json};

use opencore_core::{Content, ContentPart, Message, Role, ToolCallRequest, ToolDefinition};

use crate::providers::{parse_data_url, send_json, trim_base_url};
use crate::runtime::{ChatProvider, LlmResponse, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Anthropic runtime adapter. Calls the Messages API with tool definitions and
/// maps tool_use blocks back to canonical tool calls.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    /// Create a new AnthropicProvider with explicit configuration.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: trim_base_url(base_url),
            model,
        }
    }

    /// Build the JSON request body for the Anthropic Messages API.
    pub fn build_request_body(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> Value {
        let mut system_parts = Vec::new();
        let mut turns: Vec<Value> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(text) = msg.text()
                        && !text.is_empty()
                    {
                        system_parts.push(text);
                    }
                }
                Role::User => push_turn(&mut turns, "user", user_blocks(msg.content.as_ref())),
                Role::Assistant => push_turn(&mut turns, "assistant", assistant_blocks(msg)),
                Role::Tool => push_turn(&mut turns, "user", vec![tool_result_block(msg)]),
            }
        }

        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": turns,
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }

        if let Some(tools) = tools
            && !tools.is_empty()
        {
            body["tools"] = Value::Array(build_anthropic_tools(tools));
        }

        body
    }

    /// Parse an Anthropic Messages API response into an LlmResponse.
    pub fn parse_response(response_body: &Value) -> Result<LlmResponse, ProviderError> {
        let content = response_body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing content array in response".to_string())
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in content {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(chunk) = block.get("text").and_then(|t| t.as_str()) {
                        text.push_str(chunk);
                    }
                }
                Some("tool_use") => {
                    let Some(name) = block.get("name").and_then(|n| n.as_str()) else {
                        tracing::warn!("skipping tool_use block without a name");
                        continue;
                    };
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    let call = match block.get("id").and_then(|i| i.as_str()) {
                        Some(id) if !id.is_empty() => {
                            ToolCallRequest::new(id, name, input.to_string())
                        }
                        _ => ToolCallRequest::with_generated_id(name, input.to_string()),
                    };
                    tool_calls.push(call);
                }
                _ => {}
            }
        }

        Ok(LlmResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
        })
    }
}

/// Convert tool definitions to Anthropic's tool format.
fn build_anthropic_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameters,
            })
        })
        .collect()
}

fn text_block(text: &str) -> Value {
    json!({"type": "text", "text": text})
}

fn image_block(url: &str) -> Value {
    match parse_data_url(url) {
        Some((media_type, data)) => json!({
            "type": "image",
            "source": {"type": "base64", "media_type": media_type, "data": data}
        }),
        None => json!({
            "type": "image",
            "source": {"type": "url", "url": url}
        }),
    }
}

fn user_blocks(content: Option<&Content>) -> Vec<Value> {
    match content {
        None => Vec::new(),
        Some(Content::Text(text)) if text.is_empty() => Vec::new(),
        Some(Content::Text(text)) => vec![text_block(text)],
        Some(Content::Parts(parts)) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text_block(text),
                ContentPart::ImageUrl { image_url } => image_block(&image_url.url),
            })
            .collect(),
    }
}

fn assistant_blocks(msg: &Message) -> Vec<Value> {
    let mut blocks = Vec::new();

    if let Some(text) = msg.text()
        && !text.is_empty()
    {
        blocks.push(text_block(&text));
    }

    for call in msg.calls() {
        let input = serde_json::from_str::<Value>(&call.arguments)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}));
        blocks.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.name,
            "input": input,
        }));
    }

    blocks
}

fn tool_result_block(msg: &Message) -> Value {
    json!({
        "type": "tool_result",
        "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
        "content": msg.text().unwrap_or_default(),
    })
}

/// Append content blocks as a turn, merging into the previous turn when the role
/// repeats. The Messages API requires alternating user/assistant turns.
fn push_turn(turns: &mut Vec<Value>, role: &str, blocks: Vec<Value>) {
    if blocks.is_empty() {
        return;
    }

    if let Some(last) = turns.last_mut()
        && last.get("role").and_then(|r| r.as_str()) == Some(role)
        && let Some(content) = last.get_mut("content").and_then(|c| c.as_array_mut())
    {
        content.extend(blocks);
        return;
    }

    turns.push(json!({"role": role, "content": blocks}));
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError> {
        let body = self.build_request_body(messages, tools);
        let url = format!("{}/v1/messages", self.base_url);

        tracing::debug!(provider = "anthropic", model = %self.model, "sending messages request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let response_body = send_json(request, &body, KEY_VAR).await?;

        Self::parse_response(&response_body)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
