// ABOUTME: Google Gemini generateContent adapter implementing the ChatProvider trait.
// ABOUTME: Maps tool turns to function_call/function_response parts and rewrites schemas to Gemini's dialect.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use opencore_core::{Content, ContentPart, Message, Role, ToolCallRequest, ToolDefinition};

use crate::providers::{parse_data_url, send_json, trim_base_url};
use crate::runtime::{ChatProvider, LlmResponse, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const KEY_VAR: &str = "GEMINI_API_KEY";

/// Schema keys Gemini accepts in function declarations. Everything else is dropped.
const SCHEMA_KEYS: &[&str] = &["required", "enum", "description"];

/// Google Gemini runtime adapter. Calls generateContent with function
/// declarations and maps functionCall parts back to canonical tool calls.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new GeminiProvider. A routing prefix such as `gemini/` is stripped
    /// from the model name.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        let model = model
            .strip_prefix("gemini/")
            .or_else(|| model.strip_prefix("google/"))
            .map(String::from)
            .unwrap_or(model);

        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: trim_base_url(base_url),
            model,
        }
    }

    /// Build the JSON request body for the generateContent API.
    pub fn build_request_body(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> Value {
        let mut system_parts = Vec::new();
        let mut contents: Vec<Value> = Vec::new();
        // Gemini answers by function name, so remember which call id used which name.
        let mut call_names: HashMap<&str, &str> = HashMap::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(text) = msg.text()
                        && !text.is_empty()
                    {
                        system_parts.push(json!({"text": text}));
                    }
                }
                Role::User => push_content(&mut contents, "user", user_parts(msg.content.as_ref())),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if let Some(text) = msg.text()
                        && !text.is_empty()
                    {
                        parts.push(json!({"text": text}));
                    }
                    for call in msg.calls() {
                        call_names.insert(call.id.as_str(), call.name.as_str());
                        parts.push(json!({
                            "function_call": {
                                "name": call.name,
                                "args": decode_object(&call.arguments).unwrap_or_else(|| json!({})),
                            }
                        }));
                    }
                    push_content(&mut contents, "model", parts);
                }
                Role::Tool => {
                    let text = msg.text().unwrap_or_default();
                    let name = msg
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| call_names.get(id).copied());
                    match name {
                        Some(name) => {
                            let response = function_response_payload(&text);
                            push_content(
                                &mut contents,
                                "function",
                                vec![json!({
                                    "function_response": {"name": name, "response": response}
                                })],
                            );
                        }
                        None => push_content(
                            &mut contents,
                            "user",
                            vec![json!({"text": format!("Tool result: {}", text)})],
                        ),
                    }
                }
            }
        }

        let mut body = json!({ "contents": contents });

        if !system_parts.is_empty() {
            body["system_instruction"] = json!({ "parts": system_parts });
        }

        if let Some(tools) = tools
            && !tools.is_empty()
        {
            body["tools"] = json!([{ "function_declarations": build_gemini_tools(tools) }]);
        }

        body
    }

    /// Parse a generateContent response into an LlmResponse.
    pub fn parse_response(response_body: &Value) -> Result<LlmResponse, ProviderError> {
        let candidate = response_body
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing candidates in response".to_string())
            })?;

        let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
        else {
            // Blocked or truncated candidates carry no parts.
            return Ok(LlmResponse::empty());
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in parts {
            if let Some(chunk) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(chunk);
            }

            let function_call = part.get("functionCall").or_else(|| part.get("function_call"));
            if let Some(call) = function_call
                && let Some(name) = call.get("name").and_then(|n| n.as_str())
            {
                let args = call
                    .get("args")
                    .filter(|a| !a.is_null())
                    .map(Value::to_string)
                    .unwrap_or_else(|| "{}".to_string());
                tool_calls.push(ToolCallRequest::with_generated_id(name, args));
            }
        }

        Ok(LlmResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
        })
    }
}

fn decode_object(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
}

/// Tool output as a `function_response` payload: JSON objects pass through, other
/// JSON values and plain text are wrapped under `result`.
fn function_response_payload(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(value) => json!({ "result": value }),
        Err(_) => json!({ "result": text }),
    }
}

fn user_parts(content: Option<&Content>) -> Vec<Value> {
    match content {
        None => Vec::new(),
        Some(Content::Text(text)) if text.is_empty() => Vec::new(),
        Some(Content::Text(text)) => vec![json!({"text": text})],
        Some(Content::Parts(parts)) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({"text": text}),
                ContentPart::ImageUrl { image_url } => match parse_data_url(&image_url.url) {
                    Some((mime_type, data)) => json!({
                        "inline_data": {"mime_type": mime_type, "data": data}
                    }),
                    None => json!({"text": image_url.url}),
                },
            })
            .collect(),
    }
}

/// Append parts as a content entry, merging into the previous entry when the role
/// repeats so consecutive function responses travel in one turn.
fn push_content(contents: &mut Vec<Value>, role: &str, parts: Vec<Value>) {
    if parts.is_empty() {
        return;
    }

    if let Some(last) = contents.last_mut()
        && last.get("role").and_then(|r| r.as_str()) == Some(role)
        && let Some(existing) = last.get_mut("parts").and_then(|p| p.as_array_mut())
    {
        existing.extend(parts);
        return;
    }

    contents.push(json!({"role": role, "parts": parts}));
}

/// Convert tool definitions to Gemini function declarations.
fn build_gemini_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            let mut declaration = json!({
                "name": tool.name,
                "description": tool.description,
            });
            let parameters = transform_schema(&tool.parameters);
            // Gemini rejects OBJECT schemas without properties; parameterless tools omit them.
            let has_properties = parameters
                .get("properties")
                .and_then(|p| p.as_object())
                .is_some_and(|p| !p.is_empty());
            if has_properties {
                declaration["parameters"] = parameters;
            }
            declaration
        })
        .collect()
}

/// Rewrite a JSON schema into Gemini's dialect: upper-case type names and only the
/// keys Gemini understands, applied recursively through properties and items.
pub fn transform_schema(schema: &Value) -> Value {
    let Some(source) = schema.as_object() else {
        return schema.clone();
    };

    let mut out = Map::new();

    if let Some(kind) = source.get("type").and_then(|t| t.as_str()) {
        out.insert("type".to_string(), Value::String(kind.to_uppercase()));
    }

    if let Some(properties) = source.get("properties").and_then(|p| p.as_object()) {
        let transformed: Map<String, Value> = properties
            .iter()
            .map(|(name, prop)| (name.clone(), transform_schema(prop)))
            .collect();
        out.insert("properties".to_string(), Value::Object(transformed));
    }

    if let Some(items) = source.get("items") {
        out.insert("items".to_string(), transform_schema(items));
    }

    for key in SCHEMA_KEYS {
        if let Some(value) = source.get(*key) {
            out.insert(key.to_string(), value.clone());
        }
    }

    Value::Object(out)
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError> {
        let body = self.build_request_body(messages, tools);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        tracing::debug!(provider = "gemini", model = %self.model, "sending generateContent request");

        let request = self.client.post(&url).header("x-goog-api-key", &self.api_key);
        let response_body = send_json(request, &body, KEY_VAR).await?;

        Self::parse_response(&response_body)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
