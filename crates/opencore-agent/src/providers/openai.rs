// ABOUTME: OpenAI-compatible Chat Completions adapter implementing the ChatProvider trait.
// ABOUTME: Also serves Groq, xAI, Mistral, DashScope/Qwen and Ollama, which speak the same protocol.

use async_trait::async_trait;
use serde_json::{Value, json};

use opencore_core::{Message, ToolCallRequest, ToolDefinition};

use crate::providers::{send_json, trim_base_url};
use crate::runtime::{ChatProvider, LlmResponse, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible adapter. The canonical history already uses this wire
/// shape, so requests are a straight serialization.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    provider: String,
    key_var: String,
}

impl OpenAiProvider {
    /// Create a new OpenAiProvider with explicit configuration.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: trim_base_url(base_url),
            model,
            provider: "openai".to_string(),
            key_var: "OPENAI_API_KEY".to_string(),
        }
    }

    /// Label this adapter as a compatible vendor (e.g. "groq") whose key lives in `key_var`.
    pub fn with_provider(mut self, provider: &str, key_var: &str) -> Self {
        self.provider = provider.to_string();
        self.key_var = key_var.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(tools) = tools
            && !tools.is_empty()
        {
            let defs: Vec<Value> = tools.iter().map(ToolDefinition::to_openai_value).collect();
            body["tools"] = Value::Array(defs);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse a Chat Completions response into an LlmResponse.
    pub fn parse_response(response_body: &Value) -> Result<LlmResponse, ProviderError> {
        let message = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing choices[0].message in response".to_string())
            })?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .filter(|text| !text.is_empty())
            .map(String::from);

        let tool_calls = message
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .map(|calls| calls.iter().filter_map(ToolCallRequest::from_value).collect())
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError> {
        let body = self.build_request_body(messages, tools);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(provider = %self.provider, model = %self.model, "sending chat completion");

        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let response_body = send_json(request, &body, &self.key_var).await?;

        Self::parse_response(&response_body)
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "test-key".to_string(),
            base_url.to_string(),
            "gpt-4o".to_string(),
        )
    }

    #[test]
    fn openai_provider_creation() {
        let p = provider("https://api.openai.com/v1/");
        assert_eq!(p.provider_name(), "openai");
        assert_eq!(p.model_name(), "gpt-4o");
        assert_eq!(p.base_url(), "https://api.openai.com/v1");

        let groq = provider("https://api.groq.com/openai/v1").with_provider("groq", "GROQ_API_KEY");
        assert_eq!(groq.provider_name(), "groq");
        assert_eq!(groq.key_var, "GROQ_API_KEY");
    }

    #[test]
    fn openai_builds_request_body_with_tools() {
        let p = provider(DEFAULT_BASE_URL);
        let messages = vec![Message::system("You are Bot."), Message::user("Hello")];
        let tools = vec![ToolDefinition::without_parameters("list_agents", "List agents.")];

        let body = p.build_request_body(&messages, Some(&tools));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "list_agents");
    }

    #[test]
    fn openai_omits_tools_when_none_offered() {
        let p = provider(DEFAULT_BASE_URL);
        let body = p.build_request_body(&[Message::user("hi")], None);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());

        let body = p.build_request_body(&[Message::user("hi")], Some(&[]));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn openai_replays_tool_turns() {
        let p = provider(DEFAULT_BASE_URL);
        let messages = vec![
            Message::system("sys"),
            Message::user("who is there?"),
            Message::assistant_tool_calls(None, vec![ToolCallRequest::new("c1", "list_agents", "{}")]),
            Message::tool("c1", "Manager"),
        ];

        let body = p.build_request_body(&messages, None);
        assert_eq!(body["messages"][2]["tool_calls"][0]["id"], "c1");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "c1");
    }

    #[test]
    fn openai_parses_text_response() {
        let response = json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello there", "tool_calls": null},
                "finish_reason": "stop"
            }]
        });

        let parsed = OpenAiProvider::parse_response(&response).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("Hello there"));
        assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn openai_parses_tool_call_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "delegate_task",
                            "arguments": "{\"to_agent\": \"Coder\", \"task\": \"write\"}"
                        }
                    }]
                }
            }]
        });

        let parsed = OpenAiProvider::parse_response(&response).unwrap();
        assert!(parsed.content.is_none());
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].id, "call_abc");
        assert_eq!(parsed.tool_calls[0].name, "delegate_task");
        assert!(parsed.tool_calls[0].arguments.contains("Coder"));
    }

    #[test]
    fn openai_rejects_missing_choices() {
        let result = OpenAiProvider::parse_response(&json!({"error": "nope"}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));

        let result = OpenAiProvider::parse_response(&json!({"choices": []}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn openai_chat_round_trip_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "pong"}}]
            })))
            .mount(&server)
            .await;

        let p = provider(&format!("{}/v1", server.uri()));
        let reply = p.chat(&[Message::user("ping")], None).await.unwrap();
        assert_eq!(reply.content.as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn openai_unauthorized_names_key_variable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let p = provider(&server.uri()).with_provider("xai", "XAI_API_KEY");
        let err = p.chat(&[Message::user("ping")], None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
        assert!(err.to_string().contains("XAI_API_KEY"));
    }

    #[tokio::test]
    #[cfg(feature = "live-test")]
    async fn openai_adapter_basic() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
        let p = OpenAiProvider::new(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            "gpt-4o-mini".to_string(),
        );

        let result = p.chat(&[Message::user("Say hello in one word.")], None).await;
        assert!(result.is_ok(), "live test failed: {:?}", result.err());
    }
}
