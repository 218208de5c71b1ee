// ABOUTME: Defines the ChatProvider trait that all LLM provider adapters must implement.
// ABOUTME: Also defines LlmResponse (what a backend returns) and ProviderError (what can go wrong).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use opencore_core::{Message, ToolCallRequest, ToolDefinition};

/// Canonical reply from any backend: text, tool calls, or both.
///
/// When both are present the caller treats the turn as "calls pending" and the
/// text is recorded alongside the calls rather than returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Errors raised by a provider adapter. They reach the agent unmodified; the
/// agent decides how to present them.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait that every backend adapter implements. Each adapter (OpenAI-compatible,
/// Anthropic, Gemini) translates the canonical history and tool list into its own
/// wire format and parses the reply back into an `LlmResponse`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the full history (system message first) and optional tool list.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError>;

    /// Provider name for logging and display (e.g. "anthropic", "openai").
    fn provider_name(&self) -> &str;

    /// Model identifier sent to the backend (e.g. "gpt-4o").
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let errors = vec![
            ProviderError::MissingCredentials("OPENAI_API_KEY not set".to_string()),
            ProviderError::Authentication("check ANTHROPIC_API_KEY".to_string()),
            ProviderError::RateLimited,
            ProviderError::Server("502 Bad Gateway".to_string()),
            ProviderError::Api {
                status: 400,
                body: "bad request".to_string(),
            },
            ProviderError::Transport("connection refused".to_string()),
            ProviderError::InvalidResponse("missing choices".to_string()),
        ];

        for err in &errors {
            assert!(!err.to_string().is_empty());
        }

        assert_eq!(
            ProviderError::Api {
                status: 400,
                body: "bad request".to_string()
            }
            .to_string(),
            "API error 400: bad request"
        );
    }

    #[test]
    fn response_constructors() {
        assert!(!LlmResponse::text("hi").has_tool_calls());
        assert!(LlmResponse::empty().content.is_none());

        let calls = LlmResponse::calls(vec![ToolCallRequest::new("1", "t", "{}")]);
        assert!(calls.has_tool_calls());
        assert!(calls.content.is_none());
    }
}
