// ABOUTME: Provider module aggregating all LLM backend adapters.
// ABOUTME: Holds the closed Backend enum plus the HTTP and data-URL helpers the adapters share.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;

use opencore_core::{Message, ToolDefinition};

use crate::runtime::{ChatProvider, LlmResponse, ProviderError};

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// The closed set of wire protocols a model can be routed to.
pub enum Backend {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    Gemini(GeminiProvider),
}

impl Backend {
    fn inner(&self) -> &dyn ChatProvider {
        match self {
            Backend::OpenAi(provider) => provider,
            Backend::Anthropic(provider) => provider,
            Backend::Gemini(provider) => provider,
        }
    }
}

#[async_trait]
impl ChatProvider for Backend {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError> {
        self.inner().chat(messages, tools).await
    }

    fn provider_name(&self) -> &str {
        self.inner().provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner().model_name()
    }
}

/// Send a prepared JSON request and map the HTTP outcome onto `ProviderError`.
///
/// `key_var` names the credential variable so authentication failures tell the
/// operator which setting to fix.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    key_var: &str,
) -> Result<Value, ProviderError> {
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Authentication(format!(
            "Unauthorized: check {}",
            key_var
        )));
    }

    if status.is_server_error() {
        return Err(ProviderError::Server(status.to_string()));
    }

    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body: error_body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse JSON: {}", e)))
}

/// Split a `data:<mime>;base64,<payload>` URL into its media type and payload.
/// Returns `None` for anything that is not a base64 data URL.
pub(crate) fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type, data))
}

/// Remove a trailing slash so `{base}/path` joins cleanly.
pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    let mut base: String = base_url.into();
    while base.ends_with('/') {
        base.pop();
    }
    base
}
