// ABOUTME: Resolves a model identifier into a configured provider adapter.
// ABOUTME: Routing is by model prefix; credentials come from ProviderSettings at request time.

use std::sync::Arc;

use crate::config::{DEFAULT_OLLAMA_BASE, ProviderSettings};
use crate::providers::{AnthropicProvider, Backend, GeminiProvider, OpenAiProvider, anthropic, gemini, openai};
use crate::runtime::{ChatProvider, ProviderError};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const XAI_BASE_URL: &str = "https://api.x.ai/v1";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const QWEN_PORTAL_BASE_URL: &str = "https://portal.qwen.ai/v1";
const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const OLLAMA_DUMMY_KEY: &str = "ollama";

/// Which wire protocol a route speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Anthropic,
    Gemini,
}

/// Everything needed to build an adapter for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub kind: BackendKind,
    /// Vendor label for logging (e.g. "groq").
    pub provider: &'static str,
    /// Model name as the vendor expects it, routing prefix removed.
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    /// Variable the operator sets to supply `api_key`.
    pub key_var: &'static str,
}

impl ModelRoute {
    pub fn into_backend(self) -> Backend {
        match self.kind {
            BackendKind::OpenAi => Backend::OpenAi(
                OpenAiProvider::new(self.api_key, self.base_url, self.model)
                    .with_provider(self.provider, self.key_var),
            ),
            BackendKind::Anthropic => {
                Backend::Anthropic(AnthropicProvider::new(self.api_key, self.base_url, self.model))
            }
            BackendKind::Gemini => {
                Backend::Gemini(GeminiProvider::new(self.api_key, self.base_url, self.model))
            }
        }
    }
}

fn require(key: &Option<String>, var: &str) -> Result<String, ProviderError> {
    key.clone()
        .ok_or_else(|| ProviderError::MissingCredentials(format!("{} not set", var)))
}

fn strip_route<'a>(model: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| model.strip_prefix(prefix))
}

/// Decide which backend serves `model` and gather its credentials.
///
/// Prefixes: `anthropic/`, `gemini/` or `google/`, `groq/`, `xai/`, `mistral/`,
/// `dashscope/` or `qwen/`, `ollama/`, `openai/`. Bare `gpt-` names and anything
/// unrecognised go to the OpenAI-compatible endpoint.
pub fn resolve_model(model: &str, settings: &ProviderSettings) -> Result<ModelRoute, ProviderError> {
    let openai_compatible =
        |provider: &'static str, key_var: &'static str, api_key: String, base_url: String, name: &str| {
            ModelRoute {
                kind: BackendKind::OpenAi,
                provider,
                model: name.to_string(),
                api_key,
                base_url,
                key_var,
            }
        };

    if let Some(name) = strip_route(model, &["anthropic/"]) {
        return Ok(ModelRoute {
            kind: BackendKind::Anthropic,
            provider: "anthropic",
            model: name.to_string(),
            api_key: require(&settings.anthropic_api_key, "ANTHROPIC_API_KEY")?,
            base_url: settings
                .anthropic_base_url
                .clone()
                .unwrap_or_else(|| anthropic::DEFAULT_BASE_URL.to_string()),
            key_var: "ANTHROPIC_API_KEY",
        });
    }

    if let Some(name) = strip_route(model, &["gemini/", "google/"]) {
        return Ok(ModelRoute {
            kind: BackendKind::Gemini,
            provider: "gemini",
            model: name.to_string(),
            api_key: require(&settings.gemini_api_key, "GEMINI_API_KEY")?,
            base_url: settings
                .gemini_base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
            key_var: "GEMINI_API_KEY",
        });
    }

    if let Some(name) = strip_route(model, &["groq/"]) {
        let key = require(&settings.groq_api_key, "GROQ_API_KEY")?;
        return Ok(openai_compatible("groq", "GROQ_API_KEY", key, GROQ_BASE_URL.to_string(), name));
    }

    if let Some(name) = strip_route(model, &["xai/"]) {
        let key = require(&settings.xai_api_key, "XAI_API_KEY")?;
        return Ok(openai_compatible("xai", "XAI_API_KEY", key, XAI_BASE_URL.to_string(), name));
    }

    if let Some(name) = strip_route(model, &["mistral/"]) {
        let key = require(&settings.mistral_api_key, "MISTRAL_API_KEY")?;
        return Ok(openai_compatible(
            "mistral",
            "MISTRAL_API_KEY",
            key,
            MISTRAL_BASE_URL.to_string(),
            name,
        ));
    }

    if let Some(name) = strip_route(model, &["dashscope/", "qwen/"]) {
        // A Qwen portal token takes precedence over a DashScope key.
        if let Some(token) = settings.qwen_access_token.clone() {
            return Ok(openai_compatible(
                "qwen",
                "QWEN_ACCESS_TOKEN",
                token,
                QWEN_PORTAL_BASE_URL.to_string(),
                name,
            ));
        }
        let key = require(&settings.dashscope_api_key, "DASHSCOPE_API_KEY")?;
        return Ok(openai_compatible(
            "dashscope",
            "DASHSCOPE_API_KEY",
            key,
            DASHSCOPE_BASE_URL.to_string(),
            name,
        ));
    }

    if let Some(name) = strip_route(model, &["ollama/"]) {
        let base_url = settings
            .ollama_api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string());
        return Ok(openai_compatible(
            "ollama",
            "OLLAMA_API_BASE",
            OLLAMA_DUMMY_KEY.to_string(),
            base_url,
            name,
        ));
    }

    let name = strip_route(model, &["openai/"]).unwrap_or(model);
    let key = require(&settings.openai_api_key, "OPENAI_API_KEY")?;
    let base_url = settings
        .openai_base_url
        .clone()
        .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
    Ok(openai_compatible("openai", "OPENAI_API_KEY", key, base_url, name))
}

/// Builds a provider for a model identifier. Agents call this on every request so
/// that model and credential changes take effect on the next turn.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, model: &str) -> Result<Arc<dyn ChatProvider>, ProviderError>;
}

/// Factory backed by `ProviderSettings`, normally loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvProviderFactory {
    settings: ProviderSettings,
}

impl EnvProviderFactory {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env())
    }
}

impl ProviderFactory for EnvProviderFactory {
    fn create(&self, model: &str) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let route = resolve_model(model, &self.settings)?;
        tracing::debug!(
            model = %model,
            provider = route.provider,
            base_url = %route.base_url,
            "resolved model route"
        );
        Ok(Arc::new(route.into_backend()))
    }
}
