// ABOUTME: Configuration loading for the swarm and its provider credentials.
// ABOUTME: Reads environment variables with sensible defaults and validates numeric limits.

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAIN_AGENT: &str = "Manager";
pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434/v1";

/// Model identifiers from older configurations that the backends no longer accept.
const LEGACY_MODELS: &[(&str, &str)] = &[
    ("gemini/gemini-1.5-flash", "gemini/gemini-1.5-flash-latest"),
    ("openai/grok-2-1212", "xai/grok-2-vision-1212"),
];

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: String, value: String },
}

/// Credentials and endpoint overrides for every backend family. All values are
/// opaque strings; a missing key only matters once a model routed to it is used.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub groq_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub dashscope_api_key: Option<String>,
    pub qwen_access_token: Option<String>,
    pub ollama_api_base: Option<String>,
}

impl ProviderSettings {
    /// Load provider settings from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load provider settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL"),
            groq_api_key: get("GROQ_API_KEY"),
            xai_api_key: get("XAI_API_KEY"),
            mistral_api_key: get("MISTRAL_API_KEY"),
            dashscope_api_key: get("DASHSCOPE_API_KEY"),
            qwen_access_token: get("QWEN_ACCESS_TOKEN"),
            ollama_api_base: get("OLLAMA_API_BASE"),
        }
    }
}

/// Swarm-wide settings.
#[derive(Debug, Clone)]
pub struct SwarmSettings {
    pub main_agent_name: String,
    pub default_model: String,
    /// Messages kept per agent, not counting the system message.
    pub max_history: usize,
    /// Provider round-trips allowed per `chat` call.
    pub max_turns: usize,
    pub providers: ProviderSettings,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            main_agent_name: DEFAULT_MAIN_AGENT.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            max_turns: DEFAULT_MAX_TURNS,
            providers: ProviderSettings::default(),
        }
    }
}

impl SwarmSettings {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - LLM_MODEL: default model for new agents (default: gpt-4o)
    /// - MAIN_AGENT_NAME: name of the manager agent (default: Manager)
    /// - MAX_HISTORY: messages retained per agent besides the system prompt (default: 100)
    /// - MAX_TURNS: provider round-trips per chat call (default: 10)
    /// - provider credentials, see `ProviderSettings`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let default_model = get("LLM_MODEL")
            .map(|model| correct_legacy_model(&model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let main_agent_name =
            get("MAIN_AGENT_NAME").unwrap_or_else(|| DEFAULT_MAIN_AGENT.to_string());

        let max_history = parse_count("MAX_HISTORY", get("MAX_HISTORY"), DEFAULT_MAX_HISTORY)?;
        let max_turns = parse_count("MAX_TURNS", get("MAX_TURNS"), DEFAULT_MAX_TURNS)?;

        Ok(Self {
            main_agent_name,
            default_model,
            max_history,
            max_turns,
            providers: ProviderSettings::from_lookup(&lookup),
        })
    }
}

fn parse_count(var: &str, value: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: var.to_string(),
                value: raw,
            }),
    }
}

/// Replace known-broken model identifiers with their working successors.
pub fn correct_legacy_model(model: &str) -> String {
    LEGACY_MODELS
        .iter()
        .find(|(old, _)| *old == model)
        .map(|(_, new)| new.to_string())
        .unwrap_or_else(|| model.to_string())
}
