// ABOUTME: Test utilities for opencore-agent, including a scripted provider and a fixed factory.
// ABOUTME: Used in tests to drive agents and swarms without real API calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use opencore_core::{Message, ToolCallRequest, ToolDefinition};

use crate::client::ProviderFactory;
use crate::runtime::{ChatProvider, LlmResponse, ProviderError};

/// One request observed by a `ScriptedProvider`.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

impl RecordedRequest {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Text of the most recent message in the request.
    pub fn last_text(&self) -> Option<String> {
        self.messages.last().and_then(Message::text)
    }
}

/// A provider that replays queued responses in order and records every request.
///
/// Because delegation is sequential, one script shared by a whole swarm yields a
/// deterministic interleaving: each `chat` consumes the next queued response no
/// matter which agent sends it. An exhausted script answers with an error.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<LlmResponse, ProviderError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(LlmResponse::text(text)));
        self
    }

    /// Queue a reply requesting a single tool call.
    pub fn call(self, id: &str, name: &str, arguments: serde_json::Value) -> Self {
        let call = ToolCallRequest::new(id, name, arguments.to_string());
        self.push(Ok(LlmResponse::calls(vec![call])));
        self
    }

    /// Queue an arbitrary response.
    pub fn respond(self, response: LlmResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queue a provider failure.
    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, reply: Result<LlmResponse, ProviderError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.map(<[ToolDefinition]>::to_vec).unwrap_or_default(),
            });

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::InvalidResponse(
                    "no scripted response left".to_string(),
                ))
            })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Factory that hands out the same provider for every model and remembers which
/// models were requested.
pub struct StaticProviderFactory {
    provider: Arc<dyn ChatProvider>,
    models: Mutex<Vec<String>>,
}

impl StaticProviderFactory {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            models: Mutex::new(Vec::new()),
        }
    }

    /// Model identifiers resolved so far, in request order.
    pub fn requested_models(&self) -> Vec<String> {
        self.models.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProviderFactory for StaticProviderFactory {
    fn create(&self, model: &str) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        self.models
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(model.to_string());
        Ok(Arc::clone(&self.provider))
    }
}
