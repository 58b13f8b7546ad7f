//! OllamaGateway - REST client for a local Ollama server.

use agentdesk_core::config::{DEFAULT_OLLAMA_BASE_URL, OllamaSettings};
use agentdesk_core::gateway::{Gateway, GatewayError, GatewayKind, ModelId};
use agentdesk_core::session::{ChatMessage, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http_error::{error_from_response, map_transport_error};

const PROVIDER: &str = "Ollama";

#[derive(Clone)]
pub struct OllamaGateway {
    client: Client,
    base_url: String,
}

impl OllamaGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &OllamaSettings) -> Self {
        Self::new(settings.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaGateway {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_BASE_URL)
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Ollama
    }

    async fn list_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|err| map_transport_error(PROVIDER, err))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: TagsResponse = response.json().await.map_err(|err| {
            GatewayError::InvalidResponse(format!("Failed to parse Ollama tags: {err}"))
        })?;

        let mut models: Vec<ModelId> = parsed.models.into_iter().map(|m| m.name).collect();
        models.sort();
        Ok(models)
    }

    async fn complete(
        &self,
        history: &[ChatMessage],
        model: &str,
        system_prompt: &str,
    ) -> Result<ChatMessage, GatewayError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.trim().is_empty() {
            messages.push(WireMessage {
                role: MessageRole::System.as_str(),
                content: system_prompt,
            });
        }
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                }),
        );

        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        tracing::debug!(model, messages = request.messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| map_transport_error(PROVIDER, err))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|err| {
            GatewayError::InvalidResponse(format!("Failed to parse Ollama response: {err}"))
        })?;

        Ok(ChatMessage::assistant(parsed.message.content))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}
