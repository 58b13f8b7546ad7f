//! OpenAIGateway - Direct REST API implementation for OpenAI chat models.
//!
//! Calls `GET /models` and `POST /chat/completions` with bearer auth.
//! The base URL is configurable so OpenAI-compatible servers work too.

use agentdesk_core::config::{DEFAULT_OPENAI_BASE_URL, OpenAISettings};
use agentdesk_core::gateway::{Gateway, GatewayError, GatewayKind, ModelId};
use agentdesk_core::session::{ChatMessage, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http_error::{error_from_response, map_transport_error};

const PROVIDER: &str = "OpenAI";

/// Gateway implementation that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAIGateway {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAIGateway {
    /// Creates a gateway for the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            max_tokens: None,
        }
    }

    /// Builds a gateway from settings; `None` when no API key is configured.
    pub fn from_settings(settings: &OpenAISettings) -> Option<Self> {
        let api_key = settings.api_key.as_ref().filter(|key| !key.trim().is_empty())?;
        Some(Self::new(api_key.clone()).with_base_url(settings.base_url.clone()))
    }

    /// Overrides the API base URL (e.g. `http://localhost:8080/v1`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_messages(history: &[ChatMessage], system_prompt: &str) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.trim().is_empty() {
            messages.push(WireMessage {
                role: MessageRole::System.as_str().to_string(),
                content: system_prompt.to_string(),
            });
        }
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                }),
        );
        messages
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| map_transport_error(PROVIDER, err))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            GatewayError::InvalidResponse(format!("Failed to parse OpenAI response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl Gateway for OpenAIGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::OpenAI
    }

    async fn list_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| map_transport_error(PROVIDER, err))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let parsed: ModelListResponse = response.json().await.map_err(|err| {
            GatewayError::InvalidResponse(format!("Failed to parse OpenAI model list: {err}"))
        })?;

        let mut models: Vec<ModelId> = parsed.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }

    async fn complete(
        &self,
        history: &[ChatMessage],
        model: &str,
        system_prompt: &str,
    ) -> Result<ChatMessage, GatewayError> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: Self::build_messages(history, system_prompt),
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model, messages = request.messages.len(), "Sending OpenAI chat completion");
        let text = self.send_request(&request).await?;
        Ok(ChatMessage::assistant(text))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelListResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, GatewayError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            GatewayError::InvalidResponse("OpenAI API returned no content in the response".into())
        })
}
