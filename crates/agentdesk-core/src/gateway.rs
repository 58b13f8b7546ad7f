//! Gateway collaborator contract.
//!
//! A gateway is an external LLM provider integration. The coordination core
//! only ever calls [`Gateway::list_models`] and [`Gateway::complete`];
//! concrete HTTP implementations live in `agentdesk-interaction`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::session::ChatMessage;

/// Identifier of a model as reported by a gateway.
pub type ModelId = String;

/// Supported LLM gateways.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum GatewayKind {
    #[strum(serialize = "OpenAI", ascii_case_insensitive)]
    OpenAI,
    #[strum(serialize = "Ollama", ascii_case_insensitive)]
    Ollama,
}

/// Failure reported by a gateway collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The provider answered with an error or could not be reached.
    #[error("{message}")]
    Process {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },
    /// The provider answered but the payload was unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The gateway is missing credentials or endpoints.
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    /// Creates a Process error without an HTTP status (transport failures).
    pub fn transport(message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Process {
            status_code: None,
            message: message.into(),
            is_retryable,
            retry_after: None,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Process { is_retryable: true, .. })
    }
}

/// External LLM provider used by agents.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Which provider this gateway talks to.
    fn kind(&self) -> GatewayKind;

    /// Models the provider currently offers.
    async fn list_models(&self) -> Result<Vec<ModelId>, GatewayError>;

    /// Produces the assistant reply for `history`.
    ///
    /// `history` holds the conversation after the system prompt, oldest
    /// first, ending with the user message being answered.
    async fn complete(
        &self,
        history: &[ChatMessage],
        model: &str,
        system_prompt: &str,
    ) -> Result<ChatMessage, GatewayError>;
}

/// The gateways available to this process, keyed by provider.
#[derive(Clone, Default)]
pub struct GatewaySet {
    gateways: HashMap<GatewayKind, Arc<dyn Gateway>>,
}

impl GatewaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` under its own kind, replacing any previous one.
    pub fn insert(&mut self, gateway: Arc<dyn Gateway>) {
        self.gateways.insert(gateway.kind(), gateway);
    }

    pub fn with(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.insert(gateway);
        self
    }

    pub fn get(&self, kind: GatewayKind) -> Option<Arc<dyn Gateway>> {
        self.gateways.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<GatewayKind> {
        let mut kinds: Vec<_> = self.gateways.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_string());
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

impl std::fmt::Debug for GatewaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySet").field("kinds", &self.kinds()).finish()
    }
}
