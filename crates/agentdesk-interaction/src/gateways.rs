//! Builds the gateway set from configuration.

use std::sync::Arc;

use agentdesk_core::config::DeskConfig;
use agentdesk_core::gateway::GatewaySet;

use crate::ollama_gateway::OllamaGateway;
use crate::openai_gateway::OpenAIGateway;

/// Instantiates every gateway the configuration allows.
///
/// Ollama is always offered. OpenAI is only offered when an API key is set.
pub fn build_gateways(config: &DeskConfig) -> GatewaySet {
    let mut gateways = GatewaySet::new();
    gateways.insert(Arc::new(OllamaGateway::from_settings(&config.ollama)));

    match OpenAIGateway::from_settings(&config.openai) {
        Some(openai) => gateways.insert(Arc::new(openai)),
        None => tracing::info!("OPENAI_API_KEY not set; OpenAI gateway disabled"),
    }

    gateways
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_core::gateway::GatewayKind;

    #[test]
    fn test_openai_requires_api_key() {
        let gateways = build_gateways(&DeskConfig::default());
        assert_eq!(gateways.kinds(), vec![GatewayKind::Ollama]);

        let mut config = DeskConfig::default();
        config.openai.api_key = Some("sk-test".into());
        let gateways = build_gateways(&config);
        assert_eq!(gateways.kinds(), vec![GatewayKind::Ollama, GatewayKind::OpenAI]);
    }
}
