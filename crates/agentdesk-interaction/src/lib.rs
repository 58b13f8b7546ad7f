//! Gateway implementations that talk to LLM providers over HTTP.

mod gateways;
mod http_error;
pub mod ollama_gateway;
pub mod openai_gateway;

pub use gateways::build_gateways;
pub use ollama_gateway::OllamaGateway;
pub use openai_gateway::OpenAIGateway;
