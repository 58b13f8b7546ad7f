//! HTTP error mapping shared by the REST gateways.

use std::time::Duration;

use agentdesk_core::gateway::GatewayError;
use reqwest::{StatusCode, header::HeaderValue};
use serde::Deserialize;

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

/// Converts a transport failure into a [`GatewayError`].
pub(crate) fn map_transport_error(provider: &str, err: reqwest::Error) -> GatewayError {
    GatewayError::transport(
        format!("{provider} request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}

/// Converts a non-success HTTP response into a [`GatewayError`].
///
/// Understands both `{"error": {"message": ...}}` and `{"error": "..."}`
/// bodies and falls back to the raw body text.
pub(crate) fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> GatewayError {
    let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .or_else(|_| serde_json::from_str::<OllamaErrorResponse>(&body).map(|w| w.error))
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    GatewayError::Process {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
        retry_after,
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}

/// Reads an error response, mapping status, body and `retry-after`.
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let retry_after = parse_retry_after(response.headers().get("retry-after"));
    let body_text = response
        .text()
        .await
        .unwrap_or_else(|_| format!("Failed to read {provider} error body"));
    map_http_error(status, body_text, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_error_body_is_unwrapped() {
        let err = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error"}}"#.into(),
            None,
        );
        match err {
            GatewayError::Process {
                status_code,
                message,
                is_retryable,
                ..
            } => {
                assert_eq!(status_code, Some(401));
                assert_eq!(message, "Incorrect API key");
                assert!(!is_retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ollama_error_body_is_unwrapped() {
        let err = map_http_error(
            StatusCode::NOT_FOUND,
            r#"{"error":"model 'x' not found"}"#.into(),
            None,
        );
        assert_eq!(err.to_string(), "model 'x' not found");
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down".into(),
            Some(Duration::from_secs(3)),
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let value = HeaderValue::from_static("7");
        assert_eq!(parse_retry_after(Some(&value)), Some(Duration::from_secs(7)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
    }
}
