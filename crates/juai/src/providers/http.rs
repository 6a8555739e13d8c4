//! Shared HTTP plumbing for provider adapters: client construction, response
//! reading and error classification.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::config::HttpConfig;
use crate::error::{AdapterError, ConfigError};

/// Maximum length for provider bodies quoted in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Which side of the lifecycle a call belongs to; 404 means different things
/// on submit and on poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Submit,
    Poll,
}

pub fn create_http_client(settings: &HttpConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Truncates a provider response body so it can't flood logs or leak large
/// payloads into error messages.
pub fn sanitize_error_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

/// Maps an unsuccessful HTTP status to an adapter error.
pub fn classify_status(provider: &str, status: u16, body: &str, kind: CallKind) -> AdapterError {
    let message = sanitize_error_body(body);
    let provider = provider.to_string();
    match status {
        401 | 402 | 403 => AdapterError::AuthOrQuota {
            provider,
            status,
            message,
        },
        429 | 500..=599 => AdapterError::Transient {
            provider,
            message: format!("HTTP {}: {}", status, message),
        },
        404 if kind == CallKind::Submit => AdapterError::Configuration {
            provider,
            reason: format!("endpoint not found (HTTP 404): {}", message),
        },
        _ => AdapterError::Rejected {
            provider,
            status,
            message,
        },
    }
}

/// Timeouts and connection failures are transient; everything else that
/// happens below HTTP is a protocol problem.
pub fn classify_transport(provider: &str, err: &reqwest::Error) -> AdapterError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        AdapterError::Transient {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    } else {
        AdapterError::Protocol {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Sends a request and returns the decoded JSON body of a 2xx response.
pub async fn send_json(
    provider: &str,
    request: RequestBuilder,
    kind: CallKind,
) -> Result<Value, AdapterError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport(provider, &e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(provider, &e))?;

    if !status.is_success() {
        log::debug!(
            "{} returned HTTP {}: {}",
            provider,
            status,
            sanitize_error_body(&body)
        );
        return Err(classify_status(provider, status.as_u16(), &body, kind));
    }

    parse_body(provider, status, &body)
}

fn parse_body(provider: &str, status: StatusCode, body: &str) -> Result<Value, AdapterError> {
    serde_json::from_str(body).map_err(|e| AdapterError::Protocol {
        provider: provider.to_string(),
        message: format!(
            "invalid JSON in HTTP {} response ({}): {}",
            status.as_u16(),
            e,
            sanitize_error_body(body)
        ),
    })
}

/// Best-effort human message from a provider error body.
pub fn error_message(value: &Value) -> Option<String> {
    crate::providers::extract::first_string(
        value,
        &[
            "/message",
            "/msg",
            "/error/message",
            "/error",
            "/data/error/message",
            "/detail",
        ],
    )
}
