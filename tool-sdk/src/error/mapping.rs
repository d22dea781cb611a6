//! Error mapping for upstream APIs
//!
//! Converts non-2xx upstream responses to our normalized ServiceError,
//! keeping the raw body so the relay can hand it back as a diagnostic.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map an OpenAI API error body to a ServiceError
pub fn map_openai_error(
    status: StatusCode,
    json: &Value,
    body: &str,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "openai".to_string();

    let message = match json.get("error") {
        Some(error) => {
            if let Some(error_type) = error.get("type").and_then(|t| t.as_str()) {
                context.add("error_type", error_type);
            }

            if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
                context.error_code = Some(code.to_string());
            }

            error.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown OpenAI error")
                .to_string()
        }
        None => json.get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string(),
    };

    ServiceError::upstream(status.as_u16(), message, body)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(
    status: StatusCode,
    body: &str,
    context: &mut ErrorContext,
) -> ServiceError {
    context.add("category", classify_http_error(status));

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if context.service == "openai" {
            return map_openai_error(status, &json, body, context);
        }

        let message = json.get("message")
            .or_else(|| json.get("error"))
            .and_then(|m| m.as_str())
            .unwrap_or(body);

        return ServiceError::upstream(status.as_u16(), message, body);
    }

    // Fallback to status-based message
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, crate::util::truncate_string(body, 100))
    };

    ServiceError::upstream(status.as_u16(), message, body)
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}
