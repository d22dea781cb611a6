//! Common utilities for service clients
//!
//! This module provides shared response handling for all service clients.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::{Result, ServiceError, ErrorContext};
use crate::util::{sanitize_for_logging, truncate_string};

/// Longest body excerpt written to logs
const LOG_BODY_LIMIT: usize = 512;

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "Heuristic-Relay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("tool-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Create error context for HTTP requests
pub fn create_error_context(
    service_name: &str,
    endpoint: &str,
    status: Option<reqwest::StatusCode>,
) -> ErrorContext {
    let mut context = ErrorContext::for_service(service_name).endpoint(endpoint);

    if let Some(status_code) = status {
        context = context.status_code(status_code.as_u16());
    }

    context
}

/// Turn a non-2xx response into a ServiceError carrying the raw body
pub async fn parse_error_response(
    service_name: &str,
    endpoint: &str,
    response: reqwest::Response,
) -> ServiceError {
    let status = response.status();
    let mut context = create_error_context(service_name, endpoint, Some(status));

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    log::warn!(
        "{} {} returned {}: {}",
        service_name,
        endpoint,
        status,
        truncate_string(&sanitize_for_logging(&body), LOG_BODY_LIMIT)
    );

    let error = crate::error::mapping::map_http_error(status, &body, &mut context);
    error.with_context(context)
}

/// Read a 2xx response as text, then parse it as JSON.
///
/// Reading the text first keeps the raw body available when upstream sends
/// something that is not the JSON we expect.
pub async fn read_json_body<R: DeserializeOwned>(
    service_name: &str,
    endpoint: &str,
    response: reqwest::Response,
) -> Result<R> {
    let status = response.status();
    let body = response.text().await
        .map_err(|e| ServiceError::network(format!("Failed to read response body: {}", e))
            .with_context(create_error_context(service_name, endpoint, Some(status))))?;

    serde_json::from_str::<R>(&body).map_err(|e| {
        log::warn!(
            "{} {} returned an unreadable body ({}): {}",
            service_name,
            endpoint,
            e,
            truncate_string(&sanitize_for_logging(&body), LOG_BODY_LIMIT)
        );

        let message = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
            format!("Unexpected JSON structure: {}", e)
        } else {
            format!("Response is not valid JSON: {}", e)
        };

        ServiceError::malformed(message, body.clone())
            .with_context(create_error_context(service_name, endpoint, Some(status)))
    })
}
