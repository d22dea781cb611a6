//! Error handling for the Tool SDK
//!
//! This module provides the error system shared by every upstream client:
//! - Categorizes failures by where they happened (transport, upstream status,
//!   response shape, assistant payload, run lifecycle, configuration)
//! - Keeps the raw upstream body around for diagnostics
//! - Adds rich context to errors for better debugging
//! - Provides convenient Result type alias

use std::fmt;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::services::openai::RunOutcome;

pub mod mapping;

/// Result type for Tool SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the Tool SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors (no usable HTTP response)
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-2xx status
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },

    /// Upstream answered 2xx but the body is not the JSON we expected
    #[error("Malformed upstream response: {message}")]
    MalformedResponse { message: String, body: String },

    /// JSON parsed but lacks the fields the caller needs
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The thread holds no assistant-authored message
    #[error("No assistant reply found in thread {thread_id}")]
    NoAssistantReply { thread_id: String },

    /// Assistant text was required to be JSON and is not
    #[error("Invalid assistant payload: {message}")]
    InvalidAssistantPayload { message: String, body: String },

    /// The run reached a terminal status other than `completed`
    #[error("Run {run_id} did not complete: {outcome}")]
    RunNotCompleted { run_id: String, outcome: RunOutcome },

    /// The poll policy gave up before the run left `queued`/`in_progress`
    #[error("Gave up polling after {attempts} attempts ({elapsed:?})")]
    PollTimeout { attempts: u32, elapsed: Duration },

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create an upstream status error
    pub fn upstream(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        ServiceError::Upstream {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create a malformed response error carrying the raw body
    pub fn malformed(message: impl Into<String>, body: impl Into<String>) -> Self {
        ServiceError::MalformedResponse {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create an unexpected shape error
    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        ServiceError::UnexpectedShape(message.into())
    }

    /// Create an invalid assistant payload error
    pub fn invalid_assistant_payload(message: impl Into<String>, body: impl Into<String>) -> Self {
        ServiceError::InvalidAssistantPayload {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        match self {
            ServiceError::WithContext { inner, mut context } => {
                context.add(key, value);
                ServiceError::WithContext { inner, context }
            }
            other => {
                let mut context = ErrorContext::new();
                context.add(key, value);
                other.with_context(context)
            }
        }
    }

    /// The innermost error, with all context layers removed
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, .. } => Some(&context.service),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Upstream { status, .. } => Some(*status),
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Context value recorded under `key`, searching every context layer
    pub fn context_value(&self, key: &str) -> Option<&str> {
        match self {
            ServiceError::WithContext { inner, context } => context
                .data
                .get(key)
                .map(String::as_str)
                .or_else(|| inner.context_value(key)),
            _ => None,
        }
    }

    /// Raw upstream body for diagnostics, when the failure carried one
    pub fn diagnostic_body(&self) -> Option<&str> {
        match self.root() {
            ServiceError::Upstream { body, .. }
            | ServiceError::MalformedResponse { body, .. }
            | ServiceError::InvalidAssistantPayload { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Whether the error is the caller's fault rather than upstream's
    pub fn is_client_error(&self) -> bool {
        matches!(self.root(), ServiceError::Validation(_))
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// Request timestamp
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Service-specific error code
    pub error_code: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        let service_error = if err.is_timeout() {
            ServiceError::network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_builder() {
            // The request could not even be built (bad URL, bad body)
            ServiceError::validation(format!("Invalid request: {}", err))
        } else if err.is_request() {
            ServiceError::network(format!("Request failed: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else {
            ServiceError::network(format!("HTTP client error: {}", err))
        };

        if let Some(status) = err.status() {
            service_error.with_context(context.status_code(status.as_u16()))
        } else {
            service_error.with_context(context)
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::malformed(format!("JSON error: {}", err), String::new())
            .with_context(ErrorContext::for_service("json"))
    }
}
