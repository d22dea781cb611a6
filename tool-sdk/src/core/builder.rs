//! Client builder implementation
//!
//! Builds the pooled `reqwest::Client` shared by every request of a service
//! client. Per-request headers (auth, beta flags) are added by the client.

use std::time::Duration;
use reqwest::Client as ReqwestClient;

use crate::error::{Result, ServiceError};
use crate::services::common::UserAgent;

/// HTTP client builder
pub struct ClientBuilder {
    /// Request timeout
    timeout: Option<Duration>,

    /// User agent
    user_agent: UserAgent,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            user_agent: UserAgent::default(),
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Build an HTTP client with the configured settings
    pub fn build_http_client(&self) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = builder
            .user_agent(self.user_agent.to_string())
            .gzip(true);

        builder.build()
            .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
    }
}
