//! # Tool SDK
//!
//! Typed client for the OpenAI endpoints used by the heuristic relay.
//!
//! This crate provides:
//!
//! - Core abstractions for service clients with a unified interface
//! - A typed OpenAI client covering chat completions and the assistants
//!   thread / run / file resources
//! - A bounded poller for long-running runs
//! - Error handling that keeps upstream diagnostics attached
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `ServiceClient`: The base trait for all external service clients
//! - `RequestExecutor`: Sends JSON requests and decodes typed responses
//! - `AuthenticatedClient`: Adds authentication headers to requests
//! - `Poller`: Re-fetches a resource until it leaves a pending state
//! - `ServiceError`: Error type shared by every client

// Re-export core modules
pub mod core;
pub use core::{ServiceClient, RequestExecutor, AuthenticatedClient, ClientBuilder};

// Re-export service-specific modules
pub mod services;
pub use services::openai;

// Re-export error handling
pub mod error;
pub use error::{ServiceError, ErrorContext, Result};

// Bounded polling
pub mod polling;
pub use polling::{PollConfig, Polled, Poller};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, EnvConfigProvider, OpenAIConfig, ServiceConfig};

// Utility module for common functionality
pub mod util;

#[cfg(test)]
mod tests;

/// Create an OpenAI client from an explicit configuration
pub fn openai_client(config: OpenAIConfig) -> Result<openai::OpenAIClient> {
    openai::OpenAIClient::new(config)
}
