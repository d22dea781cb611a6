//! Core abstractions for the Tool SDK
//!
//! This module provides the fundamental trait interfaces that service
//! clients implement:
//!
//! - `ServiceClient`: identity of an upstream service
//! - `RequestExecutor`: typed JSON requests against that service
//! - `AuthenticatedClient`: credential handling
//! - `ClientBuilder`: builder for the underlying HTTP client

pub mod builder;
pub use builder::ClientBuilder;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Base trait for all service clients
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Service API version
    fn version(&self) -> &str;
}

/// Trait responsible for executing HTTP requests with strong typing
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute a GET request
    async fn get<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned + Send;

    /// Execute a POST request with a JSON body
    async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned + Send;

    /// Execute a POST request without a body
    async fn post_empty<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned + Send;
}

/// Trait for clients that require authentication
pub trait AuthenticatedClient: Send + Sync {
    /// Authentication type (e.g., "Bearer")
    fn auth_type(&self) -> &str;

    /// Check if client has credentials
    fn is_authenticated(&self) -> bool;

    /// Add authentication headers to a request
    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()>;
}
