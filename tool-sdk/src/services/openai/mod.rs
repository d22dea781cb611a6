//! OpenAI API client implementation
//!
//! This module provides a strongly-typed client for the OpenAI API:
//! chat completions with image or text payloads, and the assistants
//! thread / message / run / file endpoints used by [`AssistantWorkflow`].

mod models;
mod input;
mod assistants;

pub use models::*;
pub use input::{ImageSource, MessageInput};
pub use assistants::{AssistantReply, AssistantWorkflow, Citations, ReplySelection, select_reply};

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, header::{HeaderMap, HeaderValue, AUTHORIZATION}};
use serde::{Serialize, de::DeserializeOwned};
use async_trait::async_trait;
use log::{debug, warn};

use crate::core::{ServiceClient, RequestExecutor, AuthenticatedClient, ClientBuilder};
use crate::error::{Result, ServiceError};
use crate::config::{OpenAIConfig, ServiceConfig};
use crate::polling::PollConfig;
use crate::services::common::{UserAgent, parse_error_response, read_json_body};

/// OpenAI API client
///
/// Cheap to clone: the HTTP connection pool and configuration are shared.
#[derive(Clone)]
pub struct OpenAIClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: Arc<OpenAIConfig>,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("assistant_id", &self.config.assistant_id)
            .finish()
    }
}

impl OpenAIClient {
    /// Create a new OpenAI client from a validated configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let http_client = ClientBuilder::new()
            .user_agent(UserAgent {
                extra: Some("OpenAI-Client".to_string()),
                ..UserAgent::default()
            })
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build_http_client()?;

        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }

    /// Create a new builder for the OpenAI client
    pub fn builder() -> OpenAIClientBuilder {
        OpenAIClientBuilder::default()
    }

    /// Active configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Send a chat completion request
    pub async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        self.post("chat/completions", request).await
    }

    /// Single-shot completion over one user turn.
    ///
    /// Builds `[system?, user(parts)]` with the configured model, token
    /// budget and temperature, and returns the first choice's text.
    pub async fn complete(
        &self,
        input: &MessageInput,
        detail: ImageDetail,
        system: Option<&str>,
    ) -> Result<String> {
        let parts = input.to_parts(detail)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user_parts(parts));

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: self.config.temperature,
        };

        let response = self.chat_completion(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                "Completion used {} prompt + {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = response.choices.into_iter().next()
            .ok_or_else(|| ServiceError::unexpected_shape("No completion choices returned"))?;

        choice.message.content
            .ok_or_else(|| ServiceError::unexpected_shape("Empty completion response"))
    }

    /// Create an empty thread
    pub async fn create_thread(&self) -> Result<Thread> {
        self.post_empty("threads").await
    }

    /// Append a message to a thread
    pub async fn create_message(&self, thread_id: &str, request: &CreateMessageRequest) -> Result<ThreadMessage> {
        self.post(&format!("threads/{}/messages", thread_id), request).await
    }

    /// Start a run on a thread
    pub async fn create_run(&self, thread_id: &str, request: &CreateRunRequest) -> Result<Run> {
        self.post(&format!("threads/{}/runs", thread_id), request).await
    }

    /// Fetch the current state of a run
    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id)).await
    }

    /// List the messages of a thread in upstream order
    pub async fn list_messages(&self, thread_id: &str) -> Result<MessageList> {
        self.get(&format!("threads/{}/messages", thread_id)).await
    }

    /// Fetch uploaded file metadata
    pub async fn retrieve_file(&self, file_id: &str) -> Result<FileObject> {
        self.get(&format!("files/{}", file_id)).await
    }

    /// Driver for the thread/run workflow of the configured assistant
    pub fn assistant_workflow(&self) -> Result<AssistantWorkflow<'_>> {
        let assistant_id = self.config.require_assistant_id()?;
        Ok(AssistantWorkflow::new(self, assistant_id, self.config.poll.clone()))
    }

    /// Assistant endpoints need the beta header
    fn needs_beta_header(endpoint: &str) -> bool {
        endpoint.starts_with("threads") || endpoint.starts_with("assistants")
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = format!("{}/{}", self.config.base_url, endpoint);
        debug!("Sending request to OpenAI: {} {}", method, url);

        let mut headers = HeaderMap::new();
        self.apply_auth(&mut headers)?;

        if Self::needs_beta_header(endpoint) {
            let value = HeaderValue::from_str(&self.config.beta_header)
                .map_err(|e| ServiceError::configuration(format!("Invalid beta header: {}", e)))?;
            headers.insert("OpenAI-Beta", value);
        }

        Ok(self.http_client.request(method, url).headers(headers))
    }

    async fn dispatch<R>(&self, endpoint: &str, builder: RequestBuilder) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let start_time = Instant::now();

        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::from(e).with_context_value("endpoint", endpoint))?;

        let status = response.status();
        debug!("OpenAI {} answered {} in {:?}", endpoint, status, start_time.elapsed());

        if status.is_success() {
            read_json_body(self.name(), endpoint, response).await
        } else {
            Err(parse_error_response(self.name(), endpoint, response).await)
        }
    }
}

impl ServiceClient for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn version(&self) -> &str {
        "v1"
    }
}

#[async_trait]
impl RequestExecutor for OpenAIClient {
    async fn get<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned + Send,
    {
        let builder = self.request(Method::GET, endpoint)?;
        self.dispatch(endpoint, builder).await
    }

    async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let builder = self.request(Method::POST, endpoint)?.json(body);
        self.dispatch(endpoint, builder).await
    }

    async fn post_empty<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned + Send,
    {
        let builder = self.request(Method::POST, endpoint)?;
        self.dispatch(endpoint, builder).await
    }
}

impl AuthenticatedClient for OpenAIClient {
    fn auth_type(&self) -> &str {
        "Bearer"
    }

    fn is_authenticated(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        if !self.is_authenticated() {
            return Err(ServiceError::configuration("No API key set for OpenAI client"));
        }

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| ServiceError::configuration("API key contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, bearer);

        if let Some(ref org) = self.config.org_id {
            match HeaderValue::from_str(org) {
                Ok(value) => {
                    headers.insert("OpenAI-Organization", value);
                }
                Err(_) => warn!("Ignoring OpenAI organization id with invalid header characters"),
            }
        }

        Ok(())
    }
}

/// Builder for OpenAI client
#[derive(Default)]
pub struct OpenAIClientBuilder {
    config: OpenAIConfig,
}

impl OpenAIClientBuilder {
    /// Create a new builder starting from default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: OpenAIConfig) -> Self {
        Self { config }
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    /// Set the organization ID
    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.config.org_id = Some(org_id.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set the completion model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the assistant used by the thread/run workflow
    pub fn assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.config.assistant_id = Some(assistant_id.into());
        self
    }

    /// Set the run polling policy
    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.config.poll = poll;
        self
    }

    /// Build the OpenAI client
    pub fn build(self) -> Result<OpenAIClient> {
        OpenAIClient::new(self.config)
    }
}
