//! Heuristic analysis relay
//!
//! Accepts a screenshot or an HTML snippet on `POST /analisar`, sends it to
//! OpenAI (chat completion or assistant thread/run) with the prompt of the
//! requested analysis method, and returns the model's verdict.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::http::{header::CONTENT_TYPE, Method};
use axum::middleware::map_response;
use axum::routing::{get, post};
use axum::Router;
use once_cell::sync::Lazy;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tool_sdk::openai::OpenAIClient;

pub mod config;
pub mod error;
pub mod handlers;
pub mod prompts;
pub mod validation;

use config::RelayConfig;
use prompts::PromptResolver;

pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Shared application state
pub struct AppState {
    pub config: RelayConfig,
    pub client: OpenAIClient,
    pub prompts: PromptResolver,
}

impl AppState {
    pub fn new(config: RelayConfig) -> tool_sdk::Result<Self> {
        let client = tool_sdk::openai_client(config.openai.clone())?;
        let prompts = PromptResolver::new(config.prompt_source.clone(), config.method_policy);

        Ok(Self {
            config,
            client,
            prompts,
        })
    }
}

/// Build the relay router with CORS, body limit and request tracing.
///
/// Oversized bodies are rejected by the limit layer and answered with the
/// relay's JSON error body.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/analisar", post(handlers::analyze_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(validation::payload_limit_config())
        .layer(map_response(validation::payload_too_large_as_json))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
