//! Route handlers

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use tool_sdk::openai::{Citations, MessageInput};
use tool_sdk::ServiceError;

use crate::config::{Backend, ReplyFormat};
use crate::error::RelayError;
use crate::validation::{parse_analyze_request, AnalysisPayload};
use crate::{AppState, START_TIME};

/// Static liveness text for `GET /`
pub const ROOT_MESSAGE: &str = "Servidor de análise heurística rodando!";

/// Successful `/analisar` body
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Model text, or the parsed value in structured mode
    pub resposta: Value,

    /// Filenames cited by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencias: Option<Vec<String>>,

    /// Cited file ids whose names could not be fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencias_nao_resolvidas: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub backend: String,
    pub uptime_seconds: i64,
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// POST /analisar - Analyse a screenshot or an HTML snippet
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, RelayError> {
    let request_id = uuid::Uuid::new_v4();
    let request = parse_analyze_request(&body, &state.config.validation_rules())?;
    let prompt = state.prompts.resolve(request.metodo.as_deref()).await?;

    let input = match request.payload {
        AnalysisPayload::Image(image) => {
            tracing::info!(%request_id, method = %prompt.method, "Analysing screenshot");
            MessageInput::text_and_image(prompt.text, image)
        }
        AnalysisPayload::Html(html) => {
            tracing::info!(%request_id, method = %prompt.method, chars = html.len(), "Analysing HTML");
            MessageInput::text(format!("{}\n\nCódigo HTML da interface:\n{}", prompt.text, html))
        }
    };

    let detail = state.config.image_detail;
    let (text, citations) = match state.config.backend {
        Backend::Completion => {
            let text = state
                .client
                .complete(&input, detail, state.config.system_prompt.as_deref())
                .await?;
            (text, Citations::default())
        }
        Backend::Assistant => {
            let reply = state
                .client
                .assistant_workflow()?
                .with_selection(state.config.reply_selection)
                .run(&input, detail)
                .await?;
            tracing::debug!(%request_id, thread_id = %reply.thread_id, polls = reply.poll_attempts, "Assistant run finished");
            (reply.text, reply.citations)
        }
    };

    let resposta = match state.config.reply_format {
        ReplyFormat::Text => Value::String(text),
        ReplyFormat::Json => parse_structured_reply(&text)?,
    };

    Ok(Json(AnalyzeResponse {
        resposta,
        referencias: non_empty(citations.filenames),
        referencias_nao_resolvidas: non_empty(citations.unresolved),
    }))
}

/// Parse model text as JSON, tolerating a surrounding Markdown code fence
pub fn parse_structured_reply(text: &str) -> Result<Value, ServiceError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).map_err(|e| {
        ServiceError::invalid_assistant_payload(format!("Reply is not valid JSON: {}", e), text)
    })
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// GET / - Static liveness string
pub async fn root_handler() -> &'static str {
    ROOT_MESSAGE
}

/// GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        service_name: "relay-gateway".to_string(),
        backend: state.config.backend.to_string(),
        uptime_seconds: START_TIME.elapsed().as_secs() as i64,
        status: "SERVING".to_string(),
        timestamp: chrono::Utc::now(),
    })
}
