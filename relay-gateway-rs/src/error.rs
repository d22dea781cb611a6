//! HTTP error mapping for the relay
//!
//! Every per-request failure ends here and becomes `{error, detalhe?}` with
//! status 400 (caller input) or 500 (upstream, prompt I/O, internal).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use tool_sdk::ServiceError;

use crate::prompts::{AnalysisMethod, PromptError};
use crate::validation::ApiValidationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Diagnostic payload: the raw upstream body when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detalhe: Option<Value>,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ApiValidationError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(err) => err.status_code(),
            RelayError::Prompt(PromptError::UnknownMethod(_)) => StatusCode::BAD_REQUEST,
            RelayError::Prompt(PromptError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Service(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            RelayError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Status plus response body
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let (error, detalhe) = match self {
            RelayError::Validation(err) => return err.to_response(),
            RelayError::Prompt(PromptError::UnknownMethod(method)) => (
                format!("Método de análise desconhecido: {}.", method),
                Some(Value::String(format!("Métodos suportados: {}", AnalysisMethod::supported_keys()))),
            ),
            RelayError::Prompt(err @ PromptError::Io { .. }) => (
                "Erro ao carregar o modelo de análise.".to_string(),
                Some(Value::String(err.to_string())),
            ),
            RelayError::Service(err) => service_error_body(err),
        };

        (self.status_code(), Json(ErrorResponse { error, detalhe }))
    }
}

fn service_error_body(err: &ServiceError) -> (String, Option<Value>) {
    let message = match err.root() {
        ServiceError::NoAssistantReply { .. } => "Nenhuma resposta do assistente encontrada.",
        ServiceError::PollTimeout { .. } => "Tempo esgotado aguardando a resposta do assistente.",
        ServiceError::RunNotCompleted { .. } => "A execução do assistente não foi concluída.",
        ServiceError::InvalidAssistantPayload { .. } => "Resposta do assistente em formato inválido.",
        ServiceError::Validation(_) => "Requisição inválida.",
        _ => "Erro ao processar a análise.",
    };

    let detalhe = match err.diagnostic_body() {
        Some(body) => Some(diagnostic_value(body)),
        None => Some(Value::String(err.to_string())),
    };

    (message.to_string(), detalhe)
}

/// Raw bodies that are JSON are returned as JSON, anything else as a string
fn diagnostic_value(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_response();

        if status.is_server_error() {
            tracing::error!("Analysis failed: {}", self);
        } else {
            tracing::warn!("Rejected analysis request: {}", self);
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let (status, Json(body)) = RelayError::from(ApiValidationError::MissingInput).to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Nenhuma imagem ou HTML fornecido.");
    }

    #[test]
    fn test_unknown_method_is_bad_request() {
        let err = RelayError::from(PromptError::UnknownMethod("xyz".to_string()));
        let (status, Json(body)) = err.to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("xyz"));
    }

    #[test]
    fn test_upstream_body_becomes_detail() {
        let err = RelayError::from(ServiceError::malformed("Response is not valid JSON", "<html>oops</html>"));
        let (status, Json(body)) = err.to_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Erro ao processar a análise.");
        assert_eq!(body.detalhe, Some(Value::String("<html>oops</html>".to_string())));

        let err = RelayError::from(ServiceError::upstream(429, "Rate limit", r#"{"error":{"message":"Rate limit"}}"#));
        let (_, Json(body)) = err.to_response();
        assert_eq!(body.detalhe.unwrap()["error"]["message"], "Rate limit");
    }

    #[test]
    fn test_workflow_failures() {
        let err = RelayError::from(
            ServiceError::NoAssistantReply { thread_id: "thread_1".to_string() }.with_context_value("thread_id", "thread_1"),
        );
        let (status, Json(body)) = err.to_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Nenhuma resposta do assistente encontrada.");

        let err = RelayError::from(ServiceError::PollTimeout { attempts: 3, elapsed: Duration::from_secs(5) });
        let (_, Json(body)) = err.to_response();
        assert_eq!(body.error, "Tempo esgotado aguardando a resposta do assistente.");
    }
}
