//! Relay Input Validation
//!
//! Checks the `/analisar` body before anything is sent upstream: JSON shape
//! via a compiled JSON Schema, then field rules for `image` and `html`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use tool_sdk::openai::ImageSource;

use crate::error::ErrorResponse;

/// Default maximum request payload size (10MB)
pub const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Schema for the analyze request
pub static ANALYZE_REQUEST_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    let schema = json!({
        "type": "object",
        "properties": {
            "image": { "type": ["string", "null"] },
            "html": { "type": ["string", "null"] },
            "metodo": {
                "type": ["string", "null"],
                "maxLength": 64
            }
        }
    });

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .expect("Invalid schema")
});

static DATA_URL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/(?:png|jpeg|jpg|webp|gif));base64,").expect("Invalid data URL regex")
});

static BASE64_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("Invalid base64 regex")
});

/// Validation error for relay requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Requisição inválida.")]
    InvalidFormat(String),

    #[error("Requisição inválida.")]
    Schema(String),

    #[error("Imagem inválida ou mal formatada.")]
    InvalidImage,

    #[error("HTML inválido ou muito curto.")]
    InvalidHtml { min_length: usize },

    #[error("Nenhuma imagem ou HTML fornecido.")]
    MissingInput,

    #[error("Requisição muito grande.")]
    PayloadTooLarge { limit: usize },
}

impl ApiValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let detail = match self {
            Self::InvalidFormat(detail) | Self::Schema(detail) => Some(Value::String(detail.clone())),
            Self::InvalidHtml { min_length } => {
                Some(Value::String(format!("O HTML deve ter pelo menos {} caracteres.", min_length)))
            }
            Self::PayloadTooLarge { limit } => {
                Some(Value::String(format!("O corpo da requisição excede {} bytes.", limit)))
            }
            Self::InvalidImage | Self::MissingInput => None,
        };

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
                detalhe: detail,
            }),
        )
    }
}

/// Input rules that depend on configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Accept a bare base64 payload in `image` (sent as PNG)
    pub accept_raw_base64: bool,

    /// Minimum `html` length in characters, after trimming
    pub html_min_length: usize,
}

/// Raw `/analisar` body
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub metodo: Option<String>,
}

/// What the caller wants analysed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisPayload {
    Image(ImageSource),
    Html(String),
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub payload: AnalysisPayload,
    pub metodo: Option<String>,
}

/// Parse and validate a raw request body
pub fn parse_analyze_request(body: &[u8], rules: &ValidationRules) -> Result<ValidatedRequest, ApiValidationError> {
    let json_value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiValidationError::InvalidFormat(format!("Invalid JSON: {}", e)))?;

    validate_json_schema(&json_value)?;

    let request: AnalyzeRequest = serde_json::from_value(json_value)
        .map_err(|e| ApiValidationError::InvalidFormat(e.to_string()))?;

    validate_request(request, rules)
}

/// Validate JSON payload against the request schema
pub fn validate_json_schema(json: &Value) -> Result<(), ApiValidationError> {
    if let Err(errors) = ANALYZE_REQUEST_SCHEMA.validate(json) {
        let error_details: Vec<String> = errors
            .map(|err| format!("{} at {}", err, err.instance_path))
            .collect();

        return Err(ApiValidationError::Schema(if error_details.is_empty() {
            "Schema validation failed".to_string()
        } else {
            error_details.join("; ")
        }));
    }

    Ok(())
}

/// Apply field rules. A present image takes precedence over html.
pub fn validate_request(request: AnalyzeRequest, rules: &ValidationRules) -> Result<ValidatedRequest, ApiValidationError> {
    let image = request.image.filter(|i| !i.trim().is_empty());
    let html = request.html.filter(|h| !h.trim().is_empty());

    let payload = match (image, html) {
        (Some(image), _) => AnalysisPayload::Image(validate_image(&image, rules)?),
        (None, Some(html)) => AnalysisPayload::Html(validate_html(&html, rules)?),
        (None, None) => return Err(ApiValidationError::MissingInput),
    };

    Ok(ValidatedRequest {
        payload,
        metodo: request.metodo,
    })
}

/// Accept `data:image/<type>;base64,<payload>`, or a bare payload when allowed
pub fn validate_image(image: &str, rules: &ValidationRules) -> Result<ImageSource, ApiValidationError> {
    let image = image.trim();

    if let Some(prefix) = DATA_URL_PREFIX.find(image) {
        let payload = &image[prefix.end()..];
        if !BASE64_PAYLOAD.is_match(payload) {
            return Err(ApiValidationError::InvalidImage);
        }
        return Ok(ImageSource::DataUrl(image.to_string()));
    }

    if rules.accept_raw_base64 && BASE64_PAYLOAD.is_match(image) {
        return Ok(ImageSource::base64_png(image));
    }

    Err(ApiValidationError::InvalidImage)
}

pub fn validate_html(html: &str, rules: &ValidationRules) -> Result<String, ApiValidationError> {
    let html = html.trim();
    if html.chars().count() < rules.html_min_length {
        return Err(ApiValidationError::InvalidHtml {
            min_length: rules.html_min_length,
        });
    }
    Ok(html.to_string())
}

/// Generate middleware config for payload limits
pub fn payload_limit_config() -> tower_http::limit::RequestBodyLimitLayer {
    tower_http::limit::RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

/// Replace the plain-text 413 of the body limit with the relay's JSON error body
pub async fn payload_too_large_as_json(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiValidationError::PayloadTooLarge { limit: MAX_PAYLOAD_SIZE }
            .to_response()
            .into_response()
    } else {
        response
    }
}
