//! OpenAI API data models
//!
//! This module contains type definitions for OpenAI API requests and responses:
//! chat completions with multimodal content, and the assistants
//! thread / message / run / file resources.

use std::fmt;

use serde::{Serialize, Deserialize};

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Processing fidelity hint for image inputs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Cheapest, low-resolution processing
    #[default]
    Low,
    /// Let the model decide
    Auto,
    /// Full-resolution processing
    High,
}

impl std::str::FromStr for ImageDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ImageDetail::Low),
            "auto" => Ok(ImageDetail::Auto),
            "high" => Ok(ImageDetail::High),
            other => Err(format!("unknown image detail '{}'", other)),
        }
    }
}

/// Image reference inside a content part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    /// Data URL or remote URL
    pub url: String,

    /// Detail hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// One part of a multimodal message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Image by URL
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Image part
    pub fn image(url: impl Into<String>, detail: ImageDetail) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: Some(detail),
            },
        }
    }
}

/// Message content: a bare string or a list of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Multimodal parts
    Parts(Vec<ContentPart>),
}

/// A chat message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author
    pub role: Role,

    /// The content of the message
    pub content: MessageContent,
}

impl ChatMessage {
    /// System instruction
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User turn made of parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatCompletionRequest {
    /// ID of the model to use
    pub model: String,

    /// The messages to generate chat completions for
    pub messages: Vec<ChatMessage>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0-2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A chat completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    /// Index of the choice
    #[serde(default)]
    pub index: u32,

    /// The generated message
    pub message: ChatCompletionMessage,

    /// Reason for finishing
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A message in a chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    /// Role of the message
    pub role: Role,

    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Number of prompt tokens
    pub prompt_tokens: u32,

    /// Number of completion tokens
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response ID
    #[serde(default)]
    pub id: String,

    /// Model used
    #[serde(default)]
    pub model: String,

    /// Choices generated
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,

    /// Token usage statistics
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Thread ID
    pub id: String,

    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Body for appending a message to a thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMessageRequest {
    /// Always `user` for messages posted by the relay
    pub role: Role,

    /// Content parts
    pub content: Vec<ContentPart>,
}

/// Body for starting a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRunRequest {
    /// Pre-provisioned assistant to execute
    pub assistant_id: String,

    /// Optional instruction override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Error attached to a failed run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunError {
    /// Error code
    #[serde(default)]
    pub code: Option<String>,

    /// Human readable message
    #[serde(default)]
    pub message: Option<String>,
}

/// Why a run stopped early
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncompleteDetails {
    /// Reason given by upstream
    #[serde(default)]
    pub reason: Option<String>,
}

/// Run of an assistant over a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Run ID
    pub id: String,

    /// Owning thread
    #[serde(default)]
    pub thread_id: Option<String>,

    /// Raw status string (owned by upstream)
    pub status: RunStatus,

    /// Error for failed runs
    #[serde(default)]
    pub last_error: Option<RunError>,

    /// Details for incomplete runs
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

/// Run status as reported upstream.
///
/// Kept as an open set: statuses we have never seen parse into `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Cancelling,
    Expired,
    RequiresAction,
    Incomplete,
    Other(String),
}

impl RunStatus {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Expired => "expired",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Other(raw) => raw,
        }
    }

    /// Only `queued` and `in_progress` keep the poll loop going
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }
}

impl From<&str> for RunStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            "cancelling" => RunStatus::Cancelling,
            "expired" => RunStatus::Expired,
            "requires_action" => RunStatus::RequiresAction,
            "incomplete" => RunStatus::Incomplete,
            other => RunStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RunStatus::from(raw.as_str()))
    }
}

/// How a terminal run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    Cancelled,
    Expired,
    RequiresAction,
    Incomplete(String),
    Unrecognized(String),
}

impl RunOutcome {
    /// Classify a run already known to be outside `queued`/`in_progress`
    pub fn from_run(run: &Run) -> Self {
        match &run.status {
            RunStatus::Completed => RunOutcome::Completed,
            RunStatus::Failed => {
                let reason = run.last_error.as_ref()
                    .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
                    .unwrap_or_else(|| "no error reported".to_string());
                RunOutcome::Failed(reason)
            }
            RunStatus::Cancelled | RunStatus::Cancelling => RunOutcome::Cancelled,
            RunStatus::Expired => RunOutcome::Expired,
            RunStatus::RequiresAction => RunOutcome::RequiresAction,
            RunStatus::Incomplete => {
                let reason = run.incomplete_details.as_ref()
                    .and_then(|d| d.reason.clone())
                    .unwrap_or_else(|| "no reason reported".to_string());
                RunOutcome::Incomplete(reason)
            }
            other => RunOutcome::Unrecognized(other.as_str().to_string()),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Failed(reason) => write!(f, "failed ({})", reason),
            RunOutcome::Cancelled => write!(f, "cancelled"),
            RunOutcome::Expired => write!(f, "expired"),
            RunOutcome::RequiresAction => write!(f, "requires_action"),
            RunOutcome::Incomplete(reason) => write!(f, "incomplete ({})", reason),
            RunOutcome::Unrecognized(status) => write!(f, "unrecognized status '{}'", status),
        }
    }
}

/// File citation target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileCitation {
    /// Cited file
    pub file_id: String,
}

/// Annotation attached to assistant text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// Reference to a knowledge-base file
    FileCitation {
        #[serde(default)]
        text: String,
        file_citation: FileCitation,
    },
    /// Anything else (file paths, future kinds)
    #[serde(other)]
    Other,
}

/// Text body of an assistant message part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    /// The text itself
    pub value: String,

    /// Citations and other annotations
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// One content block of a thread message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentBlock {
    /// Text block
    Text { text: TextContent },
    /// Image, refusal or anything else we do not read
    #[serde(other)]
    Other,
}

/// Message stored in a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message ID
    #[serde(default)]
    pub id: String,

    /// Author role
    pub role: Role,

    /// Content blocks
    #[serde(default)]
    pub content: Vec<MessageContentBlock>,

    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Paginated message list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    /// Messages in upstream order
    pub data: Vec<ThreadMessage>,

    /// Whether more pages exist
    #[serde(default)]
    pub has_more: bool,
}

/// Uploaded file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    /// File ID
    pub id: String,

    /// Display name
    pub filename: String,
}
