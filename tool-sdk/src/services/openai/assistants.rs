//! Thread / message / run workflow against a pre-provisioned assistant
//!
//! Every invocation gets a fresh thread, so concurrent callers never share
//! conversation state.

use std::collections::HashSet;

use log::{debug, info, warn};

use super::models::*;
use super::input::MessageInput;
use super::OpenAIClient;
use crate::error::{Result, ServiceError};
use crate::polling::{PollConfig, Polled, Poller};
use crate::util::generate_request_id;

/// Which assistant message of the thread is the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplySelection {
    /// First assistant message in upstream list order (newest first by default)
    #[default]
    First,

    /// Assistant message with the greatest `created_at`
    Latest,
}

impl std::str::FromStr for ReplySelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(ReplySelection::First),
            "latest" => Ok(ReplySelection::Latest),
            other => Err(format!("Unknown reply selection '{}', expected first or latest", other)),
        }
    }
}

/// Filenames cited by a reply.
///
/// Lookups that fail are reported in `unresolved` instead of failing the
/// whole reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citations {
    /// Resolved filenames, in citation order, without duplicates
    pub filenames: Vec<String>,

    /// File IDs whose metadata could not be fetched
    pub unresolved: Vec<String>,
}

impl Citations {
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty() && self.unresolved.is_empty()
    }
}

/// Reply produced by one workflow invocation
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub thread_id: String,
    pub run_id: String,
    pub message_id: String,

    /// Text of the selected assistant message
    pub text: String,

    pub citations: Citations,

    /// Run status re-fetches performed while waiting
    pub poll_attempts: u32,
}

/// Driver for one assistant
pub struct AssistantWorkflow<'a> {
    client: &'a OpenAIClient,
    assistant_id: String,
    poller: Poller,
    selection: ReplySelection,
}

impl<'a> AssistantWorkflow<'a> {
    pub fn new(client: &'a OpenAIClient, assistant_id: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            client,
            assistant_id: assistant_id.into(),
            poller: Poller::new(poll),
            selection: ReplySelection::default(),
        }
    }

    /// Choose how the reply message is picked
    pub fn with_selection(mut self, selection: ReplySelection) -> Self {
        self.selection = selection;
        self
    }

    /// Run the full workflow for one user turn.
    ///
    /// Thread, message, run, bounded poll, message fetch, reply selection
    /// and citation lookup, in that order. Any run that ends in a state
    /// other than `completed` is an error.
    pub async fn run(&self, input: &MessageInput, detail: ImageDetail) -> Result<AssistantReply> {
        let correlation_id = generate_request_id();

        // Validate before anything is created upstream
        let content = input.to_parts(detail)?;

        let thread = self.client.create_thread().await?;
        let thread_id = thread.id;
        debug!("[{}] Created thread {}", correlation_id, thread_id);

        let message = CreateMessageRequest {
            role: Role::User,
            content,
        };
        self.client.create_message(&thread_id, &message).await
            .map_err(|e| e.with_context_value("thread_id", &thread_id))?;

        let run_request = CreateRunRequest {
            assistant_id: self.assistant_id.clone(),
            instructions: None,
        };
        let run = self.client.create_run(&thread_id, &run_request).await
            .map_err(|e| e.with_context_value("thread_id", &thread_id))?;
        debug!("[{}] Started run {} ({})", correlation_id, run.id, run.status);

        let polled = self.await_run(&thread_id, run).await?;
        let run = polled.value;

        match RunOutcome::from_run(&run) {
            RunOutcome::Completed => {}
            outcome => {
                warn!("[{}] Run {} on thread {} ended {}", correlation_id, run.id, thread_id, outcome);
                return Err(ServiceError::RunNotCompleted { run_id: run.id.clone(), outcome }
                    .with_context_value("thread_id", &thread_id));
            }
        }

        let messages = self.client.list_messages(&thread_id).await
            .map_err(|e| e.with_context_value("thread_id", &thread_id))?;
        let (message_id, text, annotations) = select_reply(&messages.data, self.selection, &thread_id)?;

        let citations = self.resolve_citations(&annotations).await;
        if !citations.unresolved.is_empty() {
            warn!(
                "[{}] {} citation(s) on thread {} could not be resolved",
                correlation_id,
                citations.unresolved.len(),
                thread_id
            );
        }

        info!(
            "[{}] Assistant replied on thread {} after {} poll(s) in {:?}",
            correlation_id, thread_id, polled.attempts, polled.elapsed
        );

        Ok(AssistantReply {
            thread_id,
            run_id: run.id,
            message_id,
            text,
            citations,
            poll_attempts: polled.attempts,
        })
    }

    /// Re-fetch the run until it leaves `queued` / `in_progress`
    pub async fn await_run(&self, thread_id: &str, run: Run) -> Result<Polled<Run>> {
        let run_id = run.id.clone();

        self.poller
            .poll_until(
                run,
                || self.client.retrieve_run(thread_id, &run_id),
                |run: &Run| run.status.is_pending(),
            )
            .await
            .map_err(|e| {
                e.with_context_value("thread_id", thread_id)
                    .with_context_value("run_id", &run_id)
            })
    }

    /// Look up the filename of every distinct cited file
    pub async fn resolve_citations(&self, annotations: &[Annotation]) -> Citations {
        let mut seen = HashSet::new();
        let mut citations = Citations::default();

        for annotation in annotations {
            let file_id = match annotation {
                Annotation::FileCitation { file_citation, .. } => &file_citation.file_id,
                Annotation::Other => continue,
            };
            if !seen.insert(file_id.clone()) {
                continue;
            }

            match self.client.retrieve_file(file_id).await {
                Ok(file) => citations.filenames.push(file.filename),
                Err(e) => {
                    debug!("Citation lookup for {} failed: {}", file_id, e);
                    citations.unresolved.push(file_id.clone());
                }
            }
        }

        citations
    }
}

/// Pick the reply message and return `(message_id, text, annotations)`.
///
/// Only assistant-authored messages are considered. The first content block
/// of the chosen message must be text.
pub fn select_reply(
    messages: &[ThreadMessage],
    selection: ReplySelection,
    thread_id: &str,
) -> Result<(String, String, Vec<Annotation>)> {
    let mut assistant = messages.iter().filter(|m| m.role == Role::Assistant);

    let chosen = match selection {
        ReplySelection::First => assistant.next(),
        // max_by_key keeps the last maximum, so ties resolve to the later list entry
        ReplySelection::Latest => assistant.max_by_key(|m| m.created_at.unwrap_or(i64::MIN)),
    };

    let message = chosen.ok_or_else(|| ServiceError::NoAssistantReply {
        thread_id: thread_id.to_string(),
    })?;

    match message.content.first() {
        Some(MessageContentBlock::Text { text }) => {
            Ok((message.id.clone(), text.value.clone(), text.annotations.clone()))
        }
        Some(MessageContentBlock::Other) => Err(ServiceError::unexpected_shape(
            "Assistant reply does not start with a text block",
        )
        .with_context_value("thread_id", thread_id)),
        None => Err(ServiceError::unexpected_shape("Assistant reply has no content")
            .with_context_value("thread_id", thread_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, role: Role, text: &str, created_at: i64) -> ThreadMessage {
        ThreadMessage {
            id: id.to_string(),
            role,
            content: vec![MessageContentBlock::Text {
                text: TextContent {
                    value: text.to_string(),
                    annotations: vec![],
                },
            }],
            created_at: Some(created_at),
        }
    }

    #[test]
    fn test_first_selection_uses_list_order() {
        let messages = vec![
            message("msg_user", Role::User, "pergunta", 30),
            message("msg_a", Role::Assistant, "primeira", 10),
            message("msg_b", Role::Assistant, "segunda", 20),
        ];

        let (id, text, _) = select_reply(&messages, ReplySelection::First, "thread_1").unwrap();
        assert_eq!(id, "msg_a");
        assert_eq!(text, "primeira");
    }

    #[test]
    fn test_latest_selection_uses_timestamp() {
        let messages = vec![
            message("msg_a", Role::Assistant, "antiga", 10),
            message("msg_b", Role::Assistant, "nova", 20),
            message("msg_user", Role::User, "pergunta", 99),
        ];

        let (id, _, _) = select_reply(&messages, ReplySelection::Latest, "thread_1").unwrap();
        assert_eq!(id, "msg_b");
    }

    #[test]
    fn test_no_assistant_message() {
        let messages = vec![message("msg_user", Role::User, "pergunta", 1)];
        let err = select_reply(&messages, ReplySelection::First, "thread_9").unwrap_err();
        assert!(matches!(err, ServiceError::NoAssistantReply { ref thread_id } if thread_id == "thread_9"));
    }

    #[test]
    fn test_non_text_first_block() {
        let messages = vec![ThreadMessage {
            id: "msg_img".to_string(),
            role: Role::Assistant,
            content: vec![MessageContentBlock::Other],
            created_at: None,
        }];
        let err = select_reply(&messages, ReplySelection::First, "thread_1").unwrap_err();
        assert!(matches!(err.root(), ServiceError::UnexpectedShape(_)));
    }

    #[test]
    fn test_reply_selection_from_str() {
        assert_eq!("Latest".parse::<ReplySelection>().unwrap(), ReplySelection::Latest);
        assert_eq!("first".parse::<ReplySelection>().unwrap(), ReplySelection::First);
        assert!("newest".parse::<ReplySelection>().is_err());
    }
}
