//! Relay configuration
//!
//! Built once at startup from the environment and shared read-only by every
//! request handler.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tool_sdk::config::{ConfigProvider, ConfigProviderExt, EnvConfigProvider, OpenAIConfig};
use tool_sdk::openai::{ImageDetail, ReplySelection};
use tool_sdk::{Result, ServiceError};

use crate::prompts::{MethodPolicy, PromptSource};
use crate::validation::ValidationRules;

/// Default minimum length for the `html` field
pub const DEFAULT_HTML_MIN_LENGTH: usize = 20;

/// Which upstream flow answers `/analisar`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One chat completion call
    #[default]
    Completion,
    /// Thread/run workflow against a pre-provisioned assistant
    Assistant,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Completion => "completion",
            Backend::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completion" | "chat" => Ok(Backend::Completion),
            "assistant" | "assistants" => Ok(Backend::Assistant),
            other => Err(format!("Unknown backend '{}', expected completion or assistant", other)),
        }
    }
}

/// Shape of `resposta` in successful responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyFormat {
    /// Model text as a JSON string
    #[default]
    Text,
    /// Model text parsed as JSON; unparsable text is an error
    Json,
}

impl FromStr for ReplyFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReplyFormat::Text),
            "json" => Ok(ReplyFormat::Json),
            other => Err(format!("Unknown reply format '{}', expected text or json", other)),
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub backend: Backend,
    pub openai: OpenAIConfig,
    pub prompt_source: PromptSource,
    pub method_policy: MethodPolicy,
    pub image_detail: ImageDetail,
    pub accept_raw_base64: bool,
    pub html_min_length: usize,
    pub reply_format: ReplyFormat,
    pub reply_selection: ReplySelection,

    /// System instruction for the completion backend
    pub system_prompt: Option<String>,
}

impl RelayConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&EnvConfigProvider::new())
    }

    /// Load from any config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let openai = OpenAIConfig::from_provider(provider)?;

        let backend = parse_setting(provider, "relay_backend", Backend::default())?;
        if backend == Backend::Assistant {
            openai.require_assistant_id()?;
        }

        let prompt_source = match provider.get_optional("relay_prompt_dir") {
            Some(dir) => PromptSource::Directory(PathBuf::from(dir)),
            None => PromptSource::Builtin,
        };

        let method_policy = if provider.get_bool_or("relay_strict_method", false)? {
            MethodPolicy::Strict
        } else {
            MethodPolicy::FallbackToDefault
        };

        Ok(Self {
            backend,
            openai,
            prompt_source,
            method_policy,
            image_detail: parse_setting(provider, "relay_image_detail", ImageDetail::Low)?,
            accept_raw_base64: provider.get_bool_or("relay_accept_raw_base64", false)?,
            html_min_length: provider.get_uint_or("relay_html_min_length", DEFAULT_HTML_MIN_LENGTH)?,
            reply_format: parse_setting(provider, "relay_reply_format", ReplyFormat::default())?,
            reply_selection: parse_setting(provider, "relay_reply_selection", ReplySelection::default())?,
            system_prompt: provider.get_optional("relay_system_prompt"),
        })
    }

    /// Input rules for `/analisar`
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            accept_raw_base64: self.accept_raw_base64,
            html_min_length: self.html_min_length,
        }
    }
}

fn parse_setting<P, T>(provider: &P, key: &str, default: T) -> Result<T>
where
    P: ConfigProvider + ?Sized,
    T: FromStr<Err = String>,
{
    match provider.get_optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ServiceError::configuration(format!("{}: {}", key.to_uppercase(), e))),
        None => Ok(default),
    }
}
