//! Configuration management for service clients
//!
//! This module provides utilities for loading and validating configuration
//! for external service clients, with support for environment variables.
//! Configuration is read once into plain structs that callers own and pass
//! around explicitly.

use std::env;
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use crate::error::{Result, ServiceError};
use crate::polling::PollConfig;
use crate::util::parse_duration;

/// Default upstream base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.trim().parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value.trim().parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!("Invalid boolean value for key {}: {}", key, value))),
        }
    }

    /// Get a duration configuration value ("1500ms", "30s", "5m")
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value)
            .ok_or_else(|| ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value)))
    }

    /// Get an optional value: missing is `None`, present but empty is `None`
    fn get_optional(&self, key: &str) -> Option<String> {
        self.get_string(key).ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get an integer value with a default; present but unparsable is an error
    fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.get_optional(key) {
            Some(_) => self.get_int(key),
            None => Ok(default),
        }
    }

    /// Get an integer that must fit in `T` (e.g. a non-negative `u32`), with a default
    fn get_uint_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        match self.get_optional(key) {
            Some(_) => {
                let value = self.get_int(key)?;
                T::try_from(value)
                    .map_err(|_| ServiceError::configuration(format!("Value out of range for key {}: {}", key, value)))
            }
            None => Ok(default),
        }
    }

    /// Get a float value with a default; present but unparsable is an error
    fn get_float_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.get_optional(key) {
            Some(_) => self.get_float(key),
            None => Ok(default),
        }
    }

    /// Get a boolean value with a default; present but unparsable is an error
    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_optional(key) {
            Some(_) => self.get_bool(key),
            None => Ok(default),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(&prefix.to_uppercase());
            env_key.push('_');
        }

        // Uppercase and replace non-alphanumeric with underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key)
            .map_err(|e| {
                match e {
                    env::VarError::NotPresent => {
                        ServiceError::configuration(format!("Environment variable not set: {}", env_key))
                    }
                    env::VarError::NotUnicode(_) => {
                        ServiceError::configuration(format!("Environment variable is not valid unicode: {}", env_key))
                    }
                }
            })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }

    /// Builder-style `set`
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.set(key, value);
        self
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Configuration for the OpenAI API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIConfig {
    /// API key
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Organization ID (optional)
    pub org_id: Option<String>,

    /// Base URL (can be changed for proxies)
    pub base_url: String,

    /// Timeout in seconds for a single HTTP request
    pub timeout_seconds: u64,

    /// Chat completion model
    pub model: String,

    /// Completion token budget
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Pre-provisioned assistant for the thread/run workflow
    pub assistant_id: Option<String>,

    /// Value of the `OpenAI-Beta` header sent on assistant calls
    pub beta_header: String,

    /// Run polling policy
    #[serde(skip)]
    pub poll: PollConfig,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            org_id: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout_seconds: 60,
            model: "gpt-4o".to_string(),
            max_tokens: 400,
            temperature: None,
            assistant_id: None,
            beta_header: "assistants=v2".to_string(),
            poll: PollConfig::default(),
        }
    }
}

impl OpenAIConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let api_key = provider.get_optional("openai_api_key")
            .ok_or_else(|| ServiceError::configuration("OPENAI_API_KEY is required"))?;

        let max_attempts: u32 = provider.get_uint_or("openai_poll_max_attempts", defaults.poll.max_attempts.unwrap_or(0))?;

        let poll = PollConfig {
            interval: Duration::from_millis(
                provider.get_uint_or("openai_poll_interval_ms", defaults.poll.interval.as_millis() as u64)?,
            ),
            multiplier: provider.get_float_or("openai_poll_multiplier", defaults.poll.multiplier)?,
            max_interval: Duration::from_millis(
                provider.get_uint_or("openai_poll_max_interval_ms", defaults.poll.max_interval.as_millis() as u64)?,
            ),
            // 0 disables the attempt cap
            max_attempts: (max_attempts > 0).then_some(max_attempts),
            max_elapsed: match provider.get_optional("openai_poll_timeout") {
                Some(_) => Some(provider.get_duration("openai_poll_timeout")?),
                None => defaults.poll.max_elapsed,
            },
        };

        let config = Self {
            api_key,
            org_id: provider.get_optional("openai_org_id"),
            base_url: provider.get_string_or("openai_base_url", DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout_seconds: provider.get_uint_or("openai_timeout_seconds", defaults.timeout_seconds)?,
            model: provider.get_string_or("openai_model", &defaults.model),
            max_tokens: provider.get_uint_or("openai_max_tokens", defaults.max_tokens)?,
            temperature: match provider.get_optional("openai_temperature") {
                Some(_) => Some(provider.get_float("openai_temperature")? as f32),
                None => None,
            },
            assistant_id: provider.get_optional("openai_assistant_id"),
            beta_header: provider.get_string_or("openai_beta_header", &defaults.beta_header),
            poll,
        };

        config.validate()?;
        Ok(config)
    }

    /// The assistant id, or a configuration error when none is set
    pub fn require_assistant_id(&self) -> Result<&str> {
        self.assistant_id.as_deref()
            .ok_or_else(|| ServiceError::configuration("OPENAI_ASSISTANT_ID is required for the assistant workflow"))
    }
}

impl ServiceConfig for OpenAIConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("OpenAI API key is required"));
        }

        let url = url::Url::parse(&self.base_url)
            .map_err(|e| ServiceError::configuration(format!("Invalid OpenAI base URL '{}': {}", self.base_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ServiceError::configuration("OpenAI base URL must be http or https"));
        }

        if self.model.is_empty() {
            return Err(ServiceError::configuration("OpenAI model is required"));
        }

        if self.max_tokens == 0 {
            return Err(ServiceError::configuration("OpenAI max tokens must be greater than zero"));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ServiceError::configuration("OpenAI temperature must be between 0.0 and 2.0"));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration("OpenAI timeout must be greater than zero"));
        }

        self.poll.validate()
    }

    fn service_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_provider() -> MemoryConfigProvider {
        MemoryConfigProvider::new().with("openai_api_key", "sk-test")
    }

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");
        provider.set("key3", "   ");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert_eq!(provider.get_optional("key3"), None);
        assert!(provider.get_string("missing").is_err());
        assert_eq!(provider.get_int_or("missing", 7).unwrap(), 7);
        assert!(provider.get_int_or("key1", 7).is_err());
    }

    #[test]
    fn test_env_config_provider_format_key() {
        let provider = EnvConfigProvider::new().with_prefix("relay");
        assert_eq!(provider.format_key("api_key"), "RELAY_API_KEY");
        assert_eq!(provider.format_key("base-url"), "RELAY_BASE_URL");
        assert_eq!(EnvConfigProvider::new().format_key("openai_api_key"), "OPENAI_API_KEY");
    }

    #[test]
    fn test_openai_config_defaults() {
        let config = OpenAIConfig::from_provider(&base_provider()).unwrap();
        assert_eq!(config.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 400);
        assert_eq!(config.poll.interval, Duration::from_millis(1500));
        assert_eq!(config.assistant_id, None);
        assert!(config.require_assistant_id().is_err());
    }

    #[test]
    fn test_openai_config_overrides() {
        let provider = base_provider()
            .with("openai_base_url", "http://localhost:9999/v1/")
            .with("openai_assistant_id", "asst_123")
            .with("openai_temperature", "0.2")
            .with("openai_poll_interval_ms", "250")
            .with("openai_poll_max_attempts", "0")
            .with("openai_poll_timeout", "90s");

        let config = OpenAIConfig::from_provider(&provider).unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.require_assistant_id().unwrap(), "asst_123");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.poll.max_attempts, None);
        assert_eq!(config.poll.max_elapsed, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_openai_config_requires_key() {
        let err = OpenAIConfig::from_provider(&MemoryConfigProvider::new()).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_openai_config_rejects_bad_values() {
        assert!(OpenAIConfig::from_provider(&base_provider().with("openai_base_url", "not a url")).is_err());
        assert!(OpenAIConfig::from_provider(&base_provider().with("openai_temperature", "3.5")).is_err());
        assert!(OpenAIConfig::from_provider(&base_provider().with("openai_max_tokens", "many")).is_err());
        assert!(OpenAIConfig::from_provider(&base_provider().with("openai_poll_timeout", "whenever")).is_err());
    }

    #[test]
    fn test_openai_config_rejects_out_of_range_integers() {
        for (key, value) in [
            ("openai_max_tokens", "-1"),
            ("openai_timeout_seconds", "-1"),
            ("openai_poll_interval_ms", "-5"),
            ("openai_poll_max_attempts", "-1"),
            ("openai_poll_max_attempts", "4294967296"),
            ("openai_max_tokens", "4294967296"),
        ] {
            let err = OpenAIConfig::from_provider(&base_provider().with(key, value)).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{}={} gave {}", key, value, err);
        }
    }

    #[test]
    fn test_get_uint_or() {
        let provider = MemoryConfigProvider::new().with("small", "7").with("negative", "-7");
        assert_eq!(provider.get_uint_or::<u32>("small", 1).unwrap(), 7);
        assert_eq!(provider.get_uint_or::<u32>("missing", 1).unwrap(), 1);
        assert!(provider.get_uint_or::<u64>("negative", 1).is_err());
    }
}
