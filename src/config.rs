//! Runtime configuration.
//!
//! The language model settings are collected once at startup from built-in
//! defaults, an optional TOML file, and `SLIDEWRIGHT_LLM_*` environment
//! variables (highest precedence), then handed to the client by reference.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of the environment variables read into [`LlmConfig`].
pub const ENV_PREFIX: &str = "SLIDEWRIGHT_LLM_";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "SLIDEWRIGHT_LLM_API_KEY";

/// Layout used for slides that do not ask for one.
pub const DEFAULT_LAYOUT: &str = "Title and Content";

/// Words per source chunk, and so per generated slide.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Source documents longer than this are summarized before they are used as
/// chat context, to stay inside a 16k token window.
pub const MAX_CONTEXT_WORDS: usize = 5000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API key not found. Set the {0} environment variable to the key of your LLM provider")]
    MissingApiKey(&'static str),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Template has no slide layouts")]
    NoLayouts,

    #[error("Invalid configuration: {0}")]
    Load(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// Settings of the chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer token; required before any request is made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Chat completion URL
    pub endpoint: String,
    /// Model for short inputs
    pub model: String,
    /// Model for inputs of `long_input_words` words or more
    pub long_context_model: String,
    pub long_input_words: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            long_context_model: "gpt-3.5-turbo-16k".to_string(),
            long_input_words: 1000,
            temperature: 0.9,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.6,
            timeout_secs: 300,
        }
    }
}

impl LlmConfig {
    /// Load defaults, then `file` if given, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(LlmConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)).extract()?)
    }

    /// The API key, or `MissingApiKey` when unset or blank.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_VAR))
    }

    /// Model to use for an input of `words` words.
    pub fn model_for(&self, words: usize) -> &str {
        if words < self.long_input_words {
            &self.model
        } else {
            &self.long_context_model
        }
    }
}
