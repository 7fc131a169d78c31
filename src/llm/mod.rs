//! Language model access.
//!
//! The builder only talks to [`LanguageModel`]; [`OpenAiClient`] implements it
//! against an OpenAI-compatible chat completion endpoint.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

use crate::deck::SlideContent;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    /// Rejected credentials; no later request can succeed either
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Response contained no message")]
    EmptyResponse,
}

impl LlmError {
    /// Whether the whole run has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LlmError::Auth(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// What the model sees besides the user prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext<'a> {
    /// Source document (or its summary) the slides are based on
    pub article: Option<&'a str>,
    /// Slides as they currently stand
    pub slides: &'a [SlideContent],
}

impl<'a> ChatContext<'a> {
    pub fn new(article: Option<&'a str>, slides: &'a [SlideContent]) -> Self {
        let article = article.filter(|text| !text.trim().is_empty());
        Self { article, slides }
    }
}

/// A chat completion model.
pub trait LanguageModel {
    /// Shorten `text`, keeping its key points, optionally to at most
    /// `max_words` words.
    fn summarize(&self, text: &str, max_words: Option<usize>) -> Result<String>;

    /// Answer a slide request. The response is expected to be a JSON list of
    /// slides, but is returned verbatim.
    fn chat(&self, prompt: &str, context: Option<&ChatContext<'_>>) -> Result<String>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for &M {
    fn summarize(&self, text: &str, max_words: Option<usize>) -> Result<String> {
        (**self).summarize(text, max_words)
    }

    fn chat(&self, prompt: &str, context: Option<&ChatContext<'_>>) -> Result<String> {
        (**self).chat(prompt, context)
    }
}
