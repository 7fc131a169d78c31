//! OpenAI-compatible chat completion client.

use crate::config::LlmConfig;
use crate::llm::prompt::{self, Message};
use crate::llm::{ChatContext, LanguageModel, LlmError, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocking client for `POST {endpoint}` with bearer authentication.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    config: LlmConfig,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize, Default)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl OpenAiClient {
    /// Create a client. Fails without an API key, before any request.
    pub fn new(config: &LlmConfig) -> crate::Result<Self> {
        let api_key = config.api_key()?.to_string();
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::from)?;

        Ok(Self {
            http,
            api_key,
            config: config.clone(),
        })
    }

    fn complete(&self, messages: &[Message]) -> Result<String> {
        let model = self.config.model_for(prompt::word_count(messages));
        let request = CompletionRequest {
            model,
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        };

        tracing::debug!(model, messages = messages.len(), endpoint = %self.config.endpoint, "sending chat completion");
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;
        let status = response.status();
        let text = response.text()?;
        let body: CompletionResponse = serde_json::from_str(&text).unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Auth(error_message(body.error, &text)));
        }
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body.error, &text),
            });
        }
        if let Some(error) = body.error {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        if let Some(usage) = &body.usage {
            tracing::debug!(
                model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "token usage"
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

fn error_message(error: Option<ErrorBody>, raw: &str) -> String {
    match error {
        Some(body) if !body.message.is_empty() => body.message,
        _ => raw.trim().to_string(),
    }
}

impl LanguageModel for OpenAiClient {
    fn summarize(&self, text: &str, max_words: Option<usize>) -> Result<String> {
        self.complete(&prompt::summarize_messages(text, max_words))
    }

    fn chat(&self, prompt: &str, context: Option<&ChatContext<'_>>) -> Result<String> {
        self.complete(&prompt::chat_messages(prompt, context))
    }
}
