//! Error types for building presentations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::deck::DeckError;
use crate::llm::LlmError;
use crate::opc::OpcError;
use crate::session::SessionError;
use crate::source::SourceError;

/// Result type for slidewright operations.
pub type Result<T> = std::result::Result<T, SlideError>;

/// Error types for slidewright operations.
#[derive(Error, Debug)]
pub enum SlideError {
    /// Missing API key, a template without layouts, unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The template package is readable but not a usable presentation
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// OPC package error
    #[error("Package error: {0}")]
    Package(#[from] OpcError),

    /// Source document error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Language model request error
    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    /// Unusable slide content returned by the model
    #[error("Slide content error: {0}")]
    Deck(#[from] DeckError),

    /// Session checkpoint error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlideError {
    /// Whether a build can carry on past this error for the current slide.
    ///
    /// Model failures other than authentication and unparseable model output
    /// only cost one slide; everything else stops the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SlideError::Llm(err) => !err.is_fatal(),
            SlideError::Deck(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(!SlideError::Config(ConfigError::NoLayouts).is_recoverable());
        assert!(!SlideError::Llm(LlmError::Auth("invalid key".into())).is_recoverable());
        assert!(SlideError::Llm(LlmError::Timeout).is_recoverable());
        assert!(SlideError::Deck(DeckError::NotAList("string")).is_recoverable());
        assert!(
            !SlideError::Config(ConfigError::MissingApiKey("SLIDEWRIGHT_LLM_API_KEY")).is_recoverable()
        );
    }
}
