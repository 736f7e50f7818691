//! Error types for echocoach.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EchoError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Collaborator (generative AI service) errors
    #[error("Coach collaborator is not configured: {message}")]
    CollaboratorNotConfigured { message: String },

    #[error("Coach request failed{}: {message}", status_suffix(.status))]
    CollaboratorRequest {
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    #[error("Coach returned an unusable response: {message}")]
    CollaboratorResponse { message: String },

    // Speech input errors
    #[error("Speech recognition unavailable: {message}")]
    RecognizerUnavailable { message: String },

    #[error("Speech recognition failed: {message}")]
    Recognition { message: String },

    // Speech output errors
    #[error("Speech synthesizer not found: {tool}")]
    SynthesizerNotFound { tool: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl EchoError {
    /// True when re-submitting the same turn may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EchoError::CollaboratorRequest {
                retryable: true,
                ..
            }
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, EchoError>;
