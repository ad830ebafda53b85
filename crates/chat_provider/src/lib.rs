//! Minimal provider-agnostic contract for one agent-completion round-trip.
//!
//! This crate defines the conversation data model shared by every front end
//! and the two remote collaborators: the agent-completion call and the audio
//! transcription call. It excludes transport details and wire payloads.

use std::fmt;

mod turn;

pub use turn::{
    data_url, ContentBlock, Role, Turn, TurnContent, DEFAULT_IMAGE_MIME_TYPE, PDF_MIME_TYPE,
};

/// Error returned while constructing/configuring a provider before any call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Generic failure of a remote call (transport, auth, or model error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Input for one agent-completion call: the full conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub turns: Vec<Turn>,
    pub instructions: String,
}

/// Audio bytes handed to the transcription call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// File name including extension; hosted transcription services infer the codec from it.
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Immutable metadata describing a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Agent-completion call: given the whole history, return the next assistant reply.
pub trait ChatProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Runs one request/response round-trip and returns the plain-text reply.
    fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}

/// Transcription call: given audio bytes, return a best-effort transcript.
pub trait Transcriber: Send + Sync + 'static {
    fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError>;
}
