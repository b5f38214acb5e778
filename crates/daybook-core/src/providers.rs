//! Collaborator interfaces
//!
//! AI text operations and speech synthesis run outside this crate. The core
//! only needs their results so it can persist history records; these traits
//! are the boundary. Implementations live with the application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AiOpKind;

/// Errors reported by an AI or TTS provider, passed through unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{provider}: {message}")]
    Other { provider: String, message: String },
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout | ProviderError::Network(_) | ProviderError::RateLimitExceeded(_)
        )
    }
}

/// Result of an AI text operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiOutput {
    pub result_text: String,
    pub provider: String,
    pub model: String,
}

/// Something that can transform text (polish, expand, ...)
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn process(&self, text: &str, kind: &AiOpKind) -> Result<AiOutput, ProviderError>;
}

/// Synthesized audio payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// File extension for the blob, e.g. "mp3"
    pub format: String,
}

/// Something that can turn text into speech
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
    ) -> Result<SynthesizedAudio, ProviderError>;
}
