use aidevkit_common::RequestError;
use thiserror::Error;

/// Errors returned by the OpenAI client.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Anything the shared request plumbing reports
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Missing API key (set `OPENAI_API_KEY` or pass one explicitly)
    #[error("missing API key")]
    MissingApiKey,

    /// WebSocket transport failure in a realtime session
    #[error("realtime transport error: {0}")]
    Realtime(String),
}

impl OpenAIError {
    /// Whether the failure is a content-policy outcome rather than plumbing.
    #[must_use]
    pub fn is_content_outcome(&self) -> bool {
        matches!(
            self,
            OpenAIError::Request(
                RequestError::BlockedPrompt { .. } | RequestError::StoppedCandidate { .. }
            )
        )
    }
}
