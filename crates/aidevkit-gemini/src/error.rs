use aidevkit_common::RequestError;
use thiserror::Error;

/// Errors returned by the Gemini client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Anything the shared request plumbing reports
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Missing API key (set `GEMINI_API_KEY` or pass one explicitly)
    #[error("missing API key")]
    MissingApiKey,
}

impl GeminiError {
    /// Whether the failure is a content-policy outcome (blocked prompt or
    /// stopped candidate) rather than a transport or decode problem.
    #[must_use]
    pub fn is_content_outcome(&self) -> bool {
        matches!(
            self,
            GeminiError::Request(
                RequestError::BlockedPrompt { .. } | RequestError::StoppedCandidate { .. }
            )
        )
    }
}
