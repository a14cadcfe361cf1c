#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Google Generative Language API client built on the aidevkit-common
//! plumbing
//!
//! Authentication uses the `key` query parameter; the API version is
//! substituted into the route's `{version}` placeholder, so a client
//! configured without one fails before anything is dispatched.

pub mod error;
pub mod generate;
pub mod model;

pub use error::GeminiError;
pub use generate::{
    Blob, Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, PromptFeedback, Role,
};
pub use model::{ListModelsResponse, ModelInfo};

use aidevkit_common::request_builder::{AuthMethod, RequestBuilder, RequestConfig};
use bon::Builder;
use core::fmt;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/{version}";
const DEFAULT_API_VERSION: &str = "v1beta";

/// Google Generative Language API client.
#[derive(Clone, Builder)]
pub struct Gemini {
    #[builder(into)]
    pub(crate) api_key: Option<String>,

    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    pub(crate) base_url: String,

    #[builder(default = DEFAULT_API_VERSION.to_string(), into)]
    pub(crate) api_version: String,

    #[builder(default)]
    pub(crate) client: reqwest::Client,
}

impl Gemini {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from `GEMINI_API_KEY` or `GOOGLE_AI_API_KEY`.
    pub fn from_env() -> Result<Self, GeminiError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_AI_API_KEY"))
            .map_err(|_| GeminiError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Build the shared request dispatcher for this client.
    pub(crate) fn request_builder(&self) -> Result<RequestBuilder, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let config = RequestConfig::new(self.base_url.clone())
            .with_api_version(self.api_version.clone())
            .with_auth(AuthMethod::QueryParam(
                "key".to_string(),
                api_key.to_string(),
            ));
        Ok(RequestBuilder::new(self.client.clone(), config))
    }
}

impl fmt::Debug for Gemini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gemini")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_call_time_error() {
        let client = Gemini::builder().build();
        assert!(matches!(
            client.request_builder().unwrap_err(),
            GeminiError::MissingApiKey
        ));
    }

    #[test]
    fn debug_redacts_the_api_key() {
        let client = Gemini::new("AIza-secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("AIza-secret"));
    }
}
