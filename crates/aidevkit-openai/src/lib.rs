#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! OpenAI API client built on the aidevkit-common plumbing
//!
//! Supports chat completions (plain and streamed), model management, speech
//! synthesis with audio decoding, and realtime WebSocket sessions.
//!
//! # Example
//!
//! ```rust,no_run
//! use aidevkit_openai::OpenAI;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAI::from_env()?;
//!
//!     let request = client
//!         .chat()
//!         .model("gpt-4o-mini")
//!         .user_message("Hello, world!")
//!         .build();
//!
//!     let response = client.send(&request).await?;
//!     println!("{}", response.content().unwrap_or("No content"));
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod error;
pub mod model;
pub mod realtime;
pub mod speech;
pub mod usage;

pub use chat::{ChatChunk, ChatRequest, ChatResponse, Message, Role};
pub use error::OpenAIError;
pub use model::{ModelInfo, Models};
pub use speech::SpeechRequest;
pub use usage::Usage;

use aidevkit_common::request_builder::{AuthMethod, RequestBuilder, RequestConfig};
use bon::Builder;
use core::fmt;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client.
#[derive(Clone, Builder)]
pub struct OpenAI {
    #[builder(into)]
    pub(crate) api_key: Option<String>,

    /// Base URL for the API (allows custom endpoints)
    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    pub(crate) base_url: String,

    /// Beta feature flags sent as `OpenAI-Beta` headers, e.g. `assistants=v2`
    #[builder(default)]
    pub(crate) beta_features: Vec<String>,

    #[builder(default)]
    pub(crate) client: reqwest::Client,
}

impl OpenAI {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            beta_features: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, OpenAIError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| OpenAIError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Enable a beta feature flag for every request.
    #[must_use]
    pub fn with_beta_feature(mut self, feature: impl Into<String>) -> Self {
        self.beta_features.push(feature.into());
        self
    }

    /// Start building a chat request.
    pub fn chat(&self) -> chat::ChatRequestBuilder {
        ChatRequest::builder()
    }

    /// Model management (list / retrieve / delete).
    #[must_use]
    pub fn models(&self) -> Models {
        Models::new(self.clone())
    }

    pub(crate) fn api_key(&self) -> Result<&str, OpenAIError> {
        self.api_key.as_deref().ok_or(OpenAIError::MissingApiKey)
    }

    /// Build the shared request dispatcher for this client.
    ///
    /// A missing API key surfaces here, at call time, as a configuration
    /// error rather than a transport failure later.
    pub(crate) fn request_builder(&self) -> Result<RequestBuilder, OpenAIError> {
        let mut config = RequestConfig::new(self.base_url.clone())
            .with_auth(AuthMethod::Bearer(self.api_key()?.to_string()));
        for feature in &self.beta_features {
            config = config.with_header("OpenAI-Beta", feature.clone());
        }
        Ok(RequestBuilder::new(self.client.clone(), config))
    }
}

impl fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAI")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("beta_features", &self.beta_features)
            .finish_non_exhaustive()
    }
}
