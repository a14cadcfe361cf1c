use aidevkit_common::request_builder::{Endpoint, HttpMethod};
use aidevkit_common::{BoxStream, StreamChunk};
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{OpenAI, OpenAIError, Usage};

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Name of the participant, for multi-user conversations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            name: None,
        }
    }
}

/// Request for chat completion
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct ChatRequest {
    /// List of messages in the conversation
    #[builder(field)]
    pub messages: Vec<Message>,

    /// The model to use for completion
    #[builder(into)]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Whether to stream the response. Set automatically by
    /// [`OpenAI::stream`].
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(skip)]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl<S: chat_request_builder::State> ChatRequestBuilder<S> {
    /// Add a system message
    pub fn system_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Add a user message
    pub fn user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Add an assistant message
    pub fn assistant_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    /// Add an arbitrary message
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// Response from chat completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<Choice>,

    pub usage: Option<Usage>,
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if available
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// One streamed delta of a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub choices: Vec<ChoiceDelta>,
}

/// Streaming choice delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDelta {
    pub index: u32,
    pub delta: MessageDelta,
    pub finish_reason: Option<String>,
}

/// Partial message for streaming
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamChunk for ChatChunk {
    fn to_text_delta(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.clone())
    }
}

impl OpenAI {
    /// Send a chat request and get the full response.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, OpenAIError> {
        let builder = self.request_builder()?;
        let endpoint = Endpoint::new("chat/completions", HttpMethod::Post);
        let response = builder.request_json(&endpoint, Some(request)).await?;
        Ok(response)
    }

    /// Send a chat request and stream the response chunks.
    ///
    /// The dispatcher sets `"stream": true` on the body and yields one
    /// [`ChatChunk`] per SSE Data value until the `[DONE]` sentinel.
    pub fn stream(
        &self,
        request: &ChatRequest,
    ) -> BoxStream<'static, Result<ChatChunk, OpenAIError>> {
        use futures_util::StreamExt;

        let builder = match self.request_builder() {
            Ok(builder) => builder,
            Err(err) => return Box::pin(futures_util::stream::once(async move { Err(err) })),
        };
        let endpoint = Endpoint::new("chat/completions", HttpMethod::Post);
        let inner = builder.stream::<ChatChunk, ChatRequest>(&endpoint, Some(request));
        Box::pin(inner.map(|item| item.map_err(OpenAIError::from)))
    }
}
