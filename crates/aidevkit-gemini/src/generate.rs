use aidevkit_common::request_builder::{Endpoint, HttpMethod, StreamOptions};
use aidevkit_common::{BoxStream, RequestError, StreamChunk};
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{Gemini, GeminiError};

/// Role of a content turn
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One part of a content turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

/// Base64-encoded inline media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    /// Encode raw bytes for inline transport.
    pub fn new(mime_type: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
        use base64::Engine;
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()),
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect()
    }
}

/// Generation tuning options
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Request for content generation
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct GenerateContentRequest {
    #[builder(field)]
    pub contents: Vec<Content>,

    /// Model name, used in the route, not serialized into the body
    #[serde(skip)]
    #[builder(into)]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl<S: generate_content_request_builder::State> GenerateContentRequestBuilder<S> {
    /// Add a user turn
    pub fn user_message(mut self, text: impl Into<String>) -> Self {
        self.contents.push(Content::user(text));
        self
    }

    /// Add a model turn
    pub fn model_message(mut self, text: impl Into<String>) -> Self {
        self.contents.push(Content::model(text));
        self
    }

    /// Add an arbitrary turn
    pub fn content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }
}

/// Feedback about the prompt itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// One generated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Response from content generation; streamed responses arrive as a sequence
/// of these with partial candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Finish reasons that are normal completion rather than a policy stop.
const NORMAL_FINISH: [&str; 2] = ["STOP", "MAX_TOKENS"];

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    #[must_use]
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(Content::text)
            .unwrap_or_default()
    }

    /// Map provider-reported content outcomes to dedicated errors.
    ///
    /// A blocked prompt or a candidate stopped for anything other than a
    /// normal finish is surfaced as its own error variant, distinct from
    /// transport failures, so callers can branch on policy outcomes.
    pub fn into_checked(self) -> Result<Self, RequestError> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(RequestError::BlockedPrompt { reason });
        }

        if let Some(finish_reason) = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            if !NORMAL_FINISH.contains(&finish_reason) {
                return Err(RequestError::StoppedCandidate {
                    finish_reason: finish_reason.to_string(),
                });
            }
        }

        Ok(self)
    }
}

impl StreamChunk for GenerateContentResponse {
    fn to_text_delta(&self) -> Option<String> {
        let text = self.text();
        (!text.is_empty()).then_some(text)
    }
}

impl Gemini {
    /// Start building a generate-content request.
    pub fn generate(&self) -> GenerateContentRequestBuilder {
        GenerateContentRequest::builder()
    }

    /// Send a generate-content request and get the full response.
    pub async fn send(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let builder = self.request_builder()?;
        let endpoint = Endpoint::new(format!("models/{}", request.model), HttpMethod::Post)
            .with_rpc_method("generateContent");
        let response: GenerateContentResponse =
            builder.request_json(&endpoint, Some(request)).await?;
        Ok(response.into_checked()?)
    }

    /// Stream a generate-content request over SSE.
    ///
    /// Uses `alt=sse` and no `"stream"` body field; every chunk goes through
    /// the same content-outcome check as a full response.
    pub fn stream(
        &self,
        request: &GenerateContentRequest,
    ) -> BoxStream<'static, Result<GenerateContentResponse, GeminiError>> {
        use futures_util::StreamExt;

        let builder = match self.request_builder() {
            Ok(builder) => builder,
            Err(err) => return Box::pin(futures_util::stream::once(async move { Err(err) })),
        };
        let endpoint = Endpoint::new(format!("models/{}", request.model), HttpMethod::Post)
            .with_rpc_method("streamGenerateContent")
            .with_query("alt", "sse");

        let body = match serde_json::to_value(request) {
            Ok(value) => Some(value),
            Err(err) => {
                return Box::pin(futures_util::stream::once(async move {
                    Err(GeminiError::Request(RequestError::Json(err)))
                }));
            }
        };

        let inner = builder.stream_with_options::<GenerateContentResponse>(
            &endpoint,
            body,
            StreamOptions {
                set_stream_field: false,
            },
        );
        Box::pin(inner.map(|item| {
            item.map_err(GeminiError::from)
                .and_then(|chunk| chunk.into_checked().map_err(GeminiError::from))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#,
        )
        .expect("response parses");
        assert_eq!(response.text(), "Hello");
    }

    #[test]
    fn blocked_prompt_maps_to_dedicated_error() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .expect("response parses");
        let err = response.into_checked().unwrap_err();
        assert!(matches!(
            err,
            RequestError::BlockedPrompt { reason } if reason == "SAFETY"
        ));
    }

    #[test]
    fn safety_stop_maps_to_stopped_candidate() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":null,"finishReason":"SAFETY"}]}"#,
        )
        .expect("response parses");
        let err = response.into_checked().unwrap_err();
        assert!(matches!(
            err,
            RequestError::StoppedCandidate { finish_reason } if finish_reason == "SAFETY"
        ));
    }

    #[test]
    fn normal_finish_passes_through() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"ok"}]},"finishReason":"STOP"}]}"#,
        )
        .expect("response parses");
        assert!(response.into_checked().is_ok());
    }

    #[test]
    fn request_body_skips_model_field() {
        let request = GenerateContentRequest::builder()
            .model("gemini-2.0-flash")
            .user_message("hi")
            .build();
        let value = serde_json::to_value(&request).expect("serializes");
        assert!(value.get("model").is_none());
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }
}
