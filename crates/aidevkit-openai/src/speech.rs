use std::path::Path;

use aidevkit_common::audio::AudioData;
use aidevkit_common::convert::BinaryPayload;
use aidevkit_common::request_builder::{Endpoint, HttpMethod};
use aidevkit_common::RequestError;
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{OpenAI, OpenAIError};

/// Request for speech synthesis
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct SpeechRequest {
    #[builder(into)]
    pub model: String,

    /// Text to synthesize
    #[builder(into)]
    pub input: String,

    #[builder(into)]
    pub voice: String,

    /// Wire format of the returned audio (`mp3`, `wav`, `pcm`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub response_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl OpenAI {
    /// Synthesize speech and decode the binary response by content type.
    ///
    /// When `output_path` is given the raw payload is also written there,
    /// creating parent directories on demand.
    pub async fn speech(
        &self,
        request: &SpeechRequest,
        output_path: Option<&Path>,
    ) -> Result<AudioData, OpenAIError> {
        let builder = self.request_builder()?;
        let endpoint = Endpoint::new("audio/speech", HttpMethod::Post);
        let payload = builder
            .request_media(&endpoint, Some(request), output_path)
            .await?;

        match payload {
            BinaryPayload::Audio(audio) => Ok(audio),
            other => Err(OpenAIError::Request(RequestError::UnexpectedResponse(
                format!("speech endpoint returned a non-audio payload: {other:?}"),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_set_fields() {
        let request = SpeechRequest::builder()
            .model("gpt-4o-mini-tts")
            .input("hello")
            .voice("alloy")
            .build();
        let value = serde_json::to_value(&request).expect("serializes");
        assert_eq!(value["model"], "gpt-4o-mini-tts");
        assert!(value.get("response_format").is_none());
        assert!(value.get("speed").is_none());
    }
}
