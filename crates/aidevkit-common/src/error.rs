use thiserror::Error;

/// Errors shared by every aidevkit provider client.
///
/// Variants fall into the four buckets callers care about: configuration
/// mistakes surfaced at call time, transport failures, per-item decode
/// failures, and provider-reported content outcomes embedded in an otherwise
/// successful response. Content outcomes get their own variants so callers
/// can branch on policy results versus plumbing failures.
#[derive(Error, Debug)]
pub enum RequestError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON deserialization failed, with the position reported by serde
    #[error("failed to decode JSON at line {line}, column {column}: {message}")]
    JsonDecode {
        line: usize,
        column: usize,
        message: String,
    },

    /// Invalid event data in a streaming response
    #[error("invalid event data: {0}")]
    InvalidEventData(String),

    /// Authentication is missing (no API key or token configured)
    #[error("authentication missing: no API key or token provided")]
    AuthenticationMissing,

    /// A required API version was never resolved while building the route
    #[error("route error: {0}")]
    Route(#[from] crate::route::RouteError),

    /// The response declared a content type no converter handles
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The requested operation is not supported by this provider
    #[error("unsupported task: {0}")]
    UnsupportedTask(String),

    /// The provider refused to process the prompt (content policy)
    #[error("prompt was blocked by the provider: {reason}")]
    BlockedPrompt { reason: String },

    /// The provider stopped a candidate mid-generation
    #[error("candidate generation stopped: {finish_reason}")]
    StoppedCandidate { finish_reason: String },

    /// Error response returned by the provider API
    #[error("invalid request error: {message}")]
    InvalidRequest {
        code: Option<String>,
        message: String,
        status: Option<u16>,
    },

    /// Unexpected response from the API
    #[error("unexpected response from API: {0}")]
    UnexpectedResponse(String),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// I/O errors (file downloads, output paths)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// Wrap a deserialization failure, preserving the line/column diagnostics
    /// that `serde_json` attaches to the error.
    pub fn json_decode(err: &serde_json::Error) -> Self {
        RequestError::JsonDecode {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Parse an error response body into a [`RequestError`].
///
/// Providers embed errors in slightly different JSON envelopes; all of the
/// ones we talk to carry a `message` somewhere under an `error` key, so a
/// generic extraction covers them. Anything unparseable falls back to the raw
/// body text.
pub fn parse_error_response(status: reqwest::StatusCode, bytes: bytes::Bytes) -> RequestError {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) {
        if let Some(message) = extract_error_message(&json) {
            let code = json
                .get("error")
                .and_then(|e| e.get("code"))
                .map(|c| c.to_string().trim_matches('"').to_string());
            return RequestError::InvalidRequest {
                code,
                message,
                status: Some(status.as_u16()),
            };
        }
    }

    RequestError::UnexpectedResponse(format!(
        "HTTP status {}: {}",
        status.as_u16(),
        String::from_utf8_lossy(&bytes)
    ))
}

/// Extract a human-readable message from the provider error envelopes we know.
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    // OpenAI and Google both use {"error": {"message": "..."}}
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Some(message.to_string());
    }

    // Generic top-level message field
    json.get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_error_envelope() {
        let body = bytes::Bytes::from_static(
            br#"{"error": {"message": "Invalid API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#,
        );
        let err = parse_error_response(reqwest::StatusCode::UNAUTHORIZED, body);
        match err {
            RequestError::InvalidRequest {
                code,
                message,
                status,
            } => {
                assert_eq!(code.as_deref(), Some("invalid_api_key"));
                assert_eq!(message, "Invalid API key");
                assert_eq!(status, Some(401));
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn parses_google_error_envelope() {
        let body = bytes::Bytes::from_static(
            br#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#,
        );
        let err = parse_error_response(reqwest::StatusCode::BAD_REQUEST, body);
        match err {
            RequestError::InvalidRequest { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("400"));
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body() {
        let body = bytes::Bytes::from_static(b"upstream exploded");
        let err = parse_error_response(reqwest::StatusCode::BAD_GATEWAY, body);
        match err {
            RequestError::UnexpectedResponse(text) => {
                assert!(text.contains("502"));
                assert!(text.contains("upstream exploded"));
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }

    #[test]
    fn json_decode_carries_position() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  broken").unwrap_err();
        let wrapped = RequestError::json_decode(&err);
        match wrapped {
            RequestError::JsonDecode { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("expected JsonDecode, got {other:?}"),
        }
    }
}
