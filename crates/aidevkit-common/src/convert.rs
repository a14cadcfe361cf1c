//! Content-type aware response conversion.
//!
//! Responses are classified by their declared MIME type and routed to the
//! matching converter: JSON bodies deserialize into typed values, recognized
//! audio types decode into playable buffers, recognized image types decode
//! into pixel buffers, and anything else in binary mode is saved to disk as
//! an opaque file.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::audio::{self, AudioData, AudioEncoding, DEFAULT_SAMPLE_RATE};
use crate::error::RequestError;

/// What the declared content type tells us to do with the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// JSON or form-encoded body: deserialize into the caller's type.
    Json,
    /// A recognized audio encoding.
    Audio(AudioEncoding),
    /// A decodable image format.
    Image(image::ImageFormat),
    /// GIF is declared but explicitly unsupported.
    Gif,
    /// A text-mode type we do not parse (XML, CSV, HTML, multipart).
    UnsupportedText,
    /// Anything else: opaque bytes.
    Opaque,
}

/// Classify a `Content-Type` header value.
#[must_use]
pub fn classify(content_type: &str) -> MediaKind {
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return MediaKind::Opaque;
    };

    let subtype = mime.subtype().as_str().to_ascii_lowercase();
    match (mime.type_(), subtype.as_str()) {
        (mime::APPLICATION, "json") | (mime::APPLICATION, "x-www-form-urlencoded") => {
            MediaKind::Json
        }
        (mime::TEXT, "json") => MediaKind::Json,
        (mime::AUDIO, "mpeg" | "mp3") => MediaKind::Audio(AudioEncoding::Mp3),
        (mime::AUDIO, "wav" | "wave" | "x-wav") => MediaKind::Audio(AudioEncoding::Wav),
        (mime::AUDIO, "pcm" | "l16") => MediaKind::Audio(AudioEncoding::Pcm16),
        (mime::AUDIO, "basic" | "mulaw" | "x-mulaw" | "pcmu") => {
            MediaKind::Audio(AudioEncoding::Mulaw)
        }
        (mime::AUDIO, "alaw" | "x-alaw" | "pcma") => MediaKind::Audio(AudioEncoding::Alaw),
        (mime::IMAGE, "gif") => MediaKind::Gif,
        (mime::IMAGE, "png") => MediaKind::Image(image::ImageFormat::Png),
        (mime::IMAGE, "jpeg" | "jpg") => MediaKind::Image(image::ImageFormat::Jpeg),
        (mime::IMAGE, "webp") => MediaKind::Image(image::ImageFormat::WebP),
        (mime::TEXT, "xml" | "csv" | "html") | (mime::APPLICATION, "xml") => {
            MediaKind::UnsupportedText
        }
        (mime::MULTIPART, _) => MediaKind::UnsupportedText,
        _ => MediaKind::Opaque,
    }
}

/// Deserialize a JSON body, falling back to `T::default()` on failure.
///
/// Decode failures are logged with the line and column serde reports; the
/// operation itself never fails on a bad body.
#[must_use]
pub fn json_or_default<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    match serde_json::from_slice::<T>(bytes) {
        Ok(value) => value,
        Err(err) => {
            error!(
                line = err.line(),
                column = err.column(),
                "failed to deserialize response body, using default: {err}"
            );
            T::default()
        }
    }
}

/// Parse a text-mode response body into the caller's type when the content
/// type supports it. Unsupported text types are logged and yield `None`: the
/// response is returned without a parsed body.
#[must_use]
pub fn parse_text_body<T: DeserializeOwned + Default>(
    content_type: &str,
    bytes: &[u8],
) -> Option<T> {
    match classify(content_type) {
        MediaKind::Json => Some(json_or_default(bytes)),
        MediaKind::UnsupportedText => {
            warn!(content_type, "unsupported text content type, body not parsed");
            None
        }
        _ => None,
    }
}

/// Result of converting a binary-mode response payload.
#[derive(Debug)]
pub enum BinaryPayload {
    Audio(AudioData),
    Image(image::DynamicImage),
    /// Opaque bytes saved to the caller-supplied path.
    File(PathBuf),
    /// Opaque bytes with nowhere to go.
    Raw(Bytes),
}

/// Convert a binary-mode response payload according to its content type.
///
/// When `output_path` is given, audio and opaque payloads are also written
/// there (parent directories are created on demand).
pub async fn convert_binary(
    content_type: &str,
    bytes: Bytes,
    output_path: Option<&Path>,
) -> Result<BinaryPayload, RequestError> {
    match classify(content_type) {
        MediaKind::Audio(encoding) => {
            let (rate, channels) = pcm_params(content_type);
            let audio = audio::decode_with(encoding, &bytes, rate, channels)
                .map_err(|e| RequestError::InvalidEventData(e.to_string()))?;
            if let Some(path) = output_path {
                write_to_path(path, &bytes).await?;
            }
            Ok(BinaryPayload::Audio(audio))
        }
        MediaKind::Gif => {
            error!("GIF responses are not supported");
            Err(RequestError::UnsupportedContentType(
                content_type.to_string(),
            ))
        }
        MediaKind::Image(format) => {
            let img = image::load_from_memory_with_format(&bytes, format)
                .map_err(|e| RequestError::InvalidEventData(e.to_string()))?;
            if let Some(path) = output_path {
                write_to_path(path, &bytes).await?;
            }
            Ok(BinaryPayload::Image(img))
        }
        _ => {
            // Best effort: save opaque bytes to disk when a path was given.
            if let Some(path) = output_path {
                write_to_path(path, &bytes).await?;
                Ok(BinaryPayload::File(path.to_path_buf()))
            } else {
                Ok(BinaryPayload::Raw(bytes))
            }
        }
    }
}

/// Sample rate and channel count hints from content-type parameters,
/// e.g. `audio/L16;rate=24000;channels=2`.
fn pcm_params(content_type: &str) -> (u32, u16) {
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return (DEFAULT_SAMPLE_RATE, 1);
    };
    let rate = mime
        .get_param("rate")
        .and_then(|v| v.as_str().parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE);
    let channels = mime
        .get_param("channels")
        .and_then(|v| v.as_str().parse().ok())
        .unwrap_or(1);
    (rate, channels)
}

async fn write_to_path(path: &Path, bytes: &[u8]) -> Result<(), RequestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
