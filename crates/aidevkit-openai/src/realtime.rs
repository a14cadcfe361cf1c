//! Realtime WebSocket sessions.
//!
//! The handshake injects the same bearer and beta headers the REST
//! dispatcher attaches, then exchanges JSON events over the socket.

use bon::Builder;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::{OpenAI, OpenAIError};

/// Beta flag the realtime endpoint requires.
const REALTIME_BETA: &str = "realtime=v1";

/// An event sent to the realtime endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl ClientEvent {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// An event received from the realtime endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl ServerEvent {
    /// Text delta carried by `response.text.delta` / `response.audio_transcript.delta` events.
    #[must_use]
    pub fn text_delta(&self) -> Option<&str> {
        self.kind
            .ends_with(".delta")
            .then(|| self.payload.get("delta").and_then(|d| d.as_str()))
            .flatten()
    }
}

/// A configured realtime connection attempt.
#[derive(Debug, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct RealtimeOperation {
    #[builder(into)]
    pub client: OpenAI,

    #[builder(into)]
    pub model: String,
}

impl OpenAI {
    /// Start building a realtime session.
    pub fn realtime(
        &self,
    ) -> RealtimeOperationBuilder<realtime_operation_builder::SetClient> {
        RealtimeOperation::builder().client(self.clone())
    }
}

impl RealtimeOperation {
    /// Open the WebSocket connection and return an active session.
    pub async fn connect(self) -> Result<ActiveRealtimeSession, OpenAIError> {
        let api_key = self.client.api_key()?.to_string();

        let ws_base = self
            .client
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        let url = format!("{}/realtime?model={}", ws_base.trim_end_matches('/'), self.model);

        // Same header-injection mechanism as REST: bearer auth plus the beta
        // flag, on the handshake request.
        let mut request = url
            .into_client_request()
            .map_err(|e| OpenAIError::Realtime(format!("invalid realtime URL: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            format!("Bearer {api_key}")
                .parse()
                .map_err(|_| OpenAIError::Realtime("API key is not a valid header".to_string()))?,
        );
        let beta = self
            .client
            .beta_features
            .iter()
            .find(|f| f.starts_with("realtime"))
            .map_or(REALTIME_BETA, String::as_str);
        headers.insert(
            "OpenAI-Beta",
            beta.parse()
                .map_err(|_| OpenAIError::Realtime("invalid beta header".to_string()))?,
        );

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(64 << 20);
        ws_config.max_frame_size = Some(16 << 20);

        let (ws_stream, _) = connect_async_with_config(request, Some(ws_config), false)
            .await
            .map_err(|e| OpenAIError::Realtime(format!("WebSocket connection failed: {e}")))?;

        debug!(model = self.model, "realtime session established");
        let (sender, receiver) = ws_stream.split();
        Ok(ActiveRealtimeSession { sender, receiver })
    }
}

/// An established realtime session.
pub struct ActiveRealtimeSession {
    sender: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>,
    receiver: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl ActiveRealtimeSession {
    /// Send one JSON event.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), OpenAIError> {
        let json = serde_json::to_string(event)
            .map_err(|e| OpenAIError::Request(aidevkit_common::RequestError::Json(e)))?;
        self.sender
            .send(WsMessage::text(json))
            .await
            .map_err(|e| OpenAIError::Realtime(e.to_string()))
    }

    /// Receive the next server event.
    ///
    /// Returns `None` when the server closes the connection cleanly.
    /// Non-text frames are skipped; pings are answered by the transport.
    pub async fn receive(&mut self) -> Option<Result<ServerEvent, OpenAIError>> {
        loop {
            match self.receiver.next().await? {
                Ok(WsMessage::Text(text)) => {
                    return Some(
                        serde_json::from_str::<ServerEvent>(&text).map_err(|e| {
                            OpenAIError::Realtime(format!("malformed server event: {e}"))
                        }),
                    );
                }
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(OpenAIError::Realtime(e.to_string()))),
            }
        }
    }

    /// Close the session.
    pub async fn close(mut self) -> Result<(), OpenAIError> {
        self.sender
            .send(WsMessage::Close(None))
            .await
            .map_err(|e| OpenAIError::Realtime(e.to_string()))
    }
}
