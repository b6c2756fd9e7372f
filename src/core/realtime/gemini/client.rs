//! Gemini Live client implementation.
//!
//! Implements [`RealtimeTransport`] over the Gemini Live bidirectional
//! WebSocket API, either directly or through a relay that speaks the same
//! protocol.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<key>`
//! - Protocol: WebSocket with JSON messages (text or binary frames)
//! - Audio: PCM 16-bit mono little-endian, 16kHz in / 24kHz out, base64 encoded
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_voice::core::realtime::{GeminiLive, RealtimeConfig, RealtimeTransport};
//!
//! let transport = GeminiLive::new();
//! let mut events = transport.open(&RealtimeConfig {
//!     endpoint: GEMINI_LIVE_URL.to_string(),
//!     api_key: Some("...".to_string()),
//!     model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
//!     ..Default::default()
//! }).await?;
//!
//! transport.send_audio(frame).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use super::config::{
    GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiVoice, SETUP_TIMEOUT_SECS, connection_url,
    model_attempts,
};
use super::messages::{
    ClientMessage, Content, FunctionDeclaration, GenerationConfig, Part, PrebuiltVoiceConfig,
    ServerMessage, Setup, SpeechConfig, ToolSet, VoiceConfig,
};
use crate::core::realtime::base::{
    RealtimeConfig, RealtimeError, RealtimeResult, RealtimeTransport, ToolResponse,
    TransportEvent,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for inbound transport events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `close` waits for the connection task to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// =============================================================================
// Gemini Live Client
// =============================================================================

/// Gemini Live transport.
///
/// All mutable state is behind `Arc` so the value can be shared between the
/// session run loop and tool tasks; the spawned connection task owns the
/// socket and is fed through a single ordered outbound queue.
pub struct GeminiLive {
    /// Connected flag (shared with connection task)
    connected: Arc<AtomicBool>,
    /// WebSocket sender channel; `None` once closed
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,
    /// Connection task handle
    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Model accepted by the server during setup
    active_model: Arc<parking_lot::RwLock<Option<String>>>,
    setup_timeout: Duration,
}

impl GeminiLive {
    pub fn new() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            connection_handle: Arc::new(Mutex::new(None)),
            active_model: Arc::new(parking_lot::RwLock::new(None)),
            setup_timeout: Duration::from_secs(SETUP_TIMEOUT_SECS),
        }
    }

    /// Override how long each model attempt waits for `setupComplete`.
    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    /// Model the server accepted, once open.
    pub fn active_model(&self) -> Option<String> {
        self.active_model.read().clone()
    }

    /// Build the setup payload for one model attempt.
    pub fn build_setup(config: &RealtimeConfig, model: &str) -> Setup {
        let voice = config
            .voice
            .as_deref()
            .map(GeminiVoice::from_str_or_default)
            .unwrap_or_default();

        let tools = config
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| {
                vec![ToolSet {
                    function_declarations: tools.iter().map(FunctionDeclaration::from).collect(),
                }]
            })
            .unwrap_or_default();

        Setup {
            model: format!("models/{model}"),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.as_str().to_string(),
                        },
                    },
                }),
            },
            system_instruction: config.instructions.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.clone()),
                    inline_data: None,
                }],
            }),
            tools,
            input_audio_transcription: config
                .input_transcription
                .then(|| serde_json::json!({})),
            output_audio_transcription: config
                .output_transcription
                .then(|| serde_json::json!({})),
        }
    }

    /// Connect and run the setup handshake for a single model.
    async fn connect_with_model(
        &self,
        url: &url::Url,
        config: &RealtimeConfig,
        model: &str,
    ) -> RealtimeResult<WsStream> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(classify_connect_error)?;

        let setup = ClientMessage::Setup(Self::build_setup(config, model));
        let json = serde_json::to_string(&setup)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws.send(Message::Text(json.into()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;

        match tokio::time::timeout(self.setup_timeout, await_setup_complete(&mut ws)).await {
            Ok(Ok(())) => Ok(ws),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let _ = ws.close(None).await;
                Err(RealtimeError::Timeout(format!(
                    "no setupComplete for {model} within {:?}",
                    self.setup_timeout
                )))
            }
        }
    }

    /// Send a message to the WebSocket.
    async fn send_message(&self, message: ClientMessage) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        // Clone out so a full queue never holds the lock
        let sender = self.ws_sender.lock().await.clone();
        match sender {
            Some(sender) => sender
                .send(message)
                .await
                .map_err(|e| RealtimeError::WebSocketError(e.to_string())),
            None => Err(RealtimeError::NotConnected),
        }
    }
}

impl Default for GeminiLive {
    fn default() -> Self {
        Self::new()
    }
}

/// Read frames until the server acknowledges setup.
async fn await_setup_complete(ws: &mut WsStream) -> RealtimeResult<()> {
    while let Some(msg) = ws.next().await {
        let parsed = match msg {
            Ok(Message::Text(text)) => serde_json::from_str::<ServerMessage>(&text),
            Ok(Message::Binary(data)) => serde_json::from_slice::<ServerMessage>(&data),
            Ok(Message::Ping(data)) => {
                let _ = ws.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| format!("{} ({})", f.reason.as_str(), u16::from(f.code)))
                    .unwrap_or_else(|| "closed without reason".to_string());
                return Err(RealtimeError::SetupRejected(reason));
            }
            Ok(_) => continue,
            Err(e) => return Err(RealtimeError::WebSocketError(e.to_string())),
        };

        match parsed {
            Ok(message) if message.is_setup_complete() => return Ok(()),
            Ok(_) => debug!("Ignoring message received before setupComplete"),
            Err(e) => warn!("Failed to parse server message during setup: {}", e),
        }
    }
    Err(RealtimeError::SetupRejected(
        "connection ended before setupComplete".to_string(),
    ))
}

fn classify_connect_error(err: tungstenite::Error) -> RealtimeError {
    match &err {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            RealtimeError::AuthenticationFailed(format!("server returned {}", response.status()))
        }
        _ => RealtimeError::ConnectionFailed(err.to_string()),
    }
}

#[async_trait]
impl RealtimeTransport for GeminiLive {
    async fn open(&self, config: &RealtimeConfig) -> RealtimeResult<mpsc::Receiver<TransportEvent>> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(RealtimeError::InvalidConfiguration(
                "transport is already open".to_string(),
            ));
        }

        let endpoint = if config.endpoint.is_empty() {
            GEMINI_LIVE_URL
        } else {
            config.endpoint.as_str()
        };
        let api_key = config.api_key.as_deref().filter(|k| !k.is_empty());
        if api_key.is_none() && endpoint == GEMINI_LIVE_URL {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required for the Gemini Live endpoint".to_string(),
            ));
        }

        let url = connection_url(endpoint, api_key)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("invalid endpoint: {e}")))?;

        let mut last_error = None;
        let mut opened = None;
        for model in model_attempts(&config.model) {
            match self.connect_with_model(&url, config, &model).await {
                Ok(ws) => {
                    opened = Some((ws, model));
                    break;
                }
                Err(e @ (RealtimeError::SetupRejected(_) | RealtimeError::Timeout(_))) => {
                    warn!(model = %model, "Model setup failed, trying next: {}", e);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Failed to connect to Gemini Live: {}", e);
                    return Err(e);
                }
            }
        }

        let Some((ws, model)) = opened else {
            return Err(last_error.unwrap_or_else(|| {
                RealtimeError::SetupRejected("no model accepted the session".to_string())
            }));
        };

        info!(model = %model, "Gemini Live session opened");
        *self.active_model.write() = Some(model);

        let (mut ws_sink, mut ws_stream) = ws.split();
        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(EVENT_CHANNEL_CAPACITY);

        *self.ws_sender.lock().await = Some(tx);
        self.connected.store(true, Ordering::SeqCst);

        // Receiver is still in hand, so this cannot fail
        let _ = event_tx.send(TransportEvent::Opened).await;

        let connected = self.connected.clone();
        let handle = tokio::spawn(async move {
            let terminal = loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(message) = outgoing else {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break TransportEvent::Closed { reason: "closed by client".to_string() };
                        };

                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize message: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send WebSocket message: {}", e);
                            break TransportEvent::Error(RealtimeError::WebSocketError(e.to_string()));
                        }
                    }

                    incoming = ws_stream.next() => {
                        let parsed = match incoming {
                            Some(Ok(Message::Text(text))) => serde_json::from_str::<ServerMessage>(&text),
                            Some(Ok(Message::Binary(data))) => serde_json::from_slice::<ServerMessage>(&data),
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                                continue;
                            }
                            Some(Ok(Message::Close(frame))) => {
                                let reason = frame
                                    .map(|f| f.reason.as_str().to_string())
                                    .filter(|r| !r.is_empty())
                                    .unwrap_or_else(|| "closed by server".to_string());
                                info!(reason = %reason, "WebSocket closed by server");
                                break TransportEvent::Closed { reason };
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break TransportEvent::Error(RealtimeError::WebSocketError(e.to_string()));
                            }
                            None => break TransportEvent::Closed { reason: "connection ended".to_string() },
                        };

                        let message = match parsed {
                            Ok(m) => m,
                            Err(e) => {
                                warn!("Failed to parse server message: {}", e);
                                continue;
                            }
                        };

                        if let Some(go_away) = &message.go_away {
                            warn!(time_left = ?go_away.time_left, "Server sent goAway");
                        }
                        if let Some(cancel) = &message.tool_call_cancellation {
                            debug!(ids = ?cancel.ids, "Tool calls cancelled by server");
                        }

                        let mut receiver_gone = false;
                        for event in message.into_events(GEMINI_OUTPUT_SAMPLE_RATE) {
                            if event_tx.send(event).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        if receiver_gone {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break TransportEvent::Closed { reason: "event receiver dropped".to_string() };
                        }
                    }
                }
            };

            connected.store(false, Ordering::SeqCst);
            let _ = event_tx.send(terminal).await;
            info!("Gemini Live connection task ended");
        });

        *self.connection_handle.lock().await = Some(handle);
        Ok(event_rx)
    }

    async fn send_audio(&self, frame: Bytes) -> RealtimeResult<()> {
        self.send_message(ClientMessage::audio(&frame)).await
    }

    async fn send_interrupt(&self) -> RealtimeResult<()> {
        self.send_message(ClientMessage::interrupt()).await
    }

    async fn send_tool_response(&self, response: ToolResponse) -> RealtimeResult<()> {
        self.send_message(ClientMessage::tool_response(response)).await
    }

    async fn send_text(&self, text: &str) -> RealtimeResult<()> {
        self.send_message(ClientMessage::text(text)).await
    }

    async fn close(&self) -> RealtimeResult<()> {
        // Dropping the sender ends the connection task's outbound loop
        let sender = self.ws_sender.lock().await.take();
        let handle = self.connection_handle.lock().await.take();
        self.connected.store(false, Ordering::SeqCst);

        if sender.is_none() && handle.is_none() {
            return Ok(());
        }
        drop(sender);

        if let Some(mut handle) = handle {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                warn!("Connection task did not stop in time, aborting");
                handle.abort();
            }
        }

        info!("Disconnected from Gemini Live");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "gemini",
            "api_type": "WebSocket Live",
            "endpoint": GEMINI_LIVE_URL,
            "active_model": self.active_model(),
            "supported_models": model_attempts(""),
            "supported_voices": GeminiVoice::all().iter().map(|v| v.as_str()).collect::<Vec<_>>(),
            "input_sample_rate": 16000,
            "output_sample_rate": GEMINI_OUTPUT_SAMPLE_RATE,
            "features": {
                "bidirectional_audio": true,
                "function_calling": true,
                "transcription": true,
                "model_fallback": true
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::base::ToolDefinition;

    fn config() -> RealtimeConfig {
        RealtimeConfig {
            endpoint: GEMINI_LIVE_URL.to_string(),
            api_key: Some("test_key".to_string()),
            model: "gemini-2.0-flash-exp".to_string(),
            voice: Some("Fenrir".to_string()),
            instructions: Some("Be brief.".to_string()),
            tools: Some(vec![ToolDefinition::function(
                "close_call",
                "End the call",
                serde_json::json!({ "type": "OBJECT", "properties": {} }),
            )]),
            input_transcription: true,
            output_transcription: true,
        }
    }

    #[tokio::test]
    async fn test_api_key_required_for_default_endpoint() {
        let transport = GeminiLive::new();
        let config = RealtimeConfig {
            api_key: None,
            ..config()
        };
        let err = transport.open(&config).await.unwrap_err();
        assert!(matches!(err, RealtimeError::AuthenticationFailed(_)));
        assert!(!transport.is_ready());
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let transport = GeminiLive::new();
        let config = RealtimeConfig {
            endpoint: "not a url".to_string(),
            ..config()
        };
        let err = transport.open(&config).await.unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let transport = GeminiLive::new();
        let result = transport.send_audio(Bytes::from_static(&[0, 0])).await;
        assert_eq!(result, Err(RealtimeError::NotConnected));
        assert_eq!(transport.send_interrupt().await, Err(RealtimeError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_without_open_is_noop() {
        let transport = GeminiLive::new();
        assert!(transport.close().await.is_ok());
        assert!(transport.close().await.is_ok());
    }

    #[test]
    fn test_build_setup() {
        let setup = GeminiLive::build_setup(&config(), "gemini-2.0-flash-exp");
        let value = serde_json::to_value(&setup).unwrap();

        assert_eq!(value["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(value["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            value["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Fenrir"
        );
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(value["tools"][0]["functionDeclarations"][0]["name"], "close_call");
        assert!(value.get("inputAudioTranscription").is_some());
        assert!(value.get("outputAudioTranscription").is_some());
    }

    #[test]
    fn test_provider_info() {
        let transport = GeminiLive::new();
        let info = transport.provider_info();
        assert_eq!(info["provider"], "gemini");
        assert_eq!(info["output_sample_rate"], 24000);
        assert!(info["active_model"].is_null());
    }
}
