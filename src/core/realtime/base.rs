//! Base traits and types for realtime speech-to-speech transports.
//!
//! A transport owns one duplex connection to a cloud speech model. Inbound
//! traffic is surfaced as an ordered queue of [`TransportEvent`]s with a
//! single consumer (the session controller); outbound calls are
//! fire-and-forget and ordered through one queue per connection.
//!
//! # Audio Format
//!
//! - Outbound: PCM 16-bit signed little-endian, mono, 16kHz
//! - Inbound: PCM 16-bit signed little-endian, mono, 24kHz

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed or no credential configured
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The server refused the session setup
    #[error("Setup rejected: {0}")]
    SetupRejected(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection parameters for a realtime session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint (provider URL or a relay)
    pub endpoint: String,

    /// API key, appended to the endpoint when present
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default)]
    pub model: String,

    /// Prebuilt voice persona
    #[serde(default)]
    pub voice: Option<String>,

    /// System instruction for the agent
    #[serde(default)]
    pub instructions: Option<String>,

    /// Tool definitions for function calling
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Request transcripts of the user's audio
    #[serde(default)]
    pub input_transcription: bool,

    /// Request transcripts of the agent's audio
    #[serde(default)]
    pub output_transcription: bool,
}

/// Tool definition for function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Build a function tool.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters: Some(parameters),
            },
        }
    }
}

/// Function definition for tool calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Event Types
// =============================================================================

/// Which side of the conversation a transcript belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptDirection {
    /// User speech
    Input,
    /// Agent speech
    Output,
}

impl fmt::Display for TranscriptDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptDirection::Input => write!(f, "input"),
            TranscriptDirection::Output => write!(f, "output"),
        }
    }
}

/// Transcript fragment from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// The transcribed text
    pub text: String,
    /// Speaker side
    pub direction: TranscriptDirection,
}

/// Audio data from the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeAudioData {
    /// Raw audio bytes (PCM 16-bit, mono, little-endian)
    pub data: Bytes,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Function call request from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    /// Invocation id, echoed back in the response
    pub call_id: String,
    /// Function name
    pub name: String,
    /// JSON arguments
    pub arguments: serde_json::Value,
}

/// Result of a function call, correlated by `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub call_id: String,
    pub name: String,
    pub result: serde_json::Value,
}

/// Inbound events, delivered in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Session setup completed; outbound sends are accepted
    Opened,
    /// A frame of agent audio
    Audio(RealtimeAudioData),
    /// A transcript fragment
    Transcript(TranscriptResult),
    /// The agent requests a tool call
    ToolInvocation(FunctionCallRequest),
    /// The server cut the current generation short
    Interrupted,
    /// The agent finished its turn
    TurnComplete,
    /// Connection closed; terminal
    Closed { reason: String },
    /// Connection failed; terminal
    Error(RealtimeError),
}

impl TransportEvent {
    /// Whether this event ends the event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportEvent::Closed { .. } | TransportEvent::Error(_))
    }
}

// =============================================================================
// Base Trait
// =============================================================================

/// Duplex channel to a realtime speech model.
///
/// # Failure semantics
///
/// Before the session is open, setup failures make [`open`](Self::open)
/// return an error once and no events are delivered. After
/// [`TransportEvent::Opened`], any failure surfaces as exactly one terminal
/// `Closed` or `Error` event.
///
/// # Example
///
/// ```rust,ignore
/// use storefront_voice::core::realtime::{GeminiLive, RealtimeConfig, RealtimeTransport};
///
/// let transport = GeminiLive::new();
/// let mut events = transport.open(&config).await?;
/// while let Some(event) = events.recv().await {
///     // route event
/// }
/// ```
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Connect and complete session setup.
    async fn open(&self, config: &RealtimeConfig) -> RealtimeResult<mpsc::Receiver<TransportEvent>>;

    /// Send an encoded PCM16 frame at the wire rate.
    async fn send_audio(&self, frame: Bytes) -> RealtimeResult<()>;

    /// Tell the server the user interrupted the agent.
    async fn send_interrupt(&self) -> RealtimeResult<()>;

    /// Answer a tool invocation.
    async fn send_tool_response(&self, response: ToolResponse) -> RealtimeResult<()>;

    /// Inject a text message into the conversation.
    async fn send_text(&self, text: &str) -> RealtimeResult<()>;

    /// Close the connection. Idempotent.
    async fn close(&self) -> RealtimeResult<()>;

    /// Whether outbound sends are currently accepted.
    fn is_ready(&self) -> bool;

    /// Get provider information.
    fn provider_info(&self) -> serde_json::Value;
}
