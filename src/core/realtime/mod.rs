//! Realtime speech-to-speech transport module.
//!
//! # Architecture
//!
//! - `RealtimeTransport` trait for provider abstraction
//! - Ordered single-consumer event queue instead of callbacks
//! - Gemini Live as the concrete provider
//!
//! # Audio Format
//!
//! - Outbound: PCM 16-bit signed little-endian at 16kHz
//! - Inbound: PCM 16-bit signed little-endian at 24kHz

mod base;
pub mod gemini;

pub use base::{
    FunctionCallRequest, FunctionDefinition, RealtimeAudioData, RealtimeConfig, RealtimeError,
    RealtimeResult, RealtimeTransport, ToolDefinition, ToolResponse, TranscriptDirection,
    TranscriptResult, TransportEvent,
};
pub use gemini::{GEMINI_LIVE_URL, GeminiLive, GeminiLiveModel, GeminiVoice};
