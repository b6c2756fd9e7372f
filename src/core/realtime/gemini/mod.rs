//! Gemini Live realtime transport.

pub mod client;
pub mod config;
pub mod messages;

pub use client::GeminiLive;
pub use config::{
    GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveModel, GeminiVoice, SETUP_TIMEOUT_SECS,
    model_attempts,
};
