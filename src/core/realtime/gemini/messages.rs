//! Gemini Live WebSocket message types.
//!
//! All messages are JSON objects with exactly one top-level key naming the
//! message kind.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Model, voice, system instruction, tools, transcription
//! - realtimeInput - Audio chunks or the interrupt signal
//! - clientContent - Text turns injected into the conversation
//! - toolResponse - Function call results
//!
//! Server messages (received from server):
//! - setupComplete - Session ready
//! - serverContent - Model audio, transcripts, interruption, turn completion
//! - toolCall - Function calls requested by the model
//! - toolCallCancellation - Function calls the model no longer needs
//! - goAway - Server will disconnect soon

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::audio::codec::WIRE_MIME_TYPE;
use crate::core::realtime::base::{
    FunctionCallRequest, RealtimeAudioData, ToolDefinition, ToolResponse, TranscriptDirection,
    TranscriptResult, TransportEvent,
};

// =============================================================================
// Shared Types
// =============================================================================

/// Text or inline-data part of a content turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Base64 media payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// A conversation turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

// =============================================================================
// Client Messages
// =============================================================================

/// Session setup payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Fully qualified model name (`models/...`)
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Group of function declarations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSet {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.function.name.clone(),
            description: tool.function.description.clone(),
            parameters: tool.function.parameters.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<Blob>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponseMessage {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: serde_json::Value,
}

/// Messages sent to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponseMessage),
}

impl ClientMessage {
    /// Wrap an encoded PCM16 frame as a realtime audio chunk.
    pub fn audio(frame: &[u8]) -> Self {
        Self::RealtimeInput(RealtimeInput {
            media_chunks: Some(vec![Blob {
                mime_type: WIRE_MIME_TYPE.to_string(),
                data: BASE64_STANDARD.encode(frame),
            }]),
            interrupt: None,
        })
    }

    /// Barge-in signal.
    pub fn interrupt() -> Self {
        Self::RealtimeInput(RealtimeInput {
            media_chunks: None,
            interrupt: Some(true),
        })
    }

    /// A user text turn that does not end the turn.
    pub fn text(text: &str) -> Self {
        Self::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            turn_complete: false,
        })
    }

    /// Tool result wrapped as `{result: ...}`; a null result is sent as `{status: "ok"}`.
    pub fn tool_response(response: ToolResponse) -> Self {
        let result = if response.result.is_null() {
            serde_json::json!({ "status": "ok" })
        } else {
            response.result
        };
        Self::ToolResponse(ToolResponseMessage {
            function_responses: vec![FunctionResponse {
                id: response.call_id,
                name: response.name,
                response: serde_json::json!({ "result": result }),
            }],
        })
    }
}

// =============================================================================
// Server Messages
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}

/// A message received from the server. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
    #[serde(default)]
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
}

impl ServerMessage {
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Translate into transport events, in the order the session must see them:
    /// audio, agent transcript, user transcript, tool calls, interruption,
    /// turn completion.
    pub fn into_events(self, sample_rate: u32) -> Vec<TransportEvent> {
        let mut events = Vec::new();

        if let Some(content) = self.server_content {
            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    let Some(blob) = part.inline_data else {
                        continue;
                    };
                    match BASE64_STANDARD.decode(blob.data.as_bytes()) {
                        Ok(data) => events.push(TransportEvent::Audio(RealtimeAudioData {
                            data: Bytes::from(data),
                            sample_rate,
                        })),
                        Err(e) => warn!("Dropping audio part with invalid base64: {}", e),
                    }
                }
            }

            for (transcription, direction) in [
                (content.output_transcription, TranscriptDirection::Output),
                (content.input_transcription, TranscriptDirection::Input),
            ] {
                if let Some(text) = transcription.and_then(|t| t.text).filter(|t| !t.is_empty()) {
                    events.push(TransportEvent::Transcript(TranscriptResult { text, direction }));
                }
            }

            if let Some(call) = self.tool_call {
                push_tool_calls(&mut events, call);
            }
            if content.interrupted {
                events.push(TransportEvent::Interrupted);
            }
            if content.turn_complete {
                events.push(TransportEvent::TurnComplete);
            }
        } else if let Some(call) = self.tool_call {
            push_tool_calls(&mut events, call);
        }

        events
    }
}

fn push_tool_calls(events: &mut Vec<TransportEvent>, call: ToolCall) {
    for fc in call.function_calls {
        events.push(TransportEvent::ToolInvocation(FunctionCallRequest {
            call_id: fc.id.unwrap_or_default(),
            name: fc.name,
            arguments: fc.args,
        }));
    }
}

// =============================================================================
// Tests
// =============================================================================
