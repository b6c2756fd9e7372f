//! Gemini Live client tests against a local WebSocket mock.

mod fixtures;
mod mock_providers;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use fixtures::*;
use mock_providers::gemini_mock::{GeminiMock, audio_message, tool_call_message, transcript_message};
use mock_providers::ChannelInput;
use storefront_voice::core::audio::WavRecorderOutput;
use storefront_voice::core::outcome::{CallStatus, MemoryStore};
use storefront_voice::core::realtime::{
    GeminiLive, RealtimeConfig, RealtimeError, RealtimeTransport, ToolResponse,
    TranscriptDirection, TransportEvent,
};
use storefront_voice::core::session::{SessionComponents, SessionConfig, SessionController};
use storefront_voice::core::tools::{Catalog, ToolDispatcher, tool_declarations};

fn config(endpoint: &str) -> RealtimeConfig {
    RealtimeConfig {
        endpoint: endpoint.to_string(),
        api_key: None,
        model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
        voice: Some("Puck".to_string()),
        instructions: Some("You are Ema, a storefront assistant.".to_string()),
        tools: Some(tool_declarations()),
        input_transcription: true,
        output_transcription: true,
    }
}

async fn next_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event stream ended")
}

#[tokio::test]
async fn test_setup_handshake() {
    let mut mock = GeminiMock::start().await;
    let transport = GeminiLive::new();

    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(transport.is_ready());
    assert_eq!(
        transport.active_model().as_deref(),
        Some("gemini-2.5-flash-native-audio-preview-09-2025")
    );

    let setup = mock.next_with("setup").await;
    let setup = &setup["setup"];
    assert_eq!(setup["model"], "models/gemini-2.5-flash-native-audio-preview-09-2025");
    assert_eq!(setup["generationConfig"]["responseModalities"], json!(["AUDIO"]));
    assert_eq!(
        setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Puck"
    );
    assert_eq!(
        setup["systemInstruction"]["parts"][0]["text"],
        "You are Ema, a storefront assistant."
    );
    assert_eq!(setup["tools"][0]["functionDeclarations"].as_array().unwrap().len(), 4);
    assert!(setup["inputAudioTranscription"].is_object());
    assert!(setup["outputAudioTranscription"].is_object());

    transport.close().await.unwrap();
    assert!(!transport.is_ready());
    // Idempotent
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_model_fallback_after_rejected_setup() {
    let mut mock = GeminiMock::start_rejecting(vec![
        "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
    ])
    .await;
    let transport = GeminiLive::new();

    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert_eq!(
        transport.active_model().as_deref(),
        Some("gemini-2.5-flash-native-audio-preview")
    );

    let first = mock.next_with("setup").await;
    let second = mock.next_with("setup").await;
    assert_eq!(first["setup"]["model"], "models/gemini-2.5-flash-native-audio-preview-09-2025");
    assert_eq!(second["setup"]["model"], "models/gemini-2.5-flash-native-audio-preview");

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_every_model_rejected() {
    let mock = GeminiMock::start_rejecting(vec![
        "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
        "gemini-2.5-flash-native-audio-preview".to_string(),
        "gemini-2.0-flash-exp".to_string(),
    ])
    .await;
    let transport = GeminiLive::new();

    let err = transport.open(&config(&mock.url)).await.unwrap_err();
    assert!(matches!(err, RealtimeError::SetupRejected(_)), "{err:?}");
    assert!(!transport.is_ready());
}

#[tokio::test]
async fn test_server_messages_become_events_in_order() {
    let mock = GeminiMock::start().await;
    let transport = GeminiLive::new();
    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    let pcm = samples_to_pcm16(&[0.0, 0.25, -0.25, 0.5]);
    mock.send(audio_message(&pcm));
    mock.send(transcript_message(Some("Zdravo"), Some("Hello")));
    mock.send(tool_call_message("call-1", "check_stock", json!({ "query": "P1S" })));
    mock.send(json!({ "serverContent": { "interrupted": true } }));
    mock.send(json!({ "serverContent": { "turnComplete": true } }));

    match next_event(&mut events).await {
        TransportEvent::Audio(audio) => {
            assert_eq!(audio.data, Bytes::from(pcm));
            assert_eq!(audio.sample_rate, 24_000);
        }
        other => panic!("expected audio, got {other:?}"),
    }
    match next_event(&mut events).await {
        TransportEvent::Transcript(t) => {
            assert_eq!(t.direction, TranscriptDirection::Output);
            assert_eq!(t.text, "Zdravo");
        }
        other => panic!("expected agent transcript, got {other:?}"),
    }
    match next_event(&mut events).await {
        TransportEvent::Transcript(t) => assert_eq!(t.direction, TranscriptDirection::Input),
        other => panic!("expected user transcript, got {other:?}"),
    }
    match next_event(&mut events).await {
        TransportEvent::ToolInvocation(call) => {
            assert_eq!(call.call_id, "call-1");
            assert_eq!(call.name, "check_stock");
            assert_eq!(call.arguments["query"], "P1S");
        }
        other => panic!("expected tool call, got {other:?}"),
    }
    assert_eq!(next_event(&mut events).await, TransportEvent::Interrupted);
    assert_eq!(next_event(&mut events).await, TransportEvent::TurnComplete);

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_outbound_messages_on_the_wire() {
    let mut mock = GeminiMock::start().await;
    let transport = GeminiLive::new();
    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    mock.next_with("setup").await;

    transport.send_audio(Bytes::from_static(&[0x00, 0x01, 0xFF, 0x7F])).await.unwrap();
    let audio = mock.next_with("realtimeInput").await;
    let chunk = &audio["realtimeInput"]["mediaChunks"][0];
    assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
    assert_eq!(chunk["data"], "AAH/fw==");

    transport.send_interrupt().await.unwrap();
    let interrupt = mock.next_with("realtimeInput").await;
    assert_eq!(interrupt["realtimeInput"]["interrupt"], true);

    transport.send_text("[SYSTEM: User silent for 45s. Ask if they are there.]").await.unwrap();
    let text = mock.next_with("clientContent").await;
    assert_eq!(text["clientContent"]["turns"][0]["role"], "user");
    assert_eq!(text["clientContent"]["turnComplete"], false);

    transport
        .send_tool_response(ToolResponse {
            call_id: "call-9".to_string(),
            name: "close_call".to_string(),
            result: serde_json::Value::Null,
        })
        .await
        .unwrap();
    let response = mock.next_with("toolResponse").await;
    let function_response = &response["toolResponse"]["functionResponses"][0];
    assert_eq!(function_response["id"], "call-9");
    assert_eq!(function_response["response"]["result"], json!({ "status": "ok" }));

    transport.close().await.unwrap();
    assert_eq!(
        transport.send_text("late").await,
        Err(RealtimeError::NotConnected)
    );
}

#[tokio::test]
async fn test_close_while_senders_are_busy() {
    let mock = GeminiMock::start().await;
    let transport = Arc::new(GeminiLive::new());
    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    let frame = Bytes::from(vec![0u8; 3200]);
    let senders: Vec<_> = (0..8)
        .map(|_| {
            let transport = Arc::clone(&transport);
            let frame = frame.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    if transport.send_audio(frame.clone()).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    tokio::task::yield_now().await;

    timeout(Duration::from_secs(5), transport.close())
        .await
        .expect("close blocked behind senders")
        .unwrap();
    assert!(!transport.is_ready());

    for sender in senders {
        timeout(Duration::from_secs(5), sender).await.unwrap().unwrap();
    }
    assert_eq!(
        transport.send_audio(frame).await,
        Err(RealtimeError::NotConnected)
    );
}

#[tokio::test]
async fn test_server_close_is_terminal() {
    let mock = GeminiMock::start().await;
    let transport = GeminiLive::new();
    let mut events = transport.open(&config(&mock.url)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    mock.close("session limit reached");
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Closed {
            reason: "session limit reached".to_string()
        }
    );
    assert!(!transport.is_ready());
    assert!(timeout(Duration::from_secs(1), events.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_answers_tool_call_over_gemini() {
    let mut mock = GeminiMock::start().await;
    let (input, _mic) = ChannelInput::new(CAPTURE_RATE);
    let store = Arc::new(MemoryStore::new());
    let catalog = Arc::new(Catalog::embedded().unwrap());

    let (controller, _events) = SessionController::new(
        SessionConfig::default(),
        config(&mock.url),
        SessionComponents {
            transport: Arc::new(GeminiLive::new()),
            input,
            output: Arc::new(WavRecorderOutput::new(SERVER_RATE)),
            dispatcher: ToolDispatcher::new(catalog, store.clone()),
            call_log: store.clone(),
        },
    );
    let handle = controller.handle();
    let session = controller.spawn();

    mock.next_with("setup").await;
    mock.send(tool_call_message("stock-1", "check_stock", json!({ "query": "Bambu Lab P1S" })));

    let response = mock.next_with("toolResponse").await;
    let function_response = &response["toolResponse"]["functionResponses"][0];
    assert_eq!(function_response["id"], "stock-1");
    assert_eq!(function_response["response"]["result"]["found"], true);

    handle.stop();
    let outcome = timeout(Duration::from_secs(5), session)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome.status, CallStatus::Abandoned);
    assert_eq!(store.calls().len(), 1);
}
