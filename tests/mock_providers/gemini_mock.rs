//! WebSocket Mock Server for Gemini Live
//!
//! Accepts connections, answers the setup handshake and then relays:
//! - scripted server messages pushed by the test
//! - every client message back to the test for assertions
//!
//! Setups for models listed in `reject_models` are refused with a close
//! frame, which exercises the client's model fallback.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::accept_async;

/// What the mock should do next on the accepted session.
#[derive(Debug, Clone)]
pub enum MockAction {
    /// Send a server message
    Send(Value),
    /// Close the connection with a reason
    Close(String),
}

struct MockState {
    reject_models: Vec<String>,
    actions: Mutex<mpsc::UnboundedReceiver<MockAction>>,
    received: mpsc::UnboundedSender<Value>,
}

pub struct GeminiMock {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<Value>,
    actions: mpsc::UnboundedSender<MockAction>,
}

impl GeminiMock {
    pub async fn start() -> Self {
        Self::start_rejecting(Vec::new()).await
    }

    pub async fn start_rejecting(reject_models: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");

        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let state = Arc::new(MockState {
            reject_models,
            actions: Mutex::new(actions_rx),
            received: received_tx,
        });

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        eprintln!("Gemini mock connection error: {}", e);
                    }
                });
            }
        });

        Self {
            url: format!("ws://{}", addr),
            received: received_rx,
            actions: actions_tx,
        }
    }

    pub fn send(&self, message: Value) {
        let _ = self.actions.send(MockAction::Send(message));
    }

    pub fn close(&self, reason: &str) {
        let _ = self.actions.send(MockAction::Close(reason.to_string()));
    }

    /// Next client message that contains `key` at the top level.
    pub async fn next_with(&mut self, key: &str) -> Value {
        loop {
            let message = tokio::time::timeout(std::time::Duration::from_secs(5), self.received.recv())
                .await
                .expect("timed out waiting for client message")
                .expect("mock stopped");
            if message.get(key).is_some() {
                return message;
            }
        }
    }
}

/// Server message carrying agent audio.
pub fn audio_message(pcm: &[u8]) -> Value {
    use base64::prelude::*;
    json!({
        "serverContent": {
            "modelTurn": {
                "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": BASE64_STANDARD.encode(pcm) } }]
            }
        }
    })
}

/// Server message carrying a tool call.
pub fn tool_call_message(id: &str, name: &str, args: Value) -> Value {
    json!({
        "toolCall": { "functionCalls": [{ "id": id, "name": name, "args": args }] }
    })
}

/// Server message carrying transcripts.
pub fn transcript_message(output: Option<&str>, input: Option<&str>) -> Value {
    let mut content = serde_json::Map::new();
    if let Some(text) = output {
        content.insert("outputTranscription".into(), json!({ "text": text }));
    }
    if let Some(text) = input {
        content.insert("inputTranscription".into(), json!({ "text": text }));
    }
    json!({ "serverContent": Value::Object(content) })
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    // Setup handshake
    let setup = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str::<Value>(&text)?,
            Some(Ok(_)) => continue,
            _ => return Ok(()),
        }
    };
    let _ = state.received.send(setup.clone());

    let model = setup["setup"]["model"]
        .as_str()
        .unwrap_or_default()
        .trim_start_matches("models/")
        .to_string();
    if state.reject_models.contains(&model) {
        write
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: format!("model {model} not available").into(),
            })))
            .await?;
        return Ok(());
    }
    write
        .send(Message::Text(json!({ "setupComplete": {} }).to_string().into()))
        .await?;

    let mut actions = state.actions.lock().await;
    loop {
        tokio::select! {
            action = actions.recv() => match action {
                Some(MockAction::Send(message)) => {
                    write.send(Message::Text(message.to_string().into())).await?;
                }
                Some(MockAction::Close(reason)) => {
                    write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: reason.into(),
                        })))
                        .await?;
                    break;
                }
                None => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(message) = serde_json::from_str::<Value>(&text) {
                        let _ = state.received.send(message);
                    }
                }
                Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    Ok(())
}
