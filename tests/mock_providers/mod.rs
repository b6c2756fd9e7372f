//! Mock collaborators for the session controller and the Gemini client.
//!
//! - [`ScriptedTransport`]: an in-process `RealtimeTransport` whose inbound
//!   events are pushed by the test and whose outbound calls are recorded
//! - [`ChannelInput`]: an `AudioInput` fed from a channel, or denied
//! - [`gemini_mock`]: a WebSocket server speaking the Gemini Live protocol

// Allow dead code in test infrastructure - not every test binary uses every mock
#![allow(dead_code)]

pub mod gemini_mock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use storefront_voice::core::audio::{AudioError, AudioInput, AudioResult, CaptureStream};
use storefront_voice::core::realtime::{
    RealtimeConfig, RealtimeError, RealtimeResult, RealtimeTransport, ToolResponse, TransportEvent,
};

// =============================================================================
// Scripted transport
// =============================================================================

/// Outbound call recorded by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Audio(Bytes),
    Interrupt,
    ToolResponse(ToolResponse),
    Text(String),
}

pub struct ScriptedTransport {
    server: mpsc::Sender<TransportEvent>,
    pending: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    fail_open: Option<RealtimeError>,
    hang_open: bool,
    sent: Mutex<Vec<Sent>>,
    ready: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedTransport {
    /// A transport that opens successfully. Events sent on the returned
    /// sender are delivered after `Opened`.
    pub fn new() -> (Arc<Self>, mpsc::Sender<TransportEvent>) {
        Self::build(None, false)
    }

    /// A transport whose `open` fails with `err`.
    pub fn failing(err: RealtimeError) -> Arc<Self> {
        Self::build(Some(err), false).0
    }

    /// A transport whose `open` never completes, like a server that never
    /// acknowledges setup.
    pub fn hanging() -> Arc<Self> {
        Self::build(None, true).0
    }

    fn build(
        fail_open: Option<RealtimeError>,
        hang_open: bool,
    ) -> (Arc<Self>, mpsc::Sender<TransportEvent>) {
        let (server, rx) = mpsc::channel(64);
        let transport = Arc::new(Self {
            server: server.clone(),
            pending: Mutex::new(Some(rx)),
            fail_open,
            hang_open,
            sent: Mutex::new(Vec::new()),
            ready: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        });
        (transport, server)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn tool_responses(&self) -> Vec<ToolResponse> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::ToolResponse(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn interrupts(&self) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|s| matches!(s, Sent::Interrupt))
            .count()
    }

    pub fn audio_frames(&self) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|s| matches!(s, Sent::Audio(_)))
            .count()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, sent: Sent) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.sent.lock().push(sent);
        Ok(())
    }
}

#[async_trait]
impl RealtimeTransport for ScriptedTransport {
    async fn open(&self, _config: &RealtimeConfig) -> RealtimeResult<mpsc::Receiver<TransportEvent>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_open {
            return Err(err.clone());
        }
        if self.hang_open {
            std::future::pending::<()>().await;
        }
        let rx = self
            .pending
            .lock()
            .take()
            .ok_or_else(|| RealtimeError::InvalidConfiguration("already opened".to_string()))?;
        self.ready.store(true, Ordering::SeqCst);
        self.server
            .try_send(TransportEvent::Opened)
            .map_err(|e| RealtimeError::ProviderError(e.to_string()))?;
        Ok(rx)
    }

    async fn send_audio(&self, frame: Bytes) -> RealtimeResult<()> {
        self.record(Sent::Audio(frame))
    }

    async fn send_interrupt(&self) -> RealtimeResult<()> {
        self.record(Sent::Interrupt)
    }

    async fn send_tool_response(&self, response: ToolResponse) -> RealtimeResult<()> {
        self.record(Sent::ToolResponse(response))
    }

    async fn send_text(&self, text: &str) -> RealtimeResult<()> {
        self.record(Sent::Text(text.to_string()))
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn provider_info(&self) -> serde_json::Value {
        serde_json::json!({ "provider": "scripted" })
    }
}

// =============================================================================
// Channel input
// =============================================================================

/// Capture source fed by the test.
pub struct ChannelInput {
    sample_rate: u32,
    frames: Mutex<Option<mpsc::Receiver<Vec<f32>>>>,
    denied: bool,
    stops: AtomicUsize,
}

impl ChannelInput {
    pub fn new(sample_rate: u32) -> (Arc<Self>, mpsc::Sender<Vec<f32>>) {
        let (tx, rx) = mpsc::channel(64);
        let input = Arc::new(Self {
            sample_rate,
            frames: Mutex::new(Some(rx)),
            denied: false,
            stops: AtomicUsize::new(0),
        });
        (input, tx)
    }

    /// A capture source that refuses access.
    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            sample_rate: 16_000,
            frames: Mutex::new(None),
            denied: true,
            stops: AtomicUsize::new(0),
        })
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioInput for ChannelInput {
    async fn open(&self) -> AudioResult<CaptureStream> {
        if self.denied {
            return Err(AudioError::DeviceUnavailable("permission denied".to_string()));
        }
        let frames = self
            .frames
            .lock()
            .take()
            .ok_or_else(|| AudioError::DeviceUnavailable("already opened".to_string()))?;
        Ok(CaptureStream {
            sample_rate: self.sample_rate,
            frames,
        })
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
