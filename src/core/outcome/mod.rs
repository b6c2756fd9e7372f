//! Call-outcome aggregation.
//!
//! The aggregator collects transcripts while the call runs and produces the
//! immutable [`CallOutcome`] exactly once when it ends, reading customer
//! details and booking status from the live conversation at that moment.

pub mod records;
pub mod store;

use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::core::realtime::TranscriptDirection;
use crate::core::tools::ConversationState;

pub use records::{
    BookingStatus, CallOutcome, CallStatus, Order, OrderStatus, TranscriptEntry,
};
pub use store::{CallLogStore, JsonLinesStore, MemoryStore, OrderStore, StoreError};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The user stopped the call
    UserStop,
    /// The agent ended the call via `close_call`
    AgentClosed,
    /// The server closed the connection
    RemoteClosed(String),
    /// The transport failed after opening
    TransportError(String),
    /// Capture or transport setup failed
    SetupFailed(String),
}

impl EndReason {
    /// Call status for this reason given the booking status at close time.
    pub fn call_status(&self, booking: BookingStatus) -> CallStatus {
        match self {
            EndReason::UserStop if booking != BookingStatus::Confirmed => CallStatus::Abandoned,
            EndReason::TransportError(_) | EndReason::SetupFailed(_) => CallStatus::Failed,
            _ => CallStatus::Completed,
        }
    }
}

/// Accumulates one call's transcript and duration.
#[derive(Debug)]
pub struct CallOutcomeAggregator {
    started: Instant,
    timestamp: i64,
    transcript: Vec<TranscriptEntry>,
    finalized: bool,
}

impl CallOutcomeAggregator {
    /// Record the start instant and wall-clock timestamp.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            timestamp: unix_millis(),
            transcript: Vec::new(),
            finalized: false,
        }
    }

    pub fn record_transcript(&mut self, text: impl Into<String>, direction: TranscriptDirection) {
        if self.finalized {
            return;
        }
        self.transcript.push(TranscriptEntry {
            text: text.into(),
            direction,
        });
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Produce the call record. Returns `None` on every call after the first.
    pub fn finalize(
        &mut self,
        reason: &EndReason,
        conversation: &ConversationState,
    ) -> Option<CallOutcome> {
        if self.finalized {
            return None;
        }
        self.finalized = true;

        let duration_secs = self.started.elapsed().as_secs_f64().round() as u64;
        let booking_status = conversation.booking_status;
        let outcome = CallOutcome {
            id: Uuid::new_v4().to_string(),
            timestamp: self.timestamp,
            duration_secs,
            status: reason.call_status(booking_status),
            booking_status,
            customer_name: conversation.form.name.clone(),
            customer_phone: conversation.form.phone.clone(),
            transcript: std::mem::take(&mut self.transcript),
        };

        info!(
            call_id = %outcome.id,
            duration_secs,
            status = %outcome.status,
            booking_status = %outcome.booking_status,
            "Call finalized"
        );
        Some(outcome)
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn unix_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
