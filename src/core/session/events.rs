//! Messages into and out of a running session.

use std::time::Duration;

use super::state::SessionState;
use crate::core::outcome::CallOutcome;
use crate::core::realtime::TranscriptResult;
use crate::core::tools::{ContactForm, ReportSummary};

/// Events for the UI, delivered in order on one channel.
///
/// The last event of every session is either [`SessionEvent::Ended`] or
/// [`SessionEvent::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Transcript(TranscriptResult),
    FormUpdated(ContactForm),
    ReportConfirmed(ReportSummary),
    /// User speech cut the agent off; carries the new turn id
    BargeIn { turn_id: u64 },
    /// The silence nudge was sent
    Nudged,
    /// Setup failed before the session became active
    Failed(String),
    Ended(CallOutcome),
}

/// Requests from a [`SessionHandle`](super::SessionHandle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Stop,
    CloseAfter(Duration),
    SendText(String),
    ConfirmRequest,
}
