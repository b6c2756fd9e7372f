//! Cloneable control surface for a running session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use super::events::SessionCommand;
use super::state::SessionState;
use crate::core::tools::SharedConversation;

/// Sends commands to a session. Once the session has ended every command is
/// a no-op.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: Arc<RwLock<SessionState>>,
    conversation: SharedConversation,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        commands: mpsc::UnboundedSender<SessionCommand>,
        state: Arc<RwLock<SessionState>>,
        conversation: SharedConversation,
    ) -> Self {
        Self {
            id,
            commands,
            state,
            conversation,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Live form and booking status.
    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    /// End the call now.
    pub fn stop(&self) {
        self.send(SessionCommand::Stop);
    }

    /// End the call after `delay`, letting queued agent audio finish.
    pub fn close_after(&self, delay: Duration) {
        self.send(SessionCommand::CloseAfter(delay));
    }

    /// Inject a text message. Ignored unless the session is active.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send(SessionCommand::SendText(text.into()));
    }

    /// The customer pressed the confirm button on the form.
    pub fn confirm_request(&self) {
        self.send(SessionCommand::ConfirmRequest);
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!(session_id = %self.id, "Session ended, command ignored");
        }
    }
}
