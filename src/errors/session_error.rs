use thiserror::Error;

use crate::core::audio::AudioError;
use crate::core::realtime::RealtimeError;

/// Errors that end a session before or outside normal teardown.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The capture source could not be acquired
    #[error("Microphone unavailable: {0}")]
    CaptureUnavailable(#[from] AudioError),

    /// The realtime transport could not be opened
    #[error("Realtime setup failed: {0}")]
    TransportSetup(#[from] RealtimeError),

    #[error("Invalid session configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Session already finalized")]
    AlreadyFinalized,
}

impl SessionError {
    /// Whether the session failed before it became active.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            SessionError::CaptureUnavailable(_)
                | SessionError::TransportSetup(_)
                | SessionError::InvalidConfiguration(_)
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
