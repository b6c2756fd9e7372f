//! Audio capture, playback and the wire codec.
//!
//! The session controller never talks to a sound card directly: it receives
//! capture buffers from an [`AudioInput`] and schedules decoded buffers on an
//! [`AudioOutput`]'s clock. The file-backed implementations here drive the CLI
//! and the integration tests.

pub mod codec;
pub mod input;
pub mod output;

use thiserror::Error;

pub use codec::{AudioBuffer, DecodeError, EncodeError, decode, encode, rms};
pub use input::{AudioInput, CaptureStream, WavFileInput};
pub use output::{AudioOutput, PlaybackHandle, WavRecorderOutput};

/// Errors raised by audio devices.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The capture source could not be acquired (the "permission denied" path)
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
