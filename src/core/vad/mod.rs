//! Voice Activity Detection (VAD) module
//!
//! Acoustic speech detection on raw capture buffers. The session controller
//! uses it to decide when the user is talking over the agent (barge-in).
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_voice::core::vad::{EnergyVAD, VADConfig, VoiceActivityDetector};
//!
//! let mut vad = EnergyVAD::new(VADConfig::with_threshold(0.1));
//! let result = vad.process_frame(&capture_buffer);
//!
//! if result.is_speech {
//!     // stop agent playback
//! }
//! ```

pub mod config;
pub mod energy;

pub use config::{DEFAULT_BARGE_IN_THRESHOLD, VADConfig};
pub use energy::{EnergyVAD, VADResult, VoiceActivityDetector};
