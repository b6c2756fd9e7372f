//! VAD configuration types

use serde::{Deserialize, Serialize};

/// Default RMS level above which a capture buffer counts as speech.
pub const DEFAULT_BARGE_IN_THRESHOLD: f32 = 0.1;

/// Configuration for energy-based voice activity detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VADConfig {
    /// RMS threshold (0.0 - 1.0)
    /// Higher values = stricter detection, fewer false barge-ins
    pub threshold: f32,

    /// Sample rate of the frames handed to the detector (Hz)
    pub sample_rate: u32,
}

impl Default for VADConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BARGE_IN_THRESHOLD,
            sample_rate: 16000,
        }
    }
}

impl VADConfig {
    /// Create a new VADConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a VADConfig with a custom threshold
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(format!(
                "VAD threshold must be in (0.0, 1.0], got {}",
                self.threshold
            ));
        }
        if self.sample_rate == 0 {
            return Err("VAD sample rate must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Duration of a frame of `len` samples in milliseconds
    pub fn frame_duration_ms(&self, len: usize) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        len as f32 * 1000.0 / self.sample_rate as f32
    }
}
