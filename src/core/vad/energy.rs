//! Energy (RMS) voice activity detector

use tracing::trace;

use super::config::VADConfig;
use crate::core::audio::codec::rms;

/// Result of VAD processing for a single audio frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VADResult {
    /// Whether the current frame contains speech
    pub is_speech: bool,
    /// RMS energy of the frame
    pub energy: f32,
    /// Whether speech just started (transition from silence to speech)
    pub speech_start: bool,
    /// Whether speech just ended (transition from speech to silence)
    pub speech_end: bool,
    /// Duration of current speech segment in milliseconds (if speaking)
    pub speech_duration_ms: u32,
}

/// Trait for Voice Activity Detection implementations
pub trait VoiceActivityDetector: Send + Sync {
    /// Process a single audio frame and return VAD result
    fn process_frame(&mut self, audio: &[f32]) -> VADResult;

    /// Reset internal state (call when starting a new audio stream)
    fn reset(&mut self);

    /// Energy of the last processed frame
    fn last_energy(&self) -> f32;

    /// Check if currently in speech state
    fn is_speaking(&self) -> bool;

    /// Get the configuration
    fn config(&self) -> &VADConfig;
}

/// Stateless per-frame threshold on RMS energy, with speech start/end edges.
#[derive(Debug, Clone)]
pub struct EnergyVAD {
    config: VADConfig,
    speaking: bool,
    last_energy: f32,
    speech_ms: f32,
}

impl EnergyVAD {
    pub fn new(config: VADConfig) -> Self {
        Self {
            config,
            speaking: false,
            last_energy: 0.0,
            speech_ms: 0.0,
        }
    }
}

impl VoiceActivityDetector for EnergyVAD {
    fn process_frame(&mut self, audio: &[f32]) -> VADResult {
        let energy = rms(audio);
        let is_speech = energy > self.config.threshold;
        let speech_start = is_speech && !self.speaking;
        let speech_end = !is_speech && self.speaking;

        if is_speech {
            self.speech_ms += self.config.frame_duration_ms(audio.len());
        } else {
            self.speech_ms = 0.0;
        }

        if speech_start || speech_end {
            trace!(energy, speech_start, speech_end, "VAD transition");
        }

        self.speaking = is_speech;
        self.last_energy = energy;

        VADResult {
            is_speech,
            energy,
            speech_start,
            speech_end,
            speech_duration_ms: self.speech_ms as u32,
        }
    }

    fn reset(&mut self) {
        self.speaking = false;
        self.last_energy = 0.0;
        self.speech_ms = 0.0;
    }

    fn last_energy(&self) -> f32 {
        self.last_energy
    }

    fn is_speaking(&self) -> bool {
        self.speaking
    }

    fn config(&self) -> &VADConfig {
        &self.config
    }
}
