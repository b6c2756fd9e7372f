//! Audio Test Fixtures
//!
//! Generated audio keeps the tests free of binary files:
//! - Capture buffers are mono f32 at 16kHz (the wire rate, so encoding is a
//!   plain PCM16 conversion)
//! - Server audio is PCM16 little-endian at 24kHz, as Gemini Live sends it

use std::f32::consts::PI;
use std::path::Path;

/// Capture sample rate used by the tests
pub const CAPTURE_RATE: u32 = 16_000;

/// Server (and playback) sample rate
pub const SERVER_RATE: u32 = 24_000;

/// 100ms of capture audio
pub const CAPTURE_FRAME: usize = 1_600;

/// A capture buffer of digital silence.
pub fn silent_frame() -> Vec<f32> {
    vec![0.0; CAPTURE_FRAME]
}

/// A capture buffer of room noise: audible to the silence watchdog
/// (RMS above 0.01) but below the barge-in threshold (0.1).
pub fn murmur_frame() -> Vec<f32> {
    sine_wave(CAPTURE_FRAME, 220.0, 0.05, CAPTURE_RATE)
}

/// A capture buffer loud enough to count as the user speaking.
pub fn speech_frame() -> Vec<f32> {
    sine_wave(CAPTURE_FRAME, 180.0, 0.6, CAPTURE_RATE)
}

/// Generate a sine wave tone.
pub fn sine_wave(len: usize, frequency: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let angular = 2.0 * PI * frequency / sample_rate as f32;
    (0..len).map(|i| (angular * i as f32).sin() * amplitude).collect()
}

/// Server audio lasting `seconds`, as PCM16 LE bytes at [`SERVER_RATE`].
pub fn server_audio(seconds: f64) -> Vec<u8> {
    let len = (seconds * SERVER_RATE as f64).round() as usize;
    let samples = sine_wave(len, 440.0, 0.3, SERVER_RATE);
    samples_to_pcm16(&samples)
}

/// Convert f32 samples to PCM16 LE bytes.
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
        .collect()
}

/// Write mono f32 samples as a 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for sample in samples {
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_voice::core::audio::rms;

    #[test]
    fn test_frame_levels() {
        assert_eq!(rms(&silent_frame()), 0.0);
        let murmur = rms(&murmur_frame());
        assert!(murmur > 0.01 && murmur < 0.1, "murmur rms {murmur}");
        assert!(rms(&speech_frame()) > 0.1);
    }

    #[test]
    fn test_server_audio_length() {
        assert_eq!(server_audio(1.0).len(), 48_000);
    }
}
