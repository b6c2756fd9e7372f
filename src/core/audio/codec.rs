//! PCM16 codec between capture/playback buffers and the realtime wire format.
//!
//! # Audio Format
//!
//! - Outbound (microphone → model): 16-bit signed little-endian PCM, mono, 16kHz
//! - Inbound (model → speaker): 16-bit signed little-endian PCM, mono, 24kHz
//!
//! Both directions are pure functions: the same input always yields the same
//! output, and no state is carried between frames.

use bytes::{BufMut, Bytes, BytesMut};
use rubato::{FftFixedIn, Resampler};
use thiserror::Error;

/// Sample rate the realtime model expects for microphone audio.
pub const WIRE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of the audio the realtime model sends back.
pub const SERVER_SAMPLE_RATE: u32 = 24_000;

/// MIME type advertised for outbound audio chunks.
pub const WIRE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Requested resampler chunk size (frames).
const RESAMPLE_CHUNK: usize = 1024;

/// Sub-chunks used by the FFT resampler.
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// Errors produced while decoding a server audio frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// PCM16 payloads must contain whole samples
    #[error("PCM16 payload has odd length: {0} bytes")]
    OddLength(usize),

    /// Sample rate of zero on either side of the conversion
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Resampler failed
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Errors produced while encoding captured audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Sample rate of zero
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Resampler failed
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// A decoded, duration-bearing buffer ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap mono samples at the given rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Buffer of silence lasting `seconds`.
    pub fn silence(seconds: f64, sample_rate: u32) -> Self {
        let len = (seconds * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Encode captured samples into a wire frame (PCM16 LE mono at [`WIRE_SAMPLE_RATE`]).
pub fn encode(samples: &[f32], source_rate: u32) -> Result<Bytes, EncodeError> {
    if source_rate == 0 {
        return Err(EncodeError::InvalidSampleRate(source_rate));
    }

    let resampled =
        resample(samples, source_rate, WIRE_SAMPLE_RATE).map_err(EncodeError::Resample)?;

    let mut frame = BytesMut::with_capacity(resampled.len() * 2);
    for sample in resampled {
        frame.put_i16_le(float_to_pcm16(sample));
    }
    Ok(frame.freeze())
}

/// Decode a PCM16 LE mono payload recorded at `source_rate` into a buffer at `target_rate`.
pub fn decode(bytes: &[u8], source_rate: u32, target_rate: u32) -> Result<AudioBuffer, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }
    if source_rate == 0 {
        return Err(DecodeError::InvalidSampleRate(source_rate));
    }
    if target_rate == 0 {
        return Err(DecodeError::InvalidSampleRate(target_rate));
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    let samples = resample(&samples, source_rate, target_rate).map_err(DecodeError::Resample)?;
    Ok(AudioBuffer::new(samples, target_rate))
}

/// Root-mean-square energy of a buffer. Empty buffers have zero energy.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[inline]
fn float_to_pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Resample mono audio with rubato's FFT resampler.
///
/// The output is trimmed of the resampler delay and truncated to
/// `len * to_rate / from_rate` frames so frame durations are preserved.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    if expected == 0 {
        return Ok(Vec::new());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        1,
    )
    .map_err(|e| format!("resampler init failed: {e}"))?;

    let delay = resampler.output_delay();
    let needed = expected + delay;
    let chunk_len = resampler.input_frames_next();

    let mut output = Vec::with_capacity(needed + chunk_len);
    let mut chunk = vec![0.0f32; chunk_len];
    let mut blocks = samples.chunks(chunk_len);

    while output.len() < needed {
        match blocks.next() {
            Some(block) => {
                chunk[..block.len()].copy_from_slice(block);
                chunk[block.len()..].fill(0.0);
            }
            None => chunk.fill(0.0),
        }

        let frames = resampler
            .process(&[chunk.as_slice()], None)
            .map_err(|e| format!("resample failed: {e}"))?;
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}
