//! Capture sources.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{AudioError, AudioResult};

/// Capture buffer size used by the browser client (samples per callback).
pub const DEFAULT_CAPTURE_BUFFER_SIZE: usize = 4096;

const CAPTURE_CHANNEL_CAPACITY: usize = 32;

/// An open capture stream: mono f32 buffers at `sample_rate`.
#[derive(Debug)]
pub struct CaptureStream {
    pub sample_rate: u32,
    pub frames: mpsc::Receiver<Vec<f32>>,
}

/// A microphone-like source of capture buffers.
///
/// `open` is where access to the device is requested; a denied or missing
/// device fails here, before any transport is opened.
#[async_trait]
pub trait AudioInput: Send + Sync {
    async fn open(&self) -> AudioResult<CaptureStream>;

    /// Stop producing buffers. Safe to call more than once.
    fn stop(&self);
}

/// Streams a WAV file as paced capture buffers.
///
/// Buffers are released at the rate they would arrive from a real device.
/// Once the file is exhausted, silence keeps flowing until `stop` so the
/// remote side can detect end of speech. Each `open` starts a fresh stream
/// and ends the previous one.
pub struct WavFileInput {
    path: PathBuf,
    buffer_size: usize,
    trailing_silence: bool,
    cancel: Mutex<CancellationToken>,
}

impl WavFileInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: DEFAULT_CAPTURE_BUFFER_SIZE,
            trailing_silence: true,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_trailing_silence(mut self, enabled: bool) -> Self {
        self.trailing_silence = enabled;
        self
    }
}

#[async_trait]
impl AudioInput for WavFileInput {
    async fn open(&self) -> AudioResult<CaptureStream> {
        let path = self.path.clone();
        let (samples, sample_rate) = tokio::task::spawn_blocking(move || read_mono(&path))
            .await
            .map_err(|e| AudioError::DeviceUnavailable(format!("capture reader failed: {e}")))??;

        info!(
            path = %self.path.display(),
            sample_rate,
            samples = samples.len(),
            "Opened WAV capture source"
        );

        let (tx, rx) = mpsc::channel(CAPTURE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        std::mem::replace(&mut *self.cancel.lock(), cancel.clone()).cancel();
        let buffer_size = self.buffer_size;
        let trailing_silence = self.trailing_silence;
        let period = Duration::from_secs_f64(buffer_size as f64 / sample_rate as f64);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut chunks = samples.chunks(buffer_size);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let buffer = match chunks.next() {
                    Some(chunk) => chunk.to_vec(),
                    None if trailing_silence => vec![0.0; buffer_size],
                    None => break,
                };

                if tx.send(buffer).await.is_err() {
                    break;
                }
            }
            debug!("WAV capture task finished");
        });

        Ok(CaptureStream {
            sample_rate,
            frames: rx,
        })
    }

    fn stop(&self) {
        self.cancel.lock().cancel();
    }
}

/// Read a WAV file and down-mix it to mono f32.
fn read_mono(path: &Path) -> AudioResult<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(AudioError::DeviceUnavailable(format!(
            "unsupported WAV format: {} Hz, {} channels",
            spec.sample_rate, spec.channels
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &std::path::Path, samples: &[i16], sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wav_input_streams_buffers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_wav(&path, &vec![16384i16; 10], 16000, 1);

        let input = WavFileInput::new(&path)
            .with_buffer_size(4)
            .with_trailing_silence(false);
        let mut stream = input.open().await.unwrap();
        assert_eq!(stream.sample_rate, 16000);

        let mut received = Vec::new();
        while let Some(buffer) = stream.frames.recv().await {
            received.push(buffer);
        }
        assert_eq!(received.len(), 3);
        assert_eq!(received[0], vec![0.5; 4]);
        assert_eq!(received[2].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wav_input_downmixes_stereo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, &[16384, 0, 16384, 0], 8000, 2);

        let input = WavFileInput::new(&path)
            .with_buffer_size(2)
            .with_trailing_silence(false);
        let mut stream = input.open().await.unwrap();
        let buffer = stream.frames.recv().await.unwrap();
        assert_eq!(buffer, vec![0.25, 0.25]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_trailing_silence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, &[0; 4], 16000, 1);

        let input = WavFileInput::new(&path).with_buffer_size(4);
        let mut stream = input.open().await.unwrap();
        stream.frames.recv().await.unwrap();
        // silence after the file ends
        assert_eq!(stream.frames.recv().await.unwrap(), vec![0.0; 4]);

        input.stop();
        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while stream.frames.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "capture stream kept running after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_after_stop_streams_again() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("again.wav");
        write_wav(&path, &vec![16384i16; 8], 16000, 1);

        let input = WavFileInput::new(&path)
            .with_buffer_size(4)
            .with_trailing_silence(false);
        let mut first = input.open().await.unwrap();
        assert!(first.frames.recv().await.is_some());
        input.stop();

        let mut second = input.open().await.unwrap();
        let mut received = 0;
        while second.frames.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
    }

    #[tokio::test]
    async fn test_missing_file_fails_open() {
        let input = WavFileInput::new("/nonexistent/capture.wav");
        assert!(input.open().await.is_err());
    }
}
