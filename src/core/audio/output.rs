//! Playback sinks.
//!
//! An [`AudioOutput`] exposes a monotonic clock (`current_time`, seconds since
//! the output was created) and accepts buffers scheduled at absolute times on
//! that clock. Each scheduled buffer is controlled through a
//! [`PlaybackHandle`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::info;

use super::AudioResult;
use super::codec::AudioBuffer;

/// Control over one scheduled buffer.
pub trait PlaybackHandle: Send + Sync {
    /// Stop the buffer now. Stopping an already stopped or finished buffer is a no-op.
    fn stop(&self);

    /// Whether the buffer has finished playing or was stopped.
    fn has_ended(&self) -> bool;
}

/// A device that plays buffers on its own clock.
pub trait AudioOutput: Send + Sync {
    /// Output device sample rate; server audio is decoded to this rate.
    fn sample_rate(&self) -> u32;

    /// Current position of the output clock in seconds.
    fn current_time(&self) -> f64;

    /// Schedule `buffer` to start at `start_at` on the output clock.
    fn play(&self, buffer: AudioBuffer, start_at: f64) -> Box<dyn PlaybackHandle>;
}

#[derive(Debug)]
struct Segment {
    start: f64,
    samples: Vec<f32>,
    stopped_at: Option<f64>,
}

#[derive(Debug)]
struct Timeline {
    origin: Instant,
    segments: Vec<Segment>,
}

impl Timeline {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Records scheduled playback into a timeline that can be rendered to WAV.
///
/// Stopped buffers are cut at the clock time of the stop, so the rendered
/// file reflects what a listener would have heard.
#[derive(Debug, Clone)]
pub struct WavRecorderOutput {
    sample_rate: u32,
    timeline: Arc<Mutex<Timeline>>,
}

impl WavRecorderOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            timeline: Arc::new(Mutex::new(Timeline {
                origin: Instant::now(),
                segments: Vec::new(),
            })),
        }
    }

    /// Number of buffers scheduled so far.
    pub fn scheduled_count(&self) -> usize {
        self.timeline.lock().segments.len()
    }

    /// Mix the recorded timeline into mono samples.
    pub fn render(&self) -> Vec<f32> {
        let timeline = self.timeline.lock();
        let rate = self.sample_rate as f64;

        let end = timeline
            .segments
            .iter()
            .map(|s| audible_range(s, rate))
            .filter(|(from, to)| to > from)
            .map(|(_, to)| to)
            .max()
            .unwrap_or(0);

        let mut mix = vec![0.0f32; end];
        for segment in &timeline.segments {
            let (from, to) = audible_range(segment, rate);
            for (offset, index) in (from..to).enumerate() {
                mix[index] += segment.samples[offset];
            }
        }
        mix.iter_mut().for_each(|s| *s = s.clamp(-1.0, 1.0));
        mix
    }

    /// Render the timeline and write it as a 16-bit mono WAV file.
    pub fn write_wav(&self, path: &Path) -> AudioResult<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let samples = self.render();
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in &samples {
            writer.write_sample((sample * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;

        info!(path = %path.display(), samples = samples.len(), "Wrote playback recording");
        Ok(())
    }
}

/// Sample index range `[from, to)` of a segment that was actually heard.
fn audible_range(segment: &Segment, rate: f64) -> (usize, usize) {
    let from = (segment.start * rate).round() as usize;
    let full = from + segment.samples.len();
    let to = match segment.stopped_at {
        Some(at) => ((at * rate).round() as usize).clamp(from, full),
        None => full,
    };
    (from, to)
}

impl AudioOutput for WavRecorderOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.timeline.lock().now()
    }

    fn play(&self, buffer: AudioBuffer, start_at: f64) -> Box<dyn PlaybackHandle> {
        let duration = buffer.duration();
        let mut timeline = self.timeline.lock();
        timeline.segments.push(Segment {
            start: start_at,
            samples: buffer.into_samples(),
            stopped_at: None,
        });

        Box::new(RecordedPlayback {
            timeline: Arc::clone(&self.timeline),
            index: timeline.segments.len() - 1,
            end: start_at + duration,
        })
    }
}

struct RecordedPlayback {
    timeline: Arc<Mutex<Timeline>>,
    index: usize,
    end: f64,
}

impl PlaybackHandle for RecordedPlayback {
    fn stop(&self) {
        let mut timeline = self.timeline.lock();
        let now = timeline.now();
        if let Some(segment) = timeline.segments.get_mut(self.index) {
            if segment.stopped_at.is_none() {
                segment.stopped_at = Some(now.min(self.end));
            }
        }
    }

    fn has_ended(&self) -> bool {
        let timeline = self.timeline.lock();
        let stopped = timeline
            .segments
            .get(self.index)
            .is_none_or(|s| s.stopped_at.is_some());
        stopped || timeline.now() >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_tokio_time() {
        let output = WavRecorderOutput::new(24000);
        assert_eq!(output.current_time(), 0.0);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!((output.current_time() - 1.5).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_ends_after_duration() {
        let output = WavRecorderOutput::new(1000);
        let handle = output.play(AudioBuffer::new(vec![0.5; 1000], 1000), 0.0);
        assert!(!handle.has_ended());
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(handle.has_ended());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cuts_rendered_audio() {
        let output = WavRecorderOutput::new(1000);
        let handle = output.play(AudioBuffer::new(vec![0.5; 3000], 1000), 0.0);

        tokio::time::advance(Duration::from_millis(200)).await;
        handle.stop();
        assert!(handle.has_ended());

        let rendered = output.render();
        assert_eq!(rendered.len(), 200);
        assert!(rendered.iter().all(|s| *s == 0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_buffers_do_not_overlap() {
        let output = WavRecorderOutput::new(1000);
        output.play(AudioBuffer::new(vec![0.25; 500], 1000), 0.0);
        output.play(AudioBuffer::new(vec![0.5; 500], 1000), 0.5);

        let rendered = output.render();
        assert_eq!(rendered.len(), 1000);
        assert_eq!(rendered[499], 0.25);
        assert_eq!(rendered[500], 0.5);
        assert_eq!(output.scheduled_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_wav() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let output = WavRecorderOutput::new(24000);
        output.play(AudioBuffer::silence(0.1, 24000), 0.0);
        output.write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.len(), 2400);
    }
}
