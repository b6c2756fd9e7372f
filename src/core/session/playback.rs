//! Gapless, interruptible scheduling of agent audio.
//!
//! Buffers are queued back to back on the output clock. Every frame is
//! stamped with the turn id current at arrival; a barge-in bumps the turn id,
//! so frames that were already in flight for the old turn are dropped instead
//! of being started after the user began speaking.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::audio::{AudioBuffer, AudioOutput, PlaybackHandle};

/// Turn id captured when a frame arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnTicket(u64);

impl TurnTicket {
    pub fn turn_id(&self) -> u64 {
        self.0
    }
}

pub struct PlaybackScheduler {
    output: Arc<dyn AudioOutput>,
    turn_id: u64,
    next_start_time: f64,
    playing: Vec<Box<dyn PlaybackHandle>>,
}

impl PlaybackScheduler {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            turn_id: 0,
            next_start_time: 0.0,
            playing: Vec::new(),
        }
    }

    pub fn turn_id(&self) -> u64 {
        self.turn_id
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn output_sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    /// Buffers scheduled or playing that have not ended yet.
    pub fn active_count(&mut self) -> usize {
        self.prune();
        self.playing.len()
    }

    pub fn ticket(&self) -> TurnTicket {
        TurnTicket(self.turn_id)
    }

    /// Queue `buffer` after everything already scheduled.
    ///
    /// Returns the start time on the output clock, or `None` when the ticket
    /// belongs to an earlier turn.
    pub fn schedule(&mut self, ticket: TurnTicket, buffer: AudioBuffer) -> Option<f64> {
        if ticket.0 != self.turn_id {
            debug!(
                ticket = ticket.0,
                turn_id = self.turn_id,
                "Dropping audio from interrupted turn"
            );
            return None;
        }
        if buffer.is_empty() {
            return None;
        }

        self.prune();

        let start_at = self.next_start_time.max(self.output.current_time());
        self.next_start_time = start_at + buffer.duration();
        trace!(start_at, duration = buffer.duration(), "Scheduling agent audio");

        let handle = self.output.play(buffer, start_at);
        self.playing.push(handle);
        Some(start_at)
    }

    /// Stop every tracked buffer immediately and restart the queue.
    ///
    /// Returns how many buffers were still scheduled or playing.
    pub fn hard_stop(&mut self) -> usize {
        let mut stopped = 0;
        for handle in self.playing.drain(..) {
            if !handle.has_ended() {
                stopped += 1;
            }
            handle.stop();
        }
        self.next_start_time = 0.0;
        stopped
    }

    /// User speech: stop local playback and invalidate the current turn.
    ///
    /// Returns the new turn id.
    pub fn barge_in(&mut self) -> u64 {
        let stopped = self.hard_stop();
        self.turn_id += 1;
        if stopped > 0 {
            debug!(stopped, turn_id = self.turn_id, "Barge-in stopped agent audio");
        }
        self.turn_id
    }

    /// The server cut its generation short; the next frame starts fresh.
    pub fn reset_clock(&mut self) {
        self.next_start_time = 0.0;
    }

    fn prune(&mut self) {
        self.playing.retain(|h| !h.has_ended());
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("turn_id", &self.turn_id)
            .field("next_start_time", &self.next_start_time)
            .field("playing", &self.playing.len())
            .finish()
    }
}
