//! Silence watchdog.

use std::time::Duration;

use tokio::time::Instant;

/// Quiet period before the agent is nudged.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(45);

/// How often the watchdog is checked.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

/// Synthetic message asking the agent to check on a silent user.
pub fn nudge_text(timeout: Duration) -> String {
    format!(
        "[SYSTEM: User silent for {}s. Ask if they are there.]",
        timeout.as_secs()
    )
}

/// Tracks the last activity and fires at most once per quiet period.
#[derive(Debug, Clone)]
pub struct SilenceWatchdog {
    timeout: Duration,
    last_activity: Instant,
    nudged: bool,
}

impl SilenceWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: Instant::now(),
            nudged: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a new quiet period now.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
        self.nudged = false;
    }

    pub fn silent_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Returns `true` when a nudge is due; the caller must send it.
    pub fn poll(&mut self) -> bool {
        if self.nudged || self.silent_for() < self.timeout {
            return false;
        }
        self.nudged = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_quiet_period() {
        let mut watchdog = SilenceWatchdog::new(Duration::from_secs(45));

        tokio::time::advance(Duration::from_secs(44)).await;
        assert!(!watchdog.poll());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(watchdog.poll());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!watchdog.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_rearms() {
        let mut watchdog = SilenceWatchdog::new(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(watchdog.poll());

        watchdog.record_activity();
        assert!(!watchdog.poll());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(watchdog.poll());
    }

    #[test]
    fn test_nudge_text() {
        assert_eq!(
            nudge_text(DEFAULT_SILENCE_TIMEOUT),
            "[SYSTEM: User silent for 45s. Ask if they are there.]"
        );
    }
}
