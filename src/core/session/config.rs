//! Session tuning.

use std::time::Duration;

use super::watchdog::{DEFAULT_SILENCE_TIMEOUT, DEFAULT_WATCHDOG_INTERVAL};
use crate::core::tools::dispatcher::DEFAULT_LANGUAGE;
use crate::core::vad::DEFAULT_BARGE_IN_THRESHOLD;

/// Input level that counts as user activity for the silence watchdog.
pub const DEFAULT_ACTIVITY_THRESHOLD: f32 = 0.01;

/// Delay between `close_call` and the end of the session.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// How long teardown waits for in-flight tool calls.
pub const DEFAULT_TOOL_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// RMS above which user input interrupts agent playback
    pub barge_in_threshold: f32,
    /// RMS above which user input resets the silence watchdog
    pub activity_threshold: f32,
    pub silence_timeout: Duration,
    pub watchdog_interval: Duration,
    pub close_grace: Duration,
    pub tool_drain_timeout: Duration,
    /// Language recorded on orders
    pub language: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            barge_in_threshold: DEFAULT_BARGE_IN_THRESHOLD,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            close_grace: DEFAULT_CLOSE_GRACE,
            tool_drain_timeout: DEFAULT_TOOL_DRAIN_TIMEOUT,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.barge_in_threshold > 0.0 && self.barge_in_threshold <= 1.0) {
            return Err(format!(
                "barge_in_threshold must be in (0, 1], got {}",
                self.barge_in_threshold
            ));
        }
        if !(0.0..=self.barge_in_threshold).contains(&self.activity_threshold) {
            return Err(format!(
                "activity_threshold must be in [0, barge_in_threshold], got {}",
                self.activity_threshold
            ));
        }
        if self.silence_timeout.is_zero() {
            return Err("silence_timeout must be greater than zero".to_string());
        }
        if self.watchdog_interval.is_zero() {
            return Err("watchdog_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.barge_in_threshold, 0.1);
        assert_eq!(config.silence_timeout, Duration::from_secs(45));
        assert_eq!(config.close_grace, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SessionConfig {
            barge_in_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            activity_threshold: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            watchdog_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
