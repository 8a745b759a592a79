//! Reconnect backoff schedule.

use std::time::Duration;

use notihub_core::config::ReconnectConfig;

/// Backoff schedule applied after an unexpected transport drop.
///
/// Attempt `n` waits `delays[n]`; once the list runs out the final delay
/// repeats until `max_attempts` is reached (0 = retry forever).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
    max_attempts: u32,
}

impl ReconnectPolicy {
    /// Build a policy from explicit delays.
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        Self {
            delays,
            max_attempts,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            config
                .delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            config.max_attempts,
        )
    }

    /// Delay before the zero-based `attempt`, or `None` once retries are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts > 0 && attempt >= self.max_attempts {
            return None;
        }
        let delay = self
            .delays
            .get(attempt as usize)
            .or(self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO);
        Some(delay)
    }

    /// The full schedule, one delay per attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map_while(move |attempt| self.delay_for_attempt(attempt))
    }

    /// Total attempts allowed (0 = unlimited).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}
