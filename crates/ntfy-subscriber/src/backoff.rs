//! # Reconnect Backoff
//!
//! Tiered delay table used between reconnection attempts.
//!
//! | Attempt | 0 | 1 | 2 | 3 | 4 | 5+ |
//! |---------|---|---|---|---|---|----|
//! | Delay   | 1s | 2s | 5s | 10s | 30s | 60s |
//!
//! The schedule is a pure function of the attempt number. The listener
//! owns the counter and resets it to 0 whenever a connection opens.
//!
//! ```
//! use ntfy_subscriber::backoff::BackoffSchedule;
//! use std::time::Duration;
//!
//! let schedule = BackoffSchedule::default();
//! assert_eq!(schedule.delay(0), Duration::from_secs(1));
//! assert_eq!(schedule.delay(100), Duration::from_secs(60));
//! ```

use std::time::Duration;

use crate::error::{NtfyError, NtfyResult};

/// Default tiers, in milliseconds.
pub const DEFAULT_TIERS_MS: [u64; 6] = [1_000, 2_000, 5_000, 10_000, 30_000, 60_000];

/// Ordered, non-decreasing reconnect delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    tiers: Vec<Duration>,
}

impl BackoffSchedule {
    /// Build a schedule from explicit tiers.
    ///
    /// # Errors
    /// Returns [`NtfyError::ConfigError`] if `tiers` is empty or decreases
    /// anywhere.
    pub fn new(tiers: Vec<Duration>) -> NtfyResult<Self> {
        if tiers.is_empty() {
            return Err(NtfyError::ConfigError {
                reason: "backoff table must contain at least one tier".into(),
            });
        }
        if let Some(pair) = tiers.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(NtfyError::ConfigError {
                reason: format!(
                    "backoff tiers must not decrease ({:?} is followed by {:?})",
                    pair[0], pair[1]
                ),
            });
        }
        Ok(Self { tiers })
    }

    /// Build a schedule from tiers given in milliseconds.
    ///
    /// # Errors
    /// Same as [`BackoffSchedule::new`].
    pub fn from_millis(tiers_ms: &[u64]) -> NtfyResult<Self> {
        Self::new(tiers_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay before reconnect attempt `attempt` (0-based within a failure
    /// streak). Attempts past the end of the table reuse the last tier.
    pub fn delay(&self, attempt: u32) -> Duration {
        let last = self.tiers.len() - 1;
        let index = usize::try_from(attempt).map_or(last, |a| a.min(last));
        self.tiers[index]
    }

    pub fn tiers(&self) -> &[Duration] {
        &self.tiers
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let schedule = BackoffSchedule::default();
        let expected = [1, 2, 5, 10, 30, 60, 60, 60];
        for (attempt, secs) in expected.iter().enumerate() {
            assert_eq!(
                schedule.delay(u32::try_from(attempt).unwrap()),
                Duration::from_secs(*secs)
            );
        }
        assert_eq!(schedule.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_matches_clamped_index() {
        let schedule = BackoffSchedule::from_millis(&[10, 20, 20, 400]).unwrap();
        let tiers = schedule.tiers().to_vec();
        for attempt in 0..50u32 {
            let index = (attempt as usize).min(tiers.len() - 1);
            assert_eq!(schedule.delay(attempt), tiers[index]);
        }
    }

    #[test]
    fn test_delays_never_decrease_within_streak() {
        let schedule = BackoffSchedule::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = schedule.delay(attempt);
            assert!(delay >= previous);
            assert!(schedule.tiers().contains(&delay));
            previous = delay;
        }
    }

    #[test]
    fn test_single_tier_is_fixed_delay() {
        let schedule = BackoffSchedule::from_millis(&[5_000]).unwrap();
        assert_eq!(schedule.delay(0), Duration::from_secs(5));
        assert_eq!(schedule.delay(7), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_empty_and_decreasing_tables() {
        assert!(matches!(
            BackoffSchedule::new(Vec::new()),
            Err(NtfyError::ConfigError { .. })
        ));
        let err = BackoffSchedule::from_millis(&[1_000, 500]).unwrap_err();
        assert!(err.to_string().contains("must not decrease"), "{err}");
    }
}
