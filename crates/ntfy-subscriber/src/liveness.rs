//! # Connection Liveness Monitor
//!
//! Tracks the last time anything arrived on the socket and decides when an
//! open connection has gone quiet for too long. ntfy sends a `keepalive`
//! event roughly every 45 seconds, so silence past the inactivity window
//! means a half-open TCP connection rather than an idle topic.
//!
//! The monitor does not own a task. The listener polls
//! [`LivenessMonitor::next_signal`] inside its own event loop and acts on the
//! returned [`LivenessSignal`].

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::LivenessConfig;

/// What the listener should do after a monitor tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessSignal {
    /// Traffic arrived recently enough.
    Healthy,

    /// Nothing arrived for longer than the inactivity window. Reported once
    /// per breach; the next report needs fresh traffic followed by silence.
    Stale { idle: Duration },

    /// Time to send a keepalive ping.
    Ping,
}

/// Per-connection liveness state.
pub struct LivenessMonitor {
    last_activity: Instant,
    inactivity_timeout: Duration,
    check: Interval,
    ping: Option<Interval>,
    breach_reported: bool,
}

impl LivenessMonitor {
    /// Start monitoring from now. Timers first fire one period from now.
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            inactivity_timeout: config.inactivity_timeout,
            check: delayed_interval(config.check_interval),
            ping: config.ping_interval.map(delayed_interval),
            breach_reported: false,
        }
    }

    /// Record inbound traffic of any kind.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.breach_reported = false;
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn is_stale(&self) -> bool {
        self.idle_for() > self.inactivity_timeout
    }

    /// Wait for the next check or ping tick. Checks take priority when both
    /// are due at once.
    pub async fn next_signal(&mut self) -> LivenessSignal {
        let check_due = {
            let Self { check, ping, .. } = self;
            let ping_tick = async {
                match ping {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = check.tick() => true,
                () = ping_tick => false,
            }
        };

        if check_due {
            self.evaluate()
        } else {
            LivenessSignal::Ping
        }
    }

    fn evaluate(&mut self) -> LivenessSignal {
        if self.breach_reported || !self.is_stale() {
            return LivenessSignal::Healthy;
        }
        self.breach_reported = true;
        LivenessSignal::Stale {
            idle: self.idle_for(),
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ping: Option<u64>) -> LivenessConfig {
        LivenessConfig {
            inactivity_timeout: Duration::from_secs(60),
            check_interval: Duration::from_secs(10),
            ping_interval: ping.map(Duration::from_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_resets_idle_time() {
        let mut monitor = LivenessMonitor::new(&config(None));
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(monitor.idle_for(), Duration::from_secs(45));

        monitor.touch();
        assert_eq!(monitor.idle_for(), Duration::ZERO);
        assert!(!monitor.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reported_once_per_breach() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(&config(None));

        let mut signal = monitor.next_signal().await;
        while signal == LivenessSignal::Healthy {
            signal = monitor.next_signal().await;
        }
        // First check past the 60s window is the one at 70s.
        assert_eq!(start.elapsed(), Duration::from_secs(70));
        assert_eq!(
            signal,
            LivenessSignal::Stale {
                idle: Duration::from_secs(70)
            }
        );

        for _ in 0..5 {
            assert_eq!(monitor.next_signal().await, LivenessSignal::Healthy);
        }

        monitor.touch();
        let mut signal = monitor.next_signal().await;
        let mut checks = 1;
        while signal == LivenessSignal::Healthy {
            signal = monitor.next_signal().await;
            checks += 1;
        }
        assert!(matches!(signal, LivenessSignal::Stale { .. }));
        assert_eq!(checks, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_keeps_connection_healthy() {
        let mut monitor = LivenessMonitor::new(&config(None));
        for _ in 0..30 {
            assert_eq!(monitor.next_signal().await, LivenessSignal::Healthy);
            monitor.touch();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_period_independent_of_checks() {
        let mut monitor = LivenessMonitor::new(&config(Some(30)));
        let start = Instant::now();
        let mut pings = 0;

        loop {
            let signal = monitor.next_signal().await;
            if start.elapsed() > Duration::from_secs(95) {
                break;
            }
            if signal == LivenessSignal::Ping {
                pings += 1;
                assert_eq!(start.elapsed().as_secs() % 30, 0);
            }
            // Pinging is not inbound traffic.
            assert!(monitor.idle_for() >= start.elapsed());
        }

        assert_eq!(pings, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pings_when_disabled() {
        let mut monitor = LivenessMonitor::new(&config(None));
        for _ in 0..12 {
            assert_ne!(monitor.next_signal().await, LivenessSignal::Ping);
        }
    }
}
