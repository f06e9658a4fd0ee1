//! Client configuration: endpoint, reconnect policy and subscription replay.
use std::time::Duration;

use transit_common::net::{DEFAULT_TRACKING_URL, RECONNECT_DELAY_MS};

/// How long to wait before each reconnect attempt.
///
/// The delay for attempt `n` (0-based, reset after every successful open) is
/// `delay * multiplier^n`, capped at `max_delay`. A multiplier of 1 gives a
/// fixed delay; attempts are never limited in number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive attempts; values below 1 act as 1.
    pub multiplier: f64,
}

impl ReconnectPolicy {
    /// Same delay before every attempt.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Doubling delay starting at `delay`, never longer than `max_delay`.
    pub fn exponential(delay: Duration, max_delay: Duration) -> Self {
        Self {
            delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Delay before reconnect attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay.max(self.delay);
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(RECONNECT_DELAY_MS))
    }
}

/// Settings for a `TrackingClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the tracking service.
    pub url: String,
    /// Delay schedule after abnormal closes and failed opens.
    pub reconnect: ReconnectPolicy,
    /// Re-send `subscribe` for every stored bus each time a connection opens.
    pub replay_subscriptions: bool,
}

impl ClientConfig {
    /// Default settings pointed at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: String::from(url),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_TRACKING_URL),
            reconnect: ReconnectPolicy::default(),
            replay_subscriptions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_a_fixed_three_second_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(3));
        assert_eq!(policy.delay_for(50), Duration::from_secs(3));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = ReconnectPolicy::exponential(Duration::from_millis(500), Duration::from_secs(5));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn shrinking_multiplier_acts_as_fixed() {
        let policy = ReconnectPolicy {
            multiplier: 0.5,
            ..ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10))
        };
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("ws://127.0.0.1:9001/tracking");
        assert_eq!(config.url, "ws://127.0.0.1:9001/tracking");
        assert!(config.replay_subscriptions);
        assert_eq!(ClientConfig::default().url, DEFAULT_TRACKING_URL);
    }
}
