//! Core types for ceiling enforcement

use crisis_core::types::DeviceClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters for the enforcer
///
/// None of these values are contractual; they are the knobs the original
/// tuning sessions kept shifting. The reduce-only class gets a shorter poll
/// interval (its push channel drops more updates) and a larger verification
/// retry budget (its actuator is less reliable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Fallback poll interval on full-control devices (ms)
    #[serde(default = "default_poll_interval_full_ms")]
    pub poll_interval_full_ms: u64,

    /// Fallback poll interval on reduce-only devices (ms)
    #[serde(default = "default_poll_interval_reduce_ms")]
    pub poll_interval_reduce_ms: u64,

    /// Delay before verifying the outcome of an actuator write (ms)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Verification retry budget on full-control devices
    #[serde(default = "default_verify_retries_full")]
    pub verify_retries_full: u32,

    /// Verification retry budget on reduce-only devices
    #[serde(default = "default_verify_retries_reduce")]
    pub verify_retries_reduce: u32,

    /// Level deltas at or below this are treated as settled noise
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f32,

    /// Scheduled discovery attempts before giving up
    #[serde(default = "default_discovery_max_attempts")]
    pub discovery_max_attempts: u32,

    /// Base delay of the discovery backoff schedule (ms)
    #[serde(default = "default_discovery_backoff_base_ms")]
    pub discovery_backoff_base_ms: u64,

    /// Upper bound on a single discovery backoff delay (ms)
    #[serde(default = "default_discovery_backoff_cap_ms")]
    pub discovery_backoff_cap_ms: u64,

    /// Size of the downward nudge used by the one-time actuator self-test
    #[serde(default = "default_self_test_nudge")]
    pub self_test_nudge: f32,

    /// Maximum deviation from the nudge target for the self-test to pass
    #[serde(default = "default_self_test_tolerance")]
    pub self_test_tolerance: f32,

    /// Minimum level required to run the self-test (the nudge must have room)
    #[serde(default = "default_self_test_min_level")]
    pub self_test_min_level: f32,
}

fn default_poll_interval_full_ms() -> u64 {
    2000
}
fn default_poll_interval_reduce_ms() -> u64 {
    750
}
fn default_settle_delay_ms() -> u64 {
    250
}
fn default_verify_retries_full() -> u32 {
    3
}
fn default_verify_retries_reduce() -> u32 {
    5
}
fn default_noise_threshold() -> f32 {
    0.04
}
fn default_discovery_max_attempts() -> u32 {
    8
}
fn default_discovery_backoff_base_ms() -> u64 {
    200
}
fn default_discovery_backoff_cap_ms() -> u64 {
    5000
}
fn default_self_test_nudge() -> f32 {
    0.06
}
fn default_self_test_tolerance() -> f32 {
    0.02
}
fn default_self_test_min_level() -> f32 {
    0.15
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            poll_interval_full_ms: default_poll_interval_full_ms(),
            poll_interval_reduce_ms: default_poll_interval_reduce_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            verify_retries_full: default_verify_retries_full(),
            verify_retries_reduce: default_verify_retries_reduce(),
            noise_threshold: default_noise_threshold(),
            discovery_max_attempts: default_discovery_max_attempts(),
            discovery_backoff_base_ms: default_discovery_backoff_base_ms(),
            discovery_backoff_cap_ms: default_discovery_backoff_cap_ms(),
            self_test_nudge: default_self_test_nudge(),
            self_test_tolerance: default_self_test_tolerance(),
            self_test_min_level: default_self_test_min_level(),
        }
    }
}

impl EnforcerConfig {
    /// Fallback poll interval for a device class
    #[must_use]
    pub fn poll_interval(&self, class: DeviceClass) -> Duration {
        match class {
            DeviceClass::FullControl => Duration::from_millis(self.poll_interval_full_ms),
            DeviceClass::ReduceOnly => Duration::from_millis(self.poll_interval_reduce_ms),
        }
    }

    /// Verification retry budget for a device class
    #[must_use]
    pub fn verify_retries(&self, class: DeviceClass) -> u32 {
        match class {
            DeviceClass::FullControl => self.verify_retries_full,
            DeviceClass::ReduceOnly => self.verify_retries_reduce,
        }
    }

    /// Delay before verifying a write
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Backoff delay before discovery attempt `attempt` (1-based)
    ///
    /// Doubles per attempt from the base, capped.
    #[must_use]
    pub fn discovery_backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self
            .discovery_backoff_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.discovery_backoff_cap_ms);
        Duration::from_millis(delay)
    }
}

/// Phase of the enforcement cycle the enforcer is currently in
///
/// Only the states that persist between host calls appear here; the
/// transient detection states resolve within a single call and are traced
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// No cycle in progress
    Idle,

    /// A write was issued; waiting out the settle delay before re-reading
    Verifying {
        /// 1-based attempt number within this cycle
        attempt: u32,
    },
}

/// Outcome of a direct set request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectSetOutcome {
    /// The actuator was driven toward the requested level
    Applied,

    /// Reduce-only device and the request would raise the level
    RefusedIncrease,

    /// No actuator handle and emergency re-discovery failed
    ActuatorUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EnforcerConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert!(config.noise_threshold > 0.0 && config.noise_threshold < 0.1);
        // The weaker class polls faster and retries more
        assert!(
            config.poll_interval(DeviceClass::ReduceOnly)
                < config.poll_interval(DeviceClass::FullControl)
        );
        assert!(
            config.verify_retries(DeviceClass::ReduceOnly)
                > config.verify_retries(DeviceClass::FullControl)
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = EnforcerConfig::default();
        assert_eq!(config.discovery_backoff(1), Duration::from_millis(200));
        assert_eq!(config.discovery_backoff(2), Duration::from_millis(400));
        assert_eq!(config.discovery_backoff(3), Duration::from_millis(800));
        assert_eq!(config.discovery_backoff(6), Duration::from_millis(5000));
        assert_eq!(config.discovery_backoff(40), Duration::from_millis(5000));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: EnforcerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.discovery_max_attempts, 8);

        let config: EnforcerConfig =
            serde_json::from_str(r#"{"settle_delay_ms": 50}"#).unwrap();
        assert_eq!(config.settle_delay(), Duration::from_millis(50));
        assert_eq!(config.verify_retries_full, 3);
    }
}
