//! Enforcement events
//!
//! Event-based communication for host synchronization. The enforcer queues
//! events as it works; the host drains them with
//! [`take_events`](crate::CeilingEnforcer::take_events) and reacts: persist
//! the ceiling, append diagnostics, update the UI.

use serde::{Deserialize, Serialize};

/// Why an enforcement cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No actuator handle and emergency re-discovery failed
    ActuatorUnavailable,

    /// Verification retries exhausted while the level stayed above ceiling
    Timeout,
}

/// Events emitted by the enforcer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnforcerEvent {
    /// The tracked output level changed (beyond the noise threshold)
    LevelChanged {
        /// New tracked level
        level: f32,
    },

    /// The ceiling changed; hosts persist it on this event
    CeilingChanged {
        /// New ceiling
        ceiling: f32,
    },

    /// A refresh found the level above the ceiling
    ViolationDetected {
        /// Observed level
        level: f32,
        /// Ceiling at detection time
        ceiling: f32,
    },

    /// An enforcement cycle settled at or below the ceiling
    EnforcementSucceeded {
        /// Verification attempts used
        attempts: u32,
        /// Verified true level
        level: f32,
    },

    /// An enforcement cycle gave up
    EnforcementFailed {
        /// What went wrong
        reason: FailureReason,
        /// Best-known true level at the time
        level: f32,
    },

    /// A discovery attempt located the actuator
    ActuatorDiscovered,

    /// Scheduled discovery gave up; emergency re-discovery may still succeed
    ActuatorDiscoveryExhausted {
        /// Attempts used
        attempts: u32,
    },

    /// The actuator handle was lost mid-operation
    ActuatorLost,

    /// The self-test proved writes do not move the true level
    ///
    /// Enforcement is disabled for the rest of the session.
    ActuatorInert {
        /// Suggested platform-level workaround to surface to the user
        workaround: String,
    },

    /// A direct set request drove the actuator
    DirectSetApplied {
        /// Requested level after clamping
        level: f32,
    },

    /// The background keep-alive loop started
    KeepAliveStarted,

    /// The background keep-alive loop stopped
    KeepAliveStopped,

    /// The background keep-alive loop failed to start
    KeepAliveFailed {
        /// Error description
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_round_trip() {
        let event = EnforcerEvent::EnforcementFailed {
            reason: FailureReason::Timeout,
            level: 0.72,
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: EnforcerEvent = serde_json::from_str(&json).unwrap();

        match back {
            EnforcerEvent::EnforcementFailed { reason, level } => {
                assert_eq!(reason, FailureReason::Timeout);
                assert_eq!(level, 0.72);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn failure_reason_uses_snake_case() {
        let json = serde_json::to_string(&FailureReason::ActuatorUnavailable).unwrap();
        assert_eq!(json, r#""actuator_unavailable""#);
    }
}
