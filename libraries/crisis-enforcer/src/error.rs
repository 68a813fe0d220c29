//! Error types for ceiling enforcement

use thiserror::Error;

/// Enforcement errors
///
/// Every variant is recoverable: enforcement failures are reported through
/// events and diagnostics, never propagated as a crash of the host process.
#[derive(Debug, Error)]
pub enum EnforcerError {
    /// Discovery exhausted its retry budget without locating the actuator
    #[error("Actuator not found after {attempts} discovery attempts")]
    ActuatorNotFound { attempts: u32 },

    /// A single discovery attempt failed
    #[error("Actuator discovery failed: {0}")]
    Discovery(String),

    /// The self-test showed actuator writes do not move the true level
    #[error("Actuator is inert; enforcement disabled for this session")]
    ActuatorInert,

    /// Writing the actuator failed (handle lost or rejected)
    #[error("Actuator write failed: {0}")]
    ActuatorWrite(String),

    /// Verification retries exhausted while the level stayed above the ceiling
    #[error("Enforcement timed out after {attempts} verification attempts")]
    EnforcementTimeout { attempts: u32 },

    /// Keep-alive playback could not start or stalled
    #[error("Keep-alive error: {0}")]
    KeepAlive(String),
}

/// Result type for enforcement operations
pub type Result<T> = std::result::Result<T, EnforcerError>;
