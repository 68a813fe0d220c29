//! Volume Crisis - Ceiling Enforcement
//!
//! Platform-agnostic volume ceiling enforcement for Volume Crisis.
//!
//! This crate provides:
//! - The ceiling enforcement loop (detect, drive, verify, bounded retries)
//! - Actuator supervision (discovery with backoff, inertness self-test)
//! - Direct set requests (presets, assistant intents) with in-flight guards
//! - Background keep-alive and audition sample sources
//! - A scriptable simulated device for tests and the monitor app
//!
//! # Architecture
//!
//! `crisis-enforcer` is completely platform-agnostic:
//! - No dependency on any UI toolkit or audio session API
//! - No dependency on crisis-storage (hosts persist on events)
//! - Single execution context; no locks, no threads
//!
//! Platform-specific behavior (locating the hidden level control, running a
//! background-capable audio session) is provided via the [`VolumeActuator`]
//! and [`KeepAlive`] traits. Time-based work is queued against a
//! [`Clock`](crisis_core::clock::Clock); the host drains it with
//! [`CeilingEnforcer::run_due_tasks`] and can sleep until
//! [`CeilingEnforcer::next_deadline`].
//!
//! # Example: enforcing a ceiling
//!
//! ```rust
//! use crisis_enforcer::{CeilingEnforcer, EnforcerConfig};
//! use crisis_enforcer::sim::{SimConfig, SimDevice};
//! use crisis_core::clock::{Clock, ManualClock};
//! use crisis_core::types::DeviceClass;
//!
//! let device = SimDevice::new(SimConfig::default());
//! let clock = ManualClock::new();
//!
//! let mut enforcer = CeilingEnforcer::new(
//!     EnforcerConfig::default(),
//!     DeviceClass::FullControl,
//!     0.6, // ceiling loaded from storage
//!     Box::new(device.actuator()),
//!     Box::new(device.keepalive()),
//!     Box::new(clock.clone()),
//! );
//! enforcer.start();
//!
//! // Another app turns the volume up; the platform pushes the change
//! device.set_true_level(0.9);
//! enforcer.on_level_changed(0.9);
//!
//! // Let the deferred verification run
//! while let Some(deadline) = enforcer.next_deadline() {
//!     if deadline > clock.now() + std::time::Duration::from_secs(10) {
//!         break;
//!     }
//!     clock.set(deadline);
//!     enforcer.run_due_tasks();
//!     if !enforcer.is_enforcing() {
//!         break;
//!     }
//! }
//!
//! assert!(device.true_level() <= 0.6 + 0.05);
//! assert_eq!(enforcer.stats().successes(), 1);
//! ```

mod actuator;
mod enforcer;
mod error;
mod events;
mod intents;
mod keepalive;
pub mod sim;
pub mod types;

// Public exports
pub use actuator::{ActuatorSupervisor, SelfTestVerdict, VolumeActuator};
pub use enforcer::{CeilingEnforcer, INERT_WORKAROUND};
pub use error::{EnforcerError, Result};
pub use events::{EnforcerEvent, FailureReason};
pub use keepalive::{KeepAlive, KeepAliveSource, SampleSource, TestToneSource};
pub use types::{CyclePhase, DirectSetOutcome, EnforcerConfig};
