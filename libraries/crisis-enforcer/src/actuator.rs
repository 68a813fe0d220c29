//! Actuator abstraction and supervision
//!
//! The platform exposes exactly one control capable of changing the output
//! level programmatically, and it has to be located before it can be used.
//! How that happens (on the original platform: injecting an invisible
//! container into the active window and searching its subview graph for a
//! slider) is entirely the platform implementation's business; the enforcer
//! only sees the narrow [`VolumeActuator`] trait.
//!
//! [`ActuatorSupervisor`] wraps the trait object with the state the enforcer
//! needs to manage it: discovery exhaustion and the one-time functional
//! self-test that detects an inert actuator.

use crate::error::Result;

/// The single platform-provided output level control
///
/// Implementations are not required to be `Send`; the enforcer and all of
/// its platform seams live on one execution context.
pub trait VolumeActuator {
    /// Perform one discovery attempt
    ///
    /// Returns `Ok(())` once a usable handle is held. Each call is a single
    /// bounded attempt; scheduling retries and backoff is the caller's job.
    ///
    /// # Errors
    /// Returns an error if no handle could be located this attempt
    fn discover(&mut self) -> Result<()>;

    /// Whether a discovered handle is currently held
    fn is_available(&self) -> bool;

    /// Drive the control to `level` (fraction in [0, 1])
    ///
    /// Implementations must also synthesize the platform's change
    /// notification so downstream listeners react as if the user had moved
    /// the control.
    ///
    /// # Errors
    /// Returns an error if no handle is held or the write was rejected
    fn write(&mut self, level: f32) -> Result<()>;

    /// True output level as the platform currently reports it
    ///
    /// This is a session-level read and works without a discovered handle.
    /// Returns `None` if the platform cannot report a level right now.
    fn current_level(&self) -> Option<f32>;

    /// Drop the discovered handle (e.g., the view hierarchy was rebuilt)
    fn invalidate(&mut self);
}

/// Result of completing the one-time actuator self-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelfTestVerdict {
    /// Writes move the true level; restore the pre-test level if permitted
    Passed {
        /// Level to write back, when the device class can raise the level
        restore: Option<f32>,
    },

    /// Writes do not move the true level; enforcement is disabled
    Inert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SelfTestState {
    NotRun,
    Pending { expected: f32, restore: Option<f32> },
    Passed,
    Inert,
}

/// Supervises the actuator trait object
///
/// Owns the handle exclusively: no other component holds or mutates the
/// actuator.
pub struct ActuatorSupervisor {
    actuator: Box<dyn VolumeActuator>,
    exhausted: bool,
    self_test: SelfTestState,
}

impl ActuatorSupervisor {
    /// Wrap a platform actuator
    pub fn new(actuator: Box<dyn VolumeActuator>) -> Self {
        Self {
            actuator,
            exhausted: false,
            self_test: SelfTestState::NotRun,
        }
    }

    /// Whether a discovered handle is currently held
    pub fn is_available(&self) -> bool {
        self.actuator.is_available()
    }

    /// Whether scheduled discovery gave up
    ///
    /// Emergency discovery on violations may still succeed later and clears
    /// this flag.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether the self-test proved the actuator inert
    ///
    /// Inertness permanently disables enforcement for the session.
    pub fn is_inert(&self) -> bool {
        self.self_test == SelfTestState::Inert
    }

    /// Whether the self-test has yet to run
    pub fn self_test_not_run(&self) -> bool {
        self.self_test == SelfTestState::NotRun
    }

    /// Whether a self-test nudge is waiting to be checked
    pub fn self_test_pending(&self) -> bool {
        matches!(self.self_test, SelfTestState::Pending { .. })
    }

    /// One discovery attempt
    ///
    /// # Errors
    /// Returns an error if the attempt failed
    pub fn try_discover(&mut self) -> Result<()> {
        self.actuator.discover()?;
        self.exhausted = false;
        Ok(())
    }

    /// Abbreviated re-discovery used when a violation finds no handle
    ///
    /// # Errors
    /// Returns an error if no handle is held and one attempt did not find it
    pub fn emergency_discover(&mut self) -> Result<()> {
        if self.actuator.is_available() {
            return Ok(());
        }
        self.try_discover()
    }

    /// Record that scheduled discovery exhausted its attempts
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// Drive the actuator
    ///
    /// # Errors
    /// Returns an error if no handle is held or the write was rejected
    pub fn write(&mut self, level: f32) -> Result<()> {
        self.actuator.write(level)
    }

    /// True output level as the platform reports it
    pub fn current_level(&self) -> Option<f32> {
        self.actuator.current_level()
    }

    /// Drop the discovered handle
    pub fn invalidate(&mut self) {
        self.actuator.invalidate();
    }

    /// Issue the self-test nudge
    ///
    /// Writes `expected` and arms the pending state; the caller schedules the
    /// settle delay and then calls [`complete_self_test`](Self::complete_self_test).
    ///
    /// # Errors
    /// Returns an error if the nudge write failed (state stays `NotRun`)
    pub fn begin_self_test(&mut self, expected: f32, restore: Option<f32>) -> Result<()> {
        self.actuator.write(expected)?;
        self.self_test = SelfTestState::Pending { expected, restore };
        Ok(())
    }

    /// Abandon a pending self-test (e.g., enforcement interrupted it)
    pub fn abort_self_test(&mut self) {
        if self.self_test_pending() {
            self.self_test = SelfTestState::NotRun;
        }
    }

    /// Judge a pending self-test against the re-read true level
    ///
    /// Returns `None` when no self-test is pending or the level could not be
    /// read (the test is abandoned and will re-arm later).
    pub fn complete_self_test(
        &mut self,
        observed: Option<f32>,
        tolerance: f32,
    ) -> Option<SelfTestVerdict> {
        let SelfTestState::Pending { expected, restore } = self.self_test else {
            return None;
        };

        let Some(observed) = observed else {
            self.self_test = SelfTestState::NotRun;
            return None;
        };

        if (observed - expected).abs() <= tolerance {
            self.self_test = SelfTestState::Passed;
            Some(SelfTestVerdict::Passed { restore })
        } else {
            self.self_test = SelfTestState::Inert;
            Some(SelfTestVerdict::Inert)
        }
    }
}

impl std::fmt::Debug for ActuatorSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorSupervisor")
            .field("available", &self.actuator.is_available())
            .field("exhausted", &self.exhausted)
            .field("self_test", &self.self_test)
            .finish()
    }
}
