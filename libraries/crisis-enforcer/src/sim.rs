//! Simulated device
//!
//! Scriptable implementations of the platform seams, shared by the test
//! suites and the monitor application. The simulator stands in for the real
//! platform bridge: a true output level other apps can move underneath the
//! enforcer, an actuator whose discovery can be delayed or denied, and a
//! keep-alive session that just records whether it is running.
//!
//! Handles are cheap clones over shared state, so a test can hold a
//! [`SimDevice`] while the enforcer owns the actuator and keep-alive views
//! of the same device.

use crate::actuator::VolumeActuator;
use crate::error::EnforcerError;
use crate::keepalive::{KeepAlive, KeepAliveSource, SampleSource};
use crisis_core::types::clamp_level;
use std::cell::RefCell;
use std::rc::Rc;

/// Sample rate the simulated playback session runs at
const SIM_SAMPLE_RATE: u32 = 44100;

/// Behavior knobs for a simulated device
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// True output level at creation
    pub initial_level: f32,

    /// Discovery attempts that fail before one succeeds
    pub discovery_failures: u32,

    /// Every discovery attempt fails (the hidden control never appears)
    pub discovery_always_fails: bool,

    /// Writes do not move the true level
    pub inert: bool,

    /// Offset added to every accepted write (actuator granularity)
    pub write_noise: f32,

    /// Drop the discovered handle after this many writes
    pub lose_handle_after_writes: Option<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_level: 0.5,
            discovery_failures: 0,
            discovery_always_fails: false,
            inert: false,
            write_noise: 0.0,
            lose_handle_after_writes: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    level: f32,
    discovered: bool,
    remaining_failures: u32,
    discovery_attempts: u32,
    writes: Vec<f32>,
    notifications: u32,
    writes_since_discovery: u32,
    keepalive_running: bool,
}

/// A simulated device; clone handles freely
#[derive(Debug, Clone)]
pub struct SimDevice {
    state: Rc<RefCell<SimState>>,
}

impl SimDevice {
    /// Create a device with the given behavior
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let level = clamp_level(config.initial_level);
        let remaining_failures = config.discovery_failures;
        Self {
            state: Rc::new(RefCell::new(SimState {
                config,
                level,
                discovered: false,
                remaining_failures,
                discovery_attempts: 0,
                writes: Vec::new(),
                notifications: 0,
                writes_since_discovery: 0,
                keepalive_running: false,
            })),
        }
    }

    /// Actuator view of this device, for the enforcer to own
    #[must_use]
    pub fn actuator(&self) -> SimActuator {
        SimActuator {
            state: Rc::clone(&self.state),
        }
    }

    /// Keep-alive view of this device, for the enforcer to own
    #[must_use]
    pub fn keepalive(&self) -> SimKeepAlive {
        SimKeepAlive {
            state: Rc::clone(&self.state),
            source: KeepAliveSource::new(SIM_SAMPLE_RATE),
        }
    }

    /// Current true output level
    #[must_use]
    pub fn true_level(&self) -> f32 {
        self.state.borrow().level
    }

    /// Move the true level externally (another app turned the volume up)
    pub fn set_true_level(&self, level: f32) {
        self.state.borrow_mut().level = clamp_level(level);
    }

    /// Every level the actuator was asked to write, in order
    #[must_use]
    pub fn writes(&self) -> Vec<f32> {
        self.state.borrow().writes.clone()
    }

    /// Change notifications synthesized alongside writes
    #[must_use]
    pub fn notification_count(&self) -> u32 {
        self.state.borrow().notifications
    }

    /// Discovery attempts made so far
    #[must_use]
    pub fn discovery_attempts(&self) -> u32 {
        self.state.borrow().discovery_attempts
    }

    /// Whether the keep-alive loop is running
    #[must_use]
    pub fn keepalive_running(&self) -> bool {
        self.state.borrow().keepalive_running
    }

    /// Drop the discovered handle (the platform rebuilt its view tree)
    pub fn drop_handle(&self) {
        self.state.borrow_mut().discovered = false;
    }

    /// Make future writes inert (or usable again)
    pub fn set_inert(&self, inert: bool) {
        self.state.borrow_mut().config.inert = inert;
    }
}

/// Actuator view over a [`SimDevice`]
#[derive(Debug)]
pub struct SimActuator {
    state: Rc<RefCell<SimState>>,
}

impl VolumeActuator for SimActuator {
    fn discover(&mut self) -> crate::error::Result<()> {
        let mut state = self.state.borrow_mut();
        state.discovery_attempts += 1;

        if state.config.discovery_always_fails {
            return Err(EnforcerError::Discovery(
                "no slider-shaped control in the subview graph".to_string(),
            ));
        }
        if state.remaining_failures > 0 {
            state.remaining_failures -= 1;
            return Err(EnforcerError::Discovery(
                "container not laid out yet".to_string(),
            ));
        }

        state.discovered = true;
        state.writes_since_discovery = 0;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.state.borrow().discovered
    }

    fn write(&mut self, level: f32) -> crate::error::Result<()> {
        let mut state = self.state.borrow_mut();

        if !state.discovered {
            return Err(EnforcerError::ActuatorWrite("no handle held".to_string()));
        }

        state.writes.push(level);
        state.notifications += 1;
        state.writes_since_discovery += 1;

        if !state.config.inert {
            state.level = clamp_level(level + state.config.write_noise);
        }

        if let Some(limit) = state.config.lose_handle_after_writes {
            if state.writes_since_discovery >= limit {
                state.discovered = false;
            }
        }

        Ok(())
    }

    fn current_level(&self) -> Option<f32> {
        Some(self.state.borrow().level)
    }

    fn invalidate(&mut self) {
        self.state.borrow_mut().discovered = false;
    }
}

/// Keep-alive view over a [`SimDevice`]
///
/// Plays the real [`KeepAliveSource`]: like the platform it stands in for,
/// it refuses to start on digital silence (a silent session gets the
/// process suspended anyway).
#[derive(Debug)]
pub struct SimKeepAlive {
    state: Rc<RefCell<SimState>>,
    source: KeepAliveSource,
}

impl KeepAlive for SimKeepAlive {
    fn start(&mut self) -> crate::error::Result<()> {
        let mut buffer = [0.0f32; 512];
        self.source.read_samples(&mut buffer);

        let peak = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak == 0.0 {
            return Err(EnforcerError::KeepAlive(
                "loop buffer is digital silence".to_string(),
            ));
        }

        self.state.borrow_mut().keepalive_running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.borrow_mut().keepalive_running = false;
    }

    fn is_running(&self) -> bool {
        self.state.borrow().keepalive_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_move_level_and_notify() {
        let device = SimDevice::new(SimConfig::default());
        let mut actuator = device.actuator();

        actuator.discover().unwrap();
        actuator.write(0.3).unwrap();

        assert_eq!(device.true_level(), 0.3);
        assert_eq!(device.writes(), vec![0.3]);
        assert_eq!(device.notification_count(), 1);
    }

    #[test]
    fn write_without_handle_fails() {
        let device = SimDevice::new(SimConfig::default());
        let mut actuator = device.actuator();

        assert!(actuator.write(0.3).is_err());
        assert!(device.writes().is_empty());
    }

    #[test]
    fn discovery_failure_budget() {
        let device = SimDevice::new(SimConfig {
            discovery_failures: 2,
            ..SimConfig::default()
        });
        let mut actuator = device.actuator();

        assert!(actuator.discover().is_err());
        assert!(actuator.discover().is_err());
        assert!(actuator.discover().is_ok());
        assert!(actuator.is_available());
        assert_eq!(device.discovery_attempts(), 3);
    }

    #[test]
    fn inert_writes_leave_level_alone() {
        let device = SimDevice::new(SimConfig {
            inert: true,
            ..SimConfig::default()
        });
        let mut actuator = device.actuator();

        actuator.discover().unwrap();
        actuator.write(0.1).unwrap();

        assert_eq!(device.true_level(), 0.5);
        assert_eq!(device.writes(), vec![0.1]);
    }

    #[test]
    fn handle_loss_after_writes() {
        let device = SimDevice::new(SimConfig {
            lose_handle_after_writes: Some(2),
            ..SimConfig::default()
        });
        let mut actuator = device.actuator();

        actuator.discover().unwrap();
        actuator.write(0.4).unwrap();
        assert!(actuator.is_available());
        actuator.write(0.3).unwrap();
        assert!(!actuator.is_available());

        // re-discovery resets the write budget
        actuator.discover().unwrap();
        assert!(actuator.is_available());
    }
}
