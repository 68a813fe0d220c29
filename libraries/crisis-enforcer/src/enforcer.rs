//! Ceiling enforcer - core control loop
//!
//! Owns the ceiling, tracks the observed output level, and drives the
//! actuator back toward the ceiling whenever a refresh finds the level above
//! it. Everything runs on the host's execution context: time-based work
//! (verification settles, discovery backoff, fallback polls) sits in an
//! internal deadline queue the host drains via [`CeilingEnforcer::run_due_tasks`].

use crate::{
    actuator::{ActuatorSupervisor, SelfTestVerdict, VolumeActuator},
    events::{EnforcerEvent, FailureReason},
    keepalive::KeepAlive,
    types::{CyclePhase, DirectSetOutcome, EnforcerConfig},
};
use crisis_core::clock::Clock;
use crisis_core::types::{clamp_level, DeviceClass, EnforcementStats};
use std::time::{Duration, Instant};

/// Guidance surfaced to the user when the actuator proves inert
pub const INERT_WORKAROUND: &str = "Volume control is blocked by the platform on this device. \
     Enable the operating system's built-in volume limit in its sound settings instead.";

/// Deferred work, keyed by deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Fallback poll of the true output level
    Poll,

    /// Re-read the true level after a write settled
    Verify { attempt: u32 },

    /// Clear the in-flight direct-set flag and adopt the actual outcome
    ClearInFlight { token: u64 },

    /// Scheduled actuator discovery attempt (1-based)
    DiscoveryAttempt { attempt: u32 },

    /// Judge the pending actuator self-test
    SelfTestCheck,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: Instant,
    task: Deferred,
}

/// Volume ceiling enforcement
///
/// Keeps the observed output level at or below the ceiling, across all
/// audio-producing apps on the device, using the one actuator the platform
/// exposes, with graceful degradation when that actuator is unusable.
///
/// All methods are synchronous and must be called from a single execution
/// context; suspension points are expressed as deadline-queue entries, never
/// as blocking waits.
pub struct CeilingEnforcer {
    config: EnforcerConfig,
    device_class: DeviceClass,
    clock: Box<dyn Clock>,
    supervisor: ActuatorSupervisor,
    keepalive: Box<dyn KeepAlive>,

    ceiling: f32,
    observed: f32,
    phase: CyclePhase,
    in_flight_set: bool,
    flight_token: u64,

    stats: EnforcementStats,
    pending_events: Vec<EnforcerEvent>,
    queue: Vec<Scheduled>,
    started: bool,
}

impl CeilingEnforcer {
    /// Create an enforcer
    ///
    /// `initial_ceiling` is whatever the host loaded from storage (1.0 when
    /// nothing was stored). Nothing is scheduled until [`start`](Self::start).
    pub fn new(
        config: EnforcerConfig,
        device_class: DeviceClass,
        initial_ceiling: f32,
        actuator: Box<dyn VolumeActuator>,
        keepalive: Box<dyn KeepAlive>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            device_class,
            clock,
            supervisor: ActuatorSupervisor::new(actuator),
            keepalive,
            ceiling: clamp_level(initial_ceiling),
            observed: 0.0,
            phase: CyclePhase::Idle,
            in_flight_set: false,
            flight_token: 0,
            stats: EnforcementStats::new(),
            pending_events: Vec::new(),
            queue: Vec::new(),
            started: false,
        }
    }

    /// Begin monitoring
    ///
    /// Reads the initial level, schedules actuator discovery and the
    /// fallback poll, starts the keep-alive loop, and immediately enforces
    /// if the restored ceiling is already violated.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        if let Some(level) = self.supervisor.current_level() {
            self.observed = clamp_level(level);
        }

        tracing::info!(
            target: "enforcement",
            class = %self.device_class,
            ceiling = self.ceiling,
            level = self.observed,
            "enforcer starting"
        );

        self.schedule(Duration::ZERO, Deferred::DiscoveryAttempt { attempt: 1 });
        self.schedule(
            self.config.poll_interval(self.device_class),
            Deferred::Poll,
        );

        match self.keepalive.start() {
            Ok(()) => {
                self.pending_events.push(EnforcerEvent::KeepAliveStarted);
                tracing::info!(target: "background", "keep-alive loop started");
            }
            Err(err) => {
                self.pending_events.push(EnforcerEvent::KeepAliveFailed {
                    message: err.to_string(),
                });
                tracing::warn!(
                    target: "background",
                    error = %err,
                    "keep-alive failed to start; monitoring may suspend while backgrounded"
                );
            }
        }

        let observed = self.observed;
        self.evaluate(observed);
    }

    /// Stop monitoring
    ///
    /// Drops all deferred work and stops the keep-alive loop. Idempotent.
    pub fn stop(&mut self) {
        self.queue.clear();
        if self.keepalive.is_running() {
            self.keepalive.stop();
            self.pending_events.push(EnforcerEvent::KeepAliveStopped);
            tracing::info!(target: "background", "keep-alive loop stopped");
        }
    }

    // === Host inputs ===

    /// Push notification: the platform reported a new output level
    pub fn on_level_changed(&mut self, level: f32) {
        self.evaluate(level);
    }

    /// Run every deferred task whose deadline has passed
    pub fn run_due_tasks(&mut self) {
        let now = self.clock.now();
        while self.queue.first().is_some_and(|s| s.due <= now) {
            let scheduled = self.queue.remove(0);
            self.dispatch(scheduled.task);
        }
    }

    /// Deadline of the next deferred task, for hosts that sleep precisely
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.first().map(|s| s.due)
    }

    /// Change the ceiling
    ///
    /// The new value is clamped to [0, 1] and announced via
    /// [`EnforcerEvent::CeilingChanged`] (hosts persist it on that event).
    /// If the current level already exceeds the new ceiling, enforcement
    /// starts immediately instead of waiting for the next refresh.
    pub fn set_ceiling(&mut self, ceiling: f32) {
        let ceiling = clamp_level(ceiling);
        self.ceiling = ceiling;
        self.pending_events
            .push(EnforcerEvent::CeilingChanged { ceiling });
        tracing::info!(target: "volume", ceiling, "ceiling updated");

        let observed = self.observed;
        self.evaluate(observed);
    }

    /// Direct set request: drive the output level to `level`
    ///
    /// Used by the preset UI ("apply preset" passes the stored fraction) and
    /// by assistant intents. Reduce-only devices silently refuse increases;
    /// the UI for raising the level is disabled there.
    pub fn request_level(&mut self, level: f32) -> DirectSetOutcome {
        let level = clamp_level(level);

        if self.device_class == DeviceClass::ReduceOnly && level > self.observed {
            tracing::debug!(
                target: "volume",
                requested = level,
                current = self.observed,
                "increase refused on reduce-only device"
            );
            return DirectSetOutcome::RefusedIncrease;
        }

        if !self.supervisor.is_available() {
            match self.supervisor.emergency_discover() {
                Ok(()) => self.pending_events.push(EnforcerEvent::ActuatorDiscovered),
                Err(err) => {
                    tracing::warn!(
                        target: "volume",
                        error = %err,
                        "direct set with no usable actuator"
                    );
                    return DirectSetOutcome::ActuatorUnavailable;
                }
            }
        }

        self.supervisor.abort_self_test();

        match self.supervisor.write(level) {
            Ok(()) => {
                self.in_flight_set = true;
                self.flight_token += 1;
                let token = self.flight_token;
                self.observed = level;
                self.pending_events
                    .push(EnforcerEvent::DirectSetApplied { level });
                tracing::debug!(target: "volume", level, "direct set applied");
                self.schedule(
                    self.config.settle_delay(),
                    Deferred::ClearInFlight { token },
                );
                DirectSetOutcome::Applied
            }
            Err(err) => {
                self.supervisor.invalidate();
                self.pending_events.push(EnforcerEvent::ActuatorLost);
                tracing::warn!(target: "actuator", error = %err, "direct set write failed");
                DirectSetOutcome::ActuatorUnavailable
            }
        }
    }

    /// Drain queued events
    pub fn take_events(&mut self) -> Vec<EnforcerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // === Accessors ===

    /// Current ceiling, fraction in [0, 1]
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Tracked observed level, fraction in [0, 1]
    pub fn observed_level(&self) -> f32 {
        self.observed
    }

    /// Enforcement counters
    pub fn stats(&self) -> &EnforcementStats {
        &self.stats
    }

    /// Device capability tier
    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Whether an enforcement cycle is currently in flight
    pub fn is_enforcing(&self) -> bool {
        matches!(self.phase, CyclePhase::Verifying { .. })
    }

    /// Whether a discovered actuator handle is currently held
    pub fn actuator_available(&self) -> bool {
        self.supervisor.is_available()
    }

    /// Whether the self-test disabled enforcement for this session
    pub fn enforcement_disabled(&self) -> bool {
        self.supervisor.is_inert()
    }

    // === Scheduling ===

    fn schedule(&mut self, delay: Duration, task: Deferred) {
        let due = self.clock.now() + delay;
        let idx = self.queue.partition_point(|s| s.due <= due);
        self.queue.insert(idx, Scheduled { due, task });
    }

    fn dispatch(&mut self, task: Deferred) {
        match task {
            Deferred::Poll => self.on_poll(),
            Deferred::Verify { attempt } => self.on_verify(attempt),
            Deferred::ClearInFlight { token } => self.on_clear_in_flight(token),
            Deferred::DiscoveryAttempt { attempt } => self.on_discovery_attempt(attempt),
            Deferred::SelfTestCheck => self.on_self_test_check(),
        }
    }

    // === Refresh handling ===

    /// Handle a refreshed observed level (push or poll)
    fn evaluate(&mut self, level: f32) {
        let level = clamp_level(level);

        if level > self.ceiling + self.config.noise_threshold {
            if self.in_flight_set {
                // safety dominates responsiveness: a settling direct set
                // never outranks a detected violation
                self.in_flight_set = false;
                self.flight_token += 1;
                tracing::debug!(target: "enforcement", "violation interrupts in-flight direct set");
            }
            if self.phase == CyclePhase::Idle {
                self.observed = level;
                self.pending_events.push(EnforcerEvent::ViolationDetected {
                    level,
                    ceiling: self.ceiling,
                });
                tracing::debug!(
                    target: "enforcement",
                    level,
                    ceiling = self.ceiling,
                    "level above ceiling"
                );
                self.begin_cycle();
            }
            // an in-flight cycle re-targets the current ceiling at its next
            // verification, so a second cycle is never started here
            return;
        }

        if self.in_flight_set || matches!(self.phase, CyclePhase::Verifying { .. }) {
            // a programmatic change has not settled yet
            return;
        }

        if (level - self.observed).abs() > self.config.noise_threshold {
            self.observed = level;
            self.pending_events
                .push(EnforcerEvent::LevelChanged { level });
            tracing::trace!(target: "volume", level, "output level refreshed");
        }
    }

    // === Enforcement cycle ===

    fn begin_cycle(&mut self) {
        if self.supervisor.is_inert() {
            tracing::debug!(target: "enforcement", "actuator inert; enforcement disabled");
            return;
        }

        // a pending self-test nudge would race the cycle's own writes
        self.supervisor.abort_self_test();

        self.stats.record_attempt(self.clock.now());

        if !self.supervisor.is_available() {
            match self.supervisor.emergency_discover() {
                Ok(()) => {
                    self.pending_events.push(EnforcerEvent::ActuatorDiscovered);
                    tracing::info!(target: "actuator", "actuator recovered during enforcement");
                }
                Err(err) => {
                    self.stats.record_failure();
                    self.pending_events.push(EnforcerEvent::EnforcementFailed {
                        reason: FailureReason::ActuatorUnavailable,
                        level: self.observed,
                    });
                    tracing::warn!(
                        target: "enforcement",
                        error = %err,
                        "violation with no usable actuator"
                    );
                    return;
                }
            }
        }

        self.drive(1);
    }

    /// Drive the actuator toward the current ceiling and schedule verification
    fn drive(&mut self, attempt: u32) {
        // always the ceiling at evaluation time: a mid-cycle ceiling change
        // re-targets the next drive, last write wins
        let target = self.ceiling;

        match self.supervisor.write(target) {
            Ok(()) => {
                // optimistic for UI responsiveness; verification corrects it
                self.observed = target;
                tracing::debug!(
                    target: "enforcement",
                    attempt,
                    level = target,
                    "actuator driven toward ceiling"
                );
            }
            Err(err) => {
                // verification will find the violation persisting and retry
                // with re-discovery
                self.supervisor.invalidate();
                self.pending_events.push(EnforcerEvent::ActuatorLost);
                tracing::warn!(target: "actuator", error = %err, "write failed; handle dropped");
            }
        }

        self.phase = CyclePhase::Verifying { attempt };
        self.schedule(self.config.settle_delay(), Deferred::Verify { attempt });
    }

    fn on_verify(&mut self, attempt: u32) {
        if self.phase != (CyclePhase::Verifying { attempt }) {
            return; // stale timer from an interrupted cycle
        }

        let level = self.supervisor.current_level().map(clamp_level);

        match level {
            Some(level) if level <= self.ceiling + self.config.noise_threshold => {
                self.stats.record_success();
                self.observed = level;
                self.phase = CyclePhase::Idle;
                self.pending_events.push(EnforcerEvent::EnforcementSucceeded {
                    attempts: attempt,
                    level,
                });
                tracing::info!(
                    target: "enforcement",
                    attempts = attempt,
                    level,
                    "level pulled under ceiling"
                );
            }
            _ => {
                let best_known = level.unwrap_or(self.observed);

                if attempt < self.config.verify_retries(self.device_class) {
                    if !self.supervisor.is_available() {
                        match self.supervisor.emergency_discover() {
                            Ok(()) => {
                                self.pending_events.push(EnforcerEvent::ActuatorDiscovered);
                            }
                            Err(err) => {
                                self.stats.record_failure();
                                self.observed = best_known;
                                self.phase = CyclePhase::Idle;
                                self.pending_events.push(EnforcerEvent::EnforcementFailed {
                                    reason: FailureReason::ActuatorUnavailable,
                                    level: best_known,
                                });
                                tracing::warn!(
                                    target: "enforcement",
                                    error = %err,
                                    "actuator lost mid-cycle and not recovered"
                                );
                                return;
                            }
                        }
                    }
                    tracing::debug!(
                        target: "enforcement",
                        attempt,
                        level = best_known,
                        "still above ceiling; retrying"
                    );
                    self.drive(attempt + 1);
                } else {
                    self.stats.record_failure();
                    // leave the UI showing the best-known true value; no
                    // success is claimed that did not happen
                    self.observed = best_known;
                    self.phase = CyclePhase::Idle;
                    self.pending_events.push(EnforcerEvent::EnforcementFailed {
                        reason: FailureReason::Timeout,
                        level: best_known,
                    });
                    tracing::warn!(
                        target: "enforcement",
                        attempts = attempt,
                        level = best_known,
                        "verification retries exhausted"
                    );
                }
            }
        }
    }

    // === Deferred handlers ===

    fn on_poll(&mut self) {
        self.schedule(
            self.config.poll_interval(self.device_class),
            Deferred::Poll,
        );

        if let Some(level) = self.supervisor.current_level() {
            self.evaluate(level);
        }

        self.maybe_start_self_test();
    }

    fn on_clear_in_flight(&mut self, token: u64) {
        if !self.in_flight_set || token != self.flight_token {
            return;
        }
        self.in_flight_set = false;

        // adopt the actual outcome, whatever it is
        if let Some(level) = self.supervisor.current_level().map(clamp_level) {
            if (level - self.observed).abs() > self.config.noise_threshold {
                self.pending_events
                    .push(EnforcerEvent::LevelChanged { level });
            }
            self.observed = level;
            self.evaluate(level);
        }
    }

    fn on_discovery_attempt(&mut self, attempt: u32) {
        if self.supervisor.is_available() {
            return; // recovered through an emergency attempt meanwhile
        }

        match self.supervisor.try_discover() {
            Ok(()) => {
                self.pending_events.push(EnforcerEvent::ActuatorDiscovered);
                tracing::info!(target: "actuator", attempt, "actuator discovered");
                self.maybe_start_self_test();
            }
            Err(err) => {
                if attempt < self.config.discovery_max_attempts {
                    let delay = self.config.discovery_backoff(attempt);
                    tracing::debug!(
                        target: "actuator",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "discovery attempt failed; backing off"
                    );
                    self.schedule(delay, Deferred::DiscoveryAttempt { attempt: attempt + 1 });
                } else {
                    self.supervisor.mark_exhausted();
                    self.pending_events
                        .push(EnforcerEvent::ActuatorDiscoveryExhausted { attempts: attempt });
                    tracing::error!(
                        target: "actuator",
                        attempts = attempt,
                        "actuator never found; scheduled discovery giving up"
                    );
                }
            }
        }
    }

    // === Self-test ===

    fn maybe_start_self_test(&mut self) {
        if !self.supervisor.self_test_not_run()
            || !self.supervisor.is_available()
            || self.phase != CyclePhase::Idle
            || self.in_flight_set
        {
            return;
        }

        let Some(baseline) = self.supervisor.current_level().map(clamp_level) else {
            return;
        };
        if baseline < self.config.self_test_min_level {
            // the nudge needs room below it; a later poll retries
            return;
        }

        let expected = clamp_level(baseline - self.config.self_test_nudge);
        // reduce-only devices cannot restore the nudge afterwards
        let restore = self.device_class.allows_increase().then_some(baseline);

        match self.supervisor.begin_self_test(expected, restore) {
            Ok(()) => {
                tracing::debug!(
                    target: "actuator",
                    baseline,
                    expected,
                    "self-test nudge issued"
                );
                self.schedule(self.config.settle_delay(), Deferred::SelfTestCheck);
            }
            Err(err) => {
                self.supervisor.invalidate();
                self.pending_events.push(EnforcerEvent::ActuatorLost);
                tracing::warn!(target: "actuator", error = %err, "self-test nudge failed");
            }
        }
    }

    fn on_self_test_check(&mut self) {
        if self.phase != CyclePhase::Idle || self.in_flight_set {
            // enforcement or a direct set took over; the nudge outcome is
            // no longer attributable
            self.supervisor.abort_self_test();
            return;
        }

        let level = self.supervisor.current_level().map(clamp_level);

        match self
            .supervisor
            .complete_self_test(level, self.config.self_test_tolerance)
        {
            Some(SelfTestVerdict::Passed { restore }) => {
                tracing::info!(target: "actuator", "self-test passed");
                if let Some(restore) = restore {
                    if self.supervisor.write(restore).is_ok() {
                        self.observed = restore;
                    }
                } else if let Some(level) = level {
                    self.observed = level;
                }
            }
            Some(SelfTestVerdict::Inert) => {
                if let Some(level) = level {
                    self.observed = level;
                }
                self.pending_events.push(EnforcerEvent::ActuatorInert {
                    workaround: INERT_WORKAROUND.to_string(),
                });
                tracing::error!(
                    target: "actuator",
                    "self-test failed: writes do not move the true level; \
                     enforcement disabled for this session"
                );
            }
            None => {}
        }
    }
}

impl Drop for CeilingEnforcer {
    fn drop(&mut self) {
        self.queue.clear();
        if self.keepalive.is_running() {
            self.keepalive.stop();
        }
    }
}
