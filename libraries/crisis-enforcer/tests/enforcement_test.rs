//! End-to-end enforcement scenarios against the simulated device

use crisis_core::clock::{Clock, ManualClock};
use crisis_core::types::DeviceClass;
use crisis_enforcer::sim::{SimConfig, SimDevice};
use crisis_enforcer::{
    CeilingEnforcer, DirectSetOutcome, EnforcerConfig, EnforcerEvent, FailureReason,
};
use std::time::Duration;

fn enforcer_with(
    class: DeviceClass,
    ceiling: f32,
    sim_config: SimConfig,
) -> (CeilingEnforcer, SimDevice, ManualClock) {
    let device = SimDevice::new(sim_config);
    let clock = ManualClock::new();
    let enforcer = CeilingEnforcer::new(
        EnforcerConfig::default(),
        class,
        ceiling,
        Box::new(device.actuator()),
        Box::new(device.keepalive()),
        Box::new(clock.clone()),
    );
    (enforcer, device, clock)
}

/// Run every deferred task due within `horizon`
fn pump_for(enforcer: &mut CeilingEnforcer, clock: &ManualClock, horizon: Duration) {
    let end = clock.now() + horizon;
    while let Some(due) = enforcer.next_deadline() {
        if due > end {
            break;
        }
        clock.set(due);
        enforcer.run_due_tasks();
    }
    clock.set(end);
}

#[test]
fn jump_above_ceiling_is_pulled_down() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.5,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    enforcer.take_events();

    // Another app turns the volume up to 0.9
    device.set_true_level(0.9);
    enforcer.on_level_changed(0.9);
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert_eq!(device.writes().last().copied(), Some(0.5));
    assert!(device.true_level() <= 0.55);
    assert!(enforcer.observed_level() <= 0.55);
    assert_eq!(enforcer.stats().successes(), 1);
    assert_eq!(enforcer.stats().failures(), 0);

    let events = enforcer.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EnforcerEvent::ViolationDetected { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, EnforcerEvent::EnforcementSucceeded { attempts: 1, .. })));
}

#[test]
fn every_write_synthesizes_a_change_notification() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.9,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert!(!device.writes().is_empty());
    assert_eq!(device.notification_count() as usize, device.writes().len());
}

#[test]
fn lowering_ceiling_triggers_exactly_one_immediate_cycle() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        1.0,
        SimConfig {
            initial_level: 0.9,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    enforcer.take_events();
    let writes_before = device.writes().len();

    enforcer.set_ceiling(0.6);

    // The cycle begins without waiting for any poll or push tick
    assert!(enforcer.is_enforcing());
    assert_eq!(device.writes().len(), writes_before + 1);

    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    let events = enforcer.take_events();
    let violations = events
        .iter()
        .filter(|e| matches!(e, EnforcerEvent::ViolationDetected { .. }))
        .count();
    assert_eq!(violations, 1);
    assert_eq!(enforcer.stats().successes(), 1);
    assert!(device.true_level() <= 0.64);
}

#[test]
fn reduce_only_refuses_direct_increase() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::ReduceOnly,
        1.0,
        SimConfig {
            initial_level: 0.4,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    let writes_before = device.writes().len();
    let observed_before = enforcer.observed_level();
    let level_before = device.true_level();

    let outcome = enforcer.request_level(0.7);

    assert_eq!(outcome, DirectSetOutcome::RefusedIncrease);
    assert_eq!(device.writes().len(), writes_before);
    assert_eq!(enforcer.observed_level(), observed_before);
    assert_eq!(device.true_level(), level_before);
}

#[test]
fn reduce_only_accepts_direct_reduction() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::ReduceOnly,
        1.0,
        SimConfig {
            initial_level: 0.8,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    let outcome = enforcer.request_level(0.2);

    assert_eq!(outcome, DirectSetOutcome::Applied);
    assert_eq!(device.writes().last().copied(), Some(0.2));
    assert_eq!(device.true_level(), 0.2);
}

#[test]
fn undiscoverable_actuator_reports_failure_without_crashing() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.9,
            discovery_always_fails: true,
            ..SimConfig::default()
        },
    );

    // A violation exists from the first refresh
    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(60));

    assert!(!enforcer.actuator_available());
    assert!(device.writes().is_empty());
    assert_eq!(enforcer.stats().successes(), 0);
    assert!(enforcer.stats().failures() >= 1);

    let events = enforcer.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EnforcerEvent::ActuatorDiscoveryExhausted { attempts: 8 })));
    assert!(events.iter().any(|e| matches!(
        e,
        EnforcerEvent::EnforcementFailed {
            reason: FailureReason::ActuatorUnavailable,
            ..
        }
    )));
}

#[test]
fn rapid_ceiling_changes_use_the_latest_ceiling() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        1.0,
        SimConfig {
            initial_level: 0.9,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    enforcer.take_events();

    // Two changes in quick succession; the second lands mid-cycle
    enforcer.set_ceiling(0.8);
    enforcer.set_ceiling(0.3);

    pump_for(&mut enforcer, &clock, Duration::from_secs(5));

    assert_eq!(device.writes().last().copied(), Some(0.3));
    assert_eq!(device.true_level(), 0.3);
    assert_eq!(enforcer.stats().successes(), 1);
    assert_eq!(enforcer.stats().failures(), 0);
    assert!(enforcer.observed_level() <= 0.34);
}

#[test]
fn inert_actuator_disables_enforcement_with_diagnostic() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.5,
            inert: true,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    // Discovery runs, then the one-time self-test nudges and fails
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert!(enforcer.enforcement_disabled());
    let events = enforcer.take_events();
    let workaround = events.iter().find_map(|e| match e {
        EnforcerEvent::ActuatorInert { workaround } => Some(workaround.clone()),
        _ => None,
    });
    assert!(workaround.is_some_and(|w| !w.is_empty()));

    // Violations no longer drive the actuator
    let writes_before = device.writes().len();
    device.set_true_level(0.9);
    enforcer.on_level_changed(0.9);
    pump_for(&mut enforcer, &clock, Duration::from_secs(2));

    assert_eq!(device.writes().len(), writes_before);
    assert_eq!(enforcer.stats().successes(), 0);
    assert_eq!(enforcer.stats().failures(), 0);
    // The UI keeps showing the true value
    assert_eq!(enforcer.observed_level(), 0.9);
}

#[test]
fn exhausted_verification_keeps_the_true_value() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            // Below the self-test minimum, so no nudge interferes
            initial_level: 0.1,
            // Every accepted write lands 0.2 too high
            write_noise: 0.2,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_millis(100));
    enforcer.take_events();

    device.set_true_level(0.9);
    enforcer.on_level_changed(0.9);
    pump_for(&mut enforcer, &clock, Duration::from_millis(1500));

    // Three drives (the full-control retry budget), all verified too high
    assert_eq!(device.writes().len(), 3);
    assert_eq!(enforcer.stats().failures(), 1);
    assert_eq!(enforcer.stats().successes(), 0);

    // No success is claimed: the tracked level is the best-known true value
    assert!((enforcer.observed_level() - 0.7).abs() < 1e-6);

    let events = enforcer.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EnforcerEvent::EnforcementFailed {
            reason: FailureReason::Timeout,
            ..
        }
    )));
}

#[test]
fn in_flight_direct_set_suppresses_refreshes() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        1.0,
        SimConfig {
            initial_level: 0.5,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert_eq!(enforcer.request_level(0.3), DirectSetOutcome::Applied);
    assert_eq!(enforcer.observed_level(), 0.3);

    // A stale platform readback arrives before the set settles
    enforcer.on_level_changed(0.45);
    assert_eq!(enforcer.observed_level(), 0.3);

    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    assert_eq!(enforcer.observed_level(), 0.3);
    assert_eq!(device.true_level(), 0.3);
}

#[test]
fn violation_interrupts_in_flight_direct_set() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.4,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    enforcer.take_events();

    assert_eq!(enforcer.request_level(0.45), DirectSetOutcome::Applied);

    // Before the set settles, another app slams the volume up
    device.set_true_level(0.9);
    enforcer.on_level_changed(0.9);

    assert!(enforcer.is_enforcing());
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert_eq!(enforcer.stats().successes(), 1);
    assert_eq!(device.true_level(), 0.5);
    assert_eq!(enforcer.observed_level(), 0.5);
}

#[test]
fn lost_handle_is_rediscovered_during_enforcement() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        0.5,
        SimConfig {
            initial_level: 0.5,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    enforcer.take_events();

    // The platform rebuilt its view tree; the handle is gone
    device.drop_handle();
    device.set_true_level(0.9);
    enforcer.on_level_changed(0.9);
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    assert_eq!(enforcer.stats().successes(), 1);
    assert!(device.true_level() <= 0.55);
    assert!(enforcer
        .take_events()
        .iter()
        .any(|e| matches!(e, EnforcerEvent::ActuatorDiscovered)));
}

#[test]
fn discovery_retries_with_backoff_until_found() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        1.0,
        SimConfig {
            initial_level: 0.5,
            discovery_failures: 2,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(5));

    assert!(enforcer.actuator_available());
    assert_eq!(device.discovery_attempts(), 3);
    assert!(enforcer
        .take_events()
        .iter()
        .any(|e| matches!(e, EnforcerEvent::ActuatorDiscovered)));
}

#[test]
fn preset_apply_is_a_direct_set() {
    let (mut enforcer, device, clock) = enforcer_with(
        DeviceClass::FullControl,
        1.0,
        SimConfig {
            initial_level: 0.8,
            ..SimConfig::default()
        },
    );

    enforcer.start();
    pump_for(&mut enforcer, &clock, Duration::from_secs(1));

    // "Apply preset" passes the preset's stored fraction
    let night_preset_level = 0.25;
    assert_eq!(
        enforcer.request_level(night_preset_level),
        DirectSetOutcome::Applied
    );

    pump_for(&mut enforcer, &clock, Duration::from_secs(1));
    assert_eq!(device.true_level(), 0.25);
    assert_eq!(enforcer.observed_level(), 0.25);
}
