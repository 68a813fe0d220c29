//! Fractional level math
//!
//! Output levels are fractions in [0.0, 1.0] everywhere inside the system.
//! The percent forms (integers 0-100) exist only at the assistant-intent and
//! display boundaries.

/// Clamp a level into the valid [0.0, 1.0] range
///
/// Non-finite inputs clamp to 0.0 so a corrupted platform read can never
/// propagate NaN into control decisions.
#[must_use]
pub fn clamp_level(level: f32) -> f32 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Convert a fractional level to an integer percentage (0-100)
#[must_use]
pub fn level_to_percent(level: f32) -> u8 {
    (clamp_level(level) * 100.0).round() as u8
}

/// Convert an integer percentage to a fractional level
///
/// Values above 100 clamp to 1.0.
#[must_use]
pub fn percent_to_level(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}
