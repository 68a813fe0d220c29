//! Assistant intent bindings
//!
//! Voice assistants speak integer percentages; everything else in the system
//! is a fraction. These methods are the whole binding: they translate and
//! reuse the exact entry points the UI calls.

use crate::enforcer::CeilingEnforcer;
use crate::types::DirectSetOutcome;
use crisis_core::types::{level_to_percent, percent_to_level};

impl CeilingEnforcer {
    /// "Set my volume limit to N percent"
    pub fn set_ceiling_percent(&mut self, percent: u8) {
        self.set_ceiling(percent_to_level(percent));
    }

    /// "What is my volume limit?" - integer 0-100
    pub fn ceiling_percent(&self) -> u8 {
        level_to_percent(self.ceiling())
    }

    /// "What is the volume?" - integer 0-100
    pub fn level_percent(&self) -> u8 {
        level_to_percent(self.observed_level())
    }

    /// "Set the volume to N percent"
    pub fn request_level_percent(&mut self, percent: u8) -> DirectSetOutcome {
        self.request_level(percent_to_level(percent))
    }
}
