//! Domain types for Volume Crisis

mod device;
mod level;
mod profile;
mod stats;

pub use device::{DeviceClass, FormFactor};
pub use level::{clamp_level, level_to_percent, percent_to_level};
pub use profile::{CreatePreset, Preset, PresetId, Profile, ProfileId};
pub use stats::EnforcementStats;
