//! Volume Crisis Core
//!
//! Platform-agnostic core types, error handling, and the clock abstraction
//! for Volume Crisis.
//!
//! This crate provides the foundational building blocks used by the
//! enforcement, storage, and application layers.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `DeviceClass`, `EnforcementStats`, `Profile`, `Preset`
//! - **Level Math**: clamped fractional levels and percent conversions
//! - **Clock**: a narrow time source trait so hosts and tests control time
//! - **Error Handling**: unified `CrisisError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use crisis_core::types::{DeviceClass, FormFactor, clamp_level, level_to_percent};
//!
//! // Classify the device once at startup
//! let class = DeviceClass::classify(FormFactor::Tablet);
//! assert_eq!(class, DeviceClass::FullControl);
//!
//! // Levels are fractions in [0, 1]
//! assert_eq!(clamp_level(1.7), 1.0);
//! assert_eq!(level_to_percent(0.5), 50);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CrisisError, Result};
pub use types::{
    clamp_level, level_to_percent, percent_to_level, CreatePreset, DeviceClass, EnforcementStats,
    FormFactor, Preset, PresetId, Profile, ProfileId,
};
