/// Profile and preset domain types
use serde::{Deserialize, Serialize};

/// Unique profile identifier
pub type ProfileId = i64;

/// Unique preset identifier
pub type PresetId = i64;

/// A user profile
///
/// Each profile owns its own set of volume presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile identifier
    pub id: ProfileId,

    /// Display name
    pub name: String,

    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
}

/// A saved volume preset belonging to a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Unique preset identifier
    pub id: PresetId,

    /// Owning profile
    pub profile_id: ProfileId,

    /// Display name (e.g., "Night", "Commute")
    pub name: String,

    /// Stored output level, fraction in [0, 1]
    pub level: f32,

    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
}

/// Request to create a new preset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePreset {
    /// Owning profile
    pub profile_id: ProfileId,

    /// Display name
    pub name: String,

    /// Output level, fraction in [0, 1] (clamped at the storage boundary)
    pub level: f32,
}
