//! Device-scoped settings
//!
//! Settings are stored as key-value pairs with JSON-serialized values for
//! flexibility. The volume ceiling lives here under [`SETTING_VOLUME_CEILING`];
//! a missing row is not an error, it means "no limit" (1.0).
//!
//! # Example
//!
//! ```rust,no_run
//! use crisis_storage::settings;
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! // Persist a ceiling of 60%
//! settings::store_ceiling(pool, 0.6).await?;
//!
//! // Read it back
//! let ceiling = settings::load_ceiling(pool).await?;
//! assert_eq!(ceiling, 0.6);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::error::StorageError;
use crate::Result;
use crisis_core::types::clamp_level;

// Setting key constants
/// Volume ceiling, fraction in [0, 1]
pub const SETTING_VOLUME_CEILING: &str = "audio.volume_ceiling";

/// Identifier of the currently active profile
pub const SETTING_ACTIVE_PROFILE: &str = "app.active_profile";

/// Whether the background keep-alive loop is enabled
pub const SETTING_KEEPALIVE_ENABLED: &str = "audio.keepalive_enabled";

/// A stored setting entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Setting key
    pub key: String,
    /// Setting value (JSON)
    pub value: serde_json::Value,
}

/// Get a single setting value
///
/// # Returns
///
/// Returns `Ok(Some(value))` if the setting exists, `Ok(None)` if not found
///
/// # Errors
///
/// Returns an error if the query fails or JSON deserialization fails
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<serde_json::Value>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.get("value");
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Set a setting value
///
/// # Errors
///
/// Returns an error if the query fails or JSON serialization fails
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &serde_json::Value) -> Result<()> {
    let value_str = serde_json::to_string(value)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value_str)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get all settings
///
/// # Errors
///
/// Returns an error if the query fails or JSON deserialization fails
pub async fn get_all_settings(pool: &SqlitePool) -> Result<Vec<Setting>> {
    let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key")
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let raw: String = row.get("value");
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            Ok(Setting {
                key: row.get("key"),
                value,
            })
        })
        .collect()
}

/// Load the persisted volume ceiling
///
/// A missing or malformed value is a persistence miss, not an error: the
/// ceiling defaults to 1.0 (no limit). Stored values are clamped to [0, 1].
///
/// # Errors
///
/// Returns an error only if the query itself fails
pub async fn load_ceiling(pool: &SqlitePool) -> Result<f32> {
    let value = get_setting(pool, SETTING_VOLUME_CEILING).await?;

    let ceiling = value
        .and_then(|v| v.as_f64())
        .map_or(1.0, |v| clamp_level(v as f32));

    Ok(ceiling)
}

/// Persist the volume ceiling
///
/// The value is clamped to [0, 1] before writing.
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn store_ceiling(pool: &SqlitePool, ceiling: f32) -> Result<()> {
    let clamped = clamp_level(ceiling);
    set_setting(
        pool,
        SETTING_VOLUME_CEILING,
        &serde_json::json!(f64::from(clamped)),
    )
    .await
}
