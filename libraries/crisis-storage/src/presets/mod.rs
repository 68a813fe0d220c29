//! Preset CRUD
//!
//! A preset stores a named fractional level inside a profile. Levels are
//! clamped to [0, 1] at this boundary so nothing out of range ever reaches
//! the enforcer through "apply preset".

use sqlx::{Row, SqlitePool};

use crate::error::StorageError;
use crate::Result;
use crisis_core::types::{clamp_level, CreatePreset, Preset, PresetId, ProfileId};

fn row_to_preset(row: &sqlx::sqlite::SqliteRow) -> Preset {
    Preset {
        id: row.get("id"),
        profile_id: row.get("profile_id"),
        name: row.get("name"),
        level: row.get::<f64, _>("level") as f32,
        created_at: row.get("created_at"),
    }
}

/// Create a new preset
///
/// # Errors
///
/// Returns an error if the insert fails (e.g., unknown profile, duplicate name)
pub async fn create(pool: &SqlitePool, preset: CreatePreset) -> Result<Preset> {
    let level = clamp_level(preset.level);
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO presets (profile_id, name, level, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(preset.profile_id)
    .bind(&preset.name)
    .bind(f64::from(level))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Preset {
        id: result.last_insert_rowid(),
        profile_id: preset.profile_id,
        name: preset.name,
        level,
        created_at: now,
    })
}

/// Get a preset by ID
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such preset exists
pub async fn get(pool: &SqlitePool, id: PresetId) -> Result<Preset> {
    let row = sqlx::query(
        "SELECT id, profile_id, name, level, created_at FROM presets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_preset(&r))
        .ok_or_else(|| StorageError::not_found("Preset", id))
}

/// Get all presets belonging to a profile, ordered by name
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn get_for_profile(pool: &SqlitePool, profile_id: ProfileId) -> Result<Vec<Preset>> {
    let rows = sqlx::query(
        "SELECT id, profile_id, name, level, created_at FROM presets
         WHERE profile_id = ? ORDER BY name",
    )
    .bind(profile_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_preset).collect())
}

/// Update the stored level of a preset
///
/// The level is clamped to [0, 1] before writing.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such preset exists
pub async fn update_level(pool: &SqlitePool, id: PresetId, level: f32) -> Result<()> {
    let result = sqlx::query("UPDATE presets SET level = ? WHERE id = ?")
        .bind(f64::from(clamp_level(level)))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Preset", id));
    }

    Ok(())
}

/// Delete a preset
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such preset exists
pub async fn delete(pool: &SqlitePool, id: PresetId) -> Result<()> {
    let result = sqlx::query("DELETE FROM presets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Preset", id));
    }

    Ok(())
}
