//! Profile CRUD
//!
//! Profiles are thin: an id, a name, and ownership of presets. Deleting a
//! profile cascades to its presets.

use sqlx::{Row, SqlitePool};

use crate::error::StorageError;
use crate::Result;
use crisis_core::types::{Profile, ProfileId};

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

/// Create a new profile
///
/// # Errors
///
/// Returns an error if the insert fails (e.g., duplicate name)
pub async fn create(pool: &SqlitePool, name: &str) -> Result<Profile> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query("INSERT INTO profiles (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(Profile {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        created_at: now,
    })
}

/// Get a profile by ID
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such profile exists
pub async fn get(pool: &SqlitePool, id: ProfileId) -> Result<Profile> {
    let row = sqlx::query("SELECT id, name, created_at FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_profile(&r))
        .ok_or_else(|| StorageError::not_found("Profile", id))
}

/// Get all profiles, ordered by creation time
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Profile>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM profiles ORDER BY created_at, id")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(row_to_profile).collect())
}

/// Rename a profile
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such profile exists
pub async fn rename(pool: &SqlitePool, id: ProfileId, name: &str) -> Result<()> {
    let result = sqlx::query("UPDATE profiles SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Profile", id));
    }

    Ok(())
}

/// Delete a profile and its presets
///
/// # Errors
///
/// Returns `StorageError::NotFound` if no such profile exists
pub async fn delete(pool: &SqlitePool, id: ProfileId) -> Result<()> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Profile", id));
    }

    Ok(())
}
