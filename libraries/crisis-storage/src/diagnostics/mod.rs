//! Diagnostic log collection
//!
//! Append-only log of enforcement failures and actuator faults, kept so the
//! debug screen can show what went wrong after the fact. Writers should call
//! [`prune`] occasionally; the table is not expected to grow without bound.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::Result;

/// Severity of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Parse from string, defaulting unknown values to `Error`
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "info" => Self::Info,
            "warning" => Self::Warning,
            _ => Self::Error,
        }
    }
}

/// A stored diagnostic entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    /// Row identifier
    pub id: i64,
    /// Category tag (e.g., "enforcement", "actuator", "background")
    pub category: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
}

/// Append a diagnostic entry
///
/// # Errors
///
/// Returns an error if the insert fails
pub async fn append(
    pool: &SqlitePool,
    category: &str,
    severity: Severity,
    message: &str,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO diagnostics (category, severity, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(category)
    .bind(severity.as_str())
    .bind(message)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the most recent diagnostic entries, newest first
///
/// # Errors
///
/// Returns an error if the query fails
pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<DiagnosticEntry>> {
    let rows = sqlx::query(
        "SELECT id, category, severity, message, created_at FROM diagnostics
         ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DiagnosticEntry {
            id: row.get("id"),
            category: row.get("category"),
            severity: Severity::from_str_lossy(row.get("severity")),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Delete all but the newest `keep` entries
///
/// # Errors
///
/// Returns an error if the delete fails
pub async fn prune(pool: &SqlitePool, keep: i64) -> Result<()> {
    sqlx::query(
        "DELETE FROM diagnostics WHERE id NOT IN
         (SELECT id FROM diagnostics ORDER BY created_at DESC, id DESC LIMIT ?)",
    )
    .bind(keep)
    .execute(pool)
    .await?;

    Ok(())
}
