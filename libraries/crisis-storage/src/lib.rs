//! Volume Crisis Storage
//!
//! `SQLite` persistence layer for Volume Crisis.
//!
//! This crate stores the small amount of state the app keeps across runs:
//! device-scoped settings (most importantly the volume ceiling), user
//! profiles with their saved volume presets, and an append-only diagnostic
//! log of enforcement failures.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each feature owns its own queries and logic
//! - **Embedded Migrations**: schema ships inside the binary
//! - **JSON Values**: settings values are JSON text for flexibility
//!
//! # Example
//!
//! ```rust,no_run
//! use crisis_storage::{create_pool, run_migrations, settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://crisis.db").await?;
//! run_migrations(&pool).await?;
//!
//! // Ceiling defaults to 1.0 (no limit) when nothing is stored
//! let ceiling = settings::load_ceiling(&pool).await?;
//! assert!(ceiling <= 1.0);
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod diagnostics;
pub mod presets;
pub mod profiles;
pub mod settings;

pub use error::StorageError;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `sqlite://crisis.db`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
