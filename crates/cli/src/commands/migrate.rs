//! Database migration command.
//!
//! ```bash
//! hocskin-cli migrate
//! ```
//!
//! Migrations live in `crates/web/migrations/` and are embedded into the
//! web crate at compile time. The web server also applies them on startup.

use thiserror::Error;

use super::DatabaseError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    hocskin_web::db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
