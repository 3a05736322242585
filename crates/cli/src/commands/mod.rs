//! CLI subcommands.

pub mod admin;
pub mod catalog;
pub mod migrate;

use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

/// Errors shared by the database-backed commands.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `HOCSKIN_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<SqlitePool, DatabaseError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("HOCSKIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| DatabaseError::MissingEnvVar("HOCSKIN_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(hocskin_web::db::create_pool(&SecretString::from(database_url)).await?)
}
