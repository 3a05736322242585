//! Database operations for the HocSkin `SQLite` store.
//!
//! ## Tables
//!
//! - `users` - Accounts and skin profiles
//! - `analyses` - One row per persisted skin analysis (cascades from `users`)
//! - `product_recommendations` - Generated per analysis (cascades from
//!   `analyses`) or added by admins without an analysis
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p hocskin-cli -- migrate
//! ```

pub mod analyses;
pub mod recommendations;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

pub use analyses::{AnalysisFilter, AnalysisRepository};
pub use recommendations::RecommendationRepository;
pub use users::UserRepository;

/// Schema migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Rows per page on every paginated listing.
pub const PAGE_SIZE: u32 = 10;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email). Carries the offending column.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint failure to [`RepositoryError::Conflict`].
///
/// `SQLite` reports the column as `UNIQUE constraint failed: table.column`;
/// the column name is kept so callers can tell username from email clashes.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let column = db_err
            .message()
            .rsplit('.')
            .next()
            .unwrap_or("unknown")
            .trim()
            .to_owned();
        return RepositoryError::Conflict(column);
    }
    RepositoryError::Database(err)
}

/// Convert a stored `INTEGER` count back into the domain's `u32`.
pub(crate) fn count_from_db(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("invalid {column} in database: {value}")))
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    /// Total rows across all pages
    pub total: i64,
}

impl<T> Page<T> {
    /// Number of pages (at least 1, so an empty listing still renders page 1).
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let per_page = i64::from(self.per_page.max(1));
        let pages = (self.total + per_page - 1) / per_page;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn prev(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

/// `LIMIT`/`OFFSET` for a 1-based page number.
pub(crate) fn page_bounds(page: u32) -> (u32, i64, i64) {
    let page = page.max(1);
    let offset = i64::from(page - 1) * i64::from(PAGE_SIZE);
    (page, i64::from(PAGE_SIZE), offset)
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(crate) fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// Creates the database file if missing and enforces foreign keys, which the
/// cascade rules depend on.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection fails.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a single-connection in-memory pool.
///
/// The database lives as long as its one connection, so the pool never
/// recycles it. Intended for tests and throwaway runs.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Apply all pending schema migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
