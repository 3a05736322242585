//! Admin rights management.
//!
//! # Usage
//!
//! ```bash
//! hocskin-cli admin promote -e user@example.com
//! hocskin-cli admin demote -e user@example.com
//! ```
//!
//! The user must already be registered through the site.

use hocskin_core::{Email, EmailError};
use hocskin_web::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::DatabaseError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// No user with this email.
    #[error("No user registered with email: {0}")]
    UserNotFound(String),
}

/// Grant (`true`) or revoke (`false`) admin rights.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = super::connect().await?;

    let updated = UserRepository::new(&pool).set_admin(&email, is_admin).await?;
    if !updated {
        return Err(AdminError::UserNotFound(email.to_string()));
    }

    if is_admin {
        tracing::info!("{} is now an admin", email);
    } else {
        tracing::info!("{} is no longer an admin", email);
    }
    Ok(())
}
