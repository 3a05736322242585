//! Authentication service.
//!
//! Password registration and login backed by argon2 PHC hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;

use hocskin_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 80;

/// Registration form input.
#[derive(Debug)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns a validation error (`PasswordMismatch`, `WeakPassword`,
    /// `InvalidEmail`, `InvalidUsername`), `UsernameTaken` or `EmailTaken`
    /// when either is already in use.
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        let username = validate_username(form.username)?;
        let email = Email::parse(form.email)?;

        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(form.password)?;

        if self.users.get_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(form.password)?;

        self.users
            .create(username, &email, &password_hash)
            .await
            .map_err(conflict_to_auth_error)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// and `AuthError::AccountDisabled` for deactivated accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.users.record_login(user.id).await?;
        Ok(user)
    }
}

/// Map a repository conflict on a unique column to the matching auth error.
pub fn conflict_to_auth_error(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(column) if column == "username" => AuthError::UsernameTaken,
        RepositoryError::Conflict(_) => AuthError::EmailTaken,
        other => AuthError::Repository(other),
    }
}

/// Validate a username, returning it trimmed.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` if it is empty or too long.
pub fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername(
            "Kullanıcı adı boş olamaz!".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "Kullanıcı adı en fazla {MAX_USERNAME_LENGTH} karakter olabilir!"
        )));
    }
    Ok(username)
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if shorter than [`MIN_PASSWORD_LENGTH`].
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Şifre en az {MIN_PASSWORD_LENGTH} karakter olmalıdır!"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("gizli-sifre").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("gizli-sifre", &hash).is_ok());
        assert!(matches!(
            verify_password("yanlis", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("şğüöçı").is_ok());
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  ayse ").unwrap(), "ayse");
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"a".repeat(81)).is_err());
    }

    #[test]
    fn test_conflict_mapping() {
        assert!(matches!(
            conflict_to_auth_error(RepositoryError::Conflict("username".into())),
            AuthError::UsernameTaken
        ));
        assert!(matches!(
            conflict_to_auth_error(RepositoryError::Conflict("email".into())),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            conflict_to_auth_error(RepositoryError::NotFound),
            AuthError::Repository(RepositoryError::NotFound)
        ));
    }
}
