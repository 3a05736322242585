//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] hocskin_core::EmailError),

    /// Username empty or too long.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account deactivated by an administrator.
    #[error("account disabled")]
    AccountDisabled,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Username already taken.
    #[error("username already taken")]
    UsernameTaken,

    /// Email already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message shown to the user as a flash.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Geçerli bir e-posta adresi girin!".to_string(),
            Self::InvalidUsername(msg) | Self::WeakPassword(msg) => msg.clone(),
            Self::InvalidCredentials | Self::UserNotFound => {
                "E-posta veya şifre hatalı!".to_string()
            }
            Self::AccountDisabled => {
                "Hesabınız devre dışı bırakılmış. Lütfen bizimle iletişime geçin.".to_string()
            }
            Self::UsernameTaken => "Bu kullanıcı adı zaten kullanılıyor!".to_string(),
            Self::EmailTaken => "Bu e-posta adresi zaten kullanılıyor!".to_string(),
            Self::PasswordMismatch => "Şifreler eşleşmiyor!".to_string(),
            Self::Repository(_) | Self::PasswordHash => {
                "İşlem sırasında bir hata oluştu. Lütfen tekrar deneyin.".to_string()
            }
        }
    }
}
