//! Session-related types.
//!
//! Types stored in the session for authentication, flash messages, and
//! chatbot state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hocskin_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
/// `is_admin` only drives navigation; admin routes re-read it from the
/// database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<&crate::models::User> for CurrentUser {
    fn from(user: &crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Severity of a flash message, mapped to a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "flash-info",
            Self::Success => "flash-success",
            Self::Error => "flash-error",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Per-visitor chatbot state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChatbotSession {
    pub initialized_at: DateTime<Utc>,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";

    /// Key for the anonymous free-trial flag (absent means still available).
    pub const HAS_FREE_TRIAL: &str = "has_free_trial";

    /// Key for chatbot initialization state.
    pub const CHATBOT: &str = "chatbot";
}
