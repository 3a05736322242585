//! User domain types.

use chrono::{DateTime, Utc};

use hocskin_core::{Email, UserId};

/// A registered HocSkin user (domain type).
///
/// The password hash is deliberately absent; it is only read by the login
/// path through [`crate::db::UserRepository::get_credentials`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    /// Real age, used as the base age of skin-age estimates.
    pub age: Option<u32>,
    pub gender: Option<String>,
    /// Self-reported skin type (dry, normal, oily, combination, sensitive).
    pub skin_type: Option<String>,
    pub skin_concerns: Option<String>,
    pub allergies: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Base age for skin-age estimation, if the profile has one.
    #[must_use]
    pub fn base_age(&self) -> Option<f64> {
        self.age.map(f64::from)
    }

    /// Skin type recorded on new analyses.
    #[must_use]
    pub fn analysis_skin_type(&self) -> &str {
        self.skin_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
    }

    /// Whether the profile's skin type is `code`; preselects form options.
    #[must_use]
    pub fn has_skin_type(&self, code: &str) -> bool {
        self.skin_type.as_deref() == Some(code)
    }

    #[must_use]
    pub fn has_gender(&self, code: &str) -> bool {
        self.gender.as_deref() == Some(code)
    }
}

/// Skin-profile fields a user edits on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub skin_type: Option<String>,
    pub skin_concerns: Option<String>,
    pub allergies: Option<String>,
}

/// Full account edit: identity, profile, and an optional new password hash.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub username: String,
    pub email: Email,
    pub profile: ProfileUpdate,
    pub password_hash: Option<String>,
}

/// Admin edit of another user's account.
#[derive(Debug, Clone)]
pub struct AdminUserUpdate {
    pub username: String,
    pub email: Email,
    pub profile: ProfileUpdate,
    pub is_active: bool,
    pub is_admin: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(age: Option<u32>, skin_type: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            username: "ayse".to_string(),
            email: Email::parse("ayse@example.com").unwrap(),
            age,
            gender: None,
            skin_type: skin_type.map(str::to_string),
            skin_concerns: None,
            allergies: None,
            is_active: true,
            is_admin: false,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_base_age_from_profile() {
        assert_eq!(user(Some(42), None).base_age(), Some(42.0));
        assert_eq!(user(None, None).base_age(), None);
    }

    #[test]
    fn test_analysis_skin_type_defaults_to_unknown() {
        assert_eq!(user(None, Some("oily")).analysis_skin_type(), "oily");
        assert_eq!(user(None, Some("")).analysis_skin_type(), "unknown");
        assert_eq!(user(None, None).analysis_skin_type(), "unknown");
    }
}
