//! Account route handlers: history, profile, profile edits, and deleting
//! one's own analyses.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hocskin_core::{AnalysisId, Email};

use crate::db::{AnalysisRepository, RepositoryError, UserRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, clear_current_user, flash, set_current_user};
use crate::models::{AccountUpdate, Analysis, AnalysisStats, CurrentUser, FlashLevel, ProfileUpdate, User};
use crate::services::analysis::remove_result_image;
use crate::services::auth::{self, AuthError};
use crate::state::AppState;

/// Oldest accepted profile age.
const MAX_PROFILE_AGE: u32 = 150;

// =============================================================================
// Form Types
// =============================================================================

/// Skin-profile fields as submitted. Blank fields clear the value.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub skin_type: String,
    #[serde(default)]
    pub skin_concerns: String,
    #[serde(default)]
    pub allergies: String,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl ProfileForm {
    /// Parse into a profile update.
    ///
    /// # Errors
    ///
    /// Returns the flash text when the age is not a whole number in range.
    pub fn to_update(&self) -> std::result::Result<ProfileUpdate, &'static str> {
        let age = match non_blank(&self.age) {
            None => None,
            Some(text) => match text.parse::<u32>() {
                Ok(age) if age <= MAX_PROFILE_AGE => Some(age),
                _ => return Err("Geçerli bir yaş girin!"),
            },
        };

        Ok(ProfileUpdate {
            age,
            gender: non_blank(&self.gender),
            skin_type: non_blank(&self.skin_type),
            skin_concerns: non_blank(&self.skin_concerns),
            allergies: non_blank(&self.allergies),
        })
    }
}

/// Full account edit form.
#[derive(Debug, Deserialize)]
pub struct EditProfileForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(flatten)]
    pub profile: ProfileForm,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "account/history.html")]
pub struct HistoryTemplate {
    pub page: PageContext,
    pub analyses: Vec<Analysis>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub user: User,
    pub stats: AnalysisStats,
    pub last_analysis: Option<Analysis>,
    pub skin_types: &'static [(&'static str, &'static str)],
}

#[derive(Template, WebTemplate)]
#[template(path = "account/edit_profile.html")]
pub struct EditProfileTemplate {
    pub page: PageContext,
    pub user: User,
    pub skin_types: &'static [(&'static str, &'static str)],
}

// =============================================================================
// Handlers
// =============================================================================

/// Load the session user, or log them out if the account is gone.
async fn load_user(state: &AppState, session: &Session, current: &CurrentUser) -> Result<Option<User>> {
    let user = UserRepository::new(state.pool()).get_by_id(current.id).await?;
    if user.is_none() {
        clear_current_user(session).await?;
        flash(session, FlashLevel::Error, "Kullanıcı bulunamadı!").await;
    }
    Ok(user)
}

/// The user's analyses, newest first.
pub async fn history(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let analyses = AnalysisRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;
    Ok(HistoryTemplate { page, analyses })
}

/// Profile page with analysis averages.
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<Response> {
    let Some(user) = load_user(&state, &session, &current).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let analyses = AnalysisRepository::new(state.pool());
    let stats = analyses.stats_for_user(user.id).await?;
    let last_analysis = analyses.latest_for_user(user.id).await?;

    Ok(ProfileTemplate {
        page,
        user,
        stats,
        last_analysis,
        skin_types: filters::SKIN_TYPES,
    }
    .into_response())
}

/// Update the skin-profile fields from the profile page.
#[instrument(skip(state, session, form), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    let update = match form.to_update() {
        Ok(update) => update,
        Err(message) => {
            flash(&session, FlashLevel::Error, message).await;
            return Redirect::to("/profile").into_response();
        }
    };

    match UserRepository::new(state.pool())
        .update_profile(current.id, &update)
        .await
    {
        Ok(()) => {
            flash(&session, FlashLevel::Success, "Profil başarıyla güncellendi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Profile update failed");
            flash(&session, FlashLevel::Error, "Profil güncellenirken bir hata oluştu!").await;
        }
    }
    Redirect::to("/profile").into_response()
}

/// Display the account edit form.
pub async fn edit_profile_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<Response> {
    let Some(user) = load_user(&state, &session, &current).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    Ok(EditProfileTemplate {
        page,
        user,
        skin_types: filters::SKIN_TYPES,
    }
    .into_response())
}

/// Validate an account edit and hash the new password, if any.
fn account_update(form: &EditProfileForm) -> std::result::Result<AccountUpdate, String> {
    let username = auth::validate_username(&form.username)
        .map_err(|e| e.user_message())?
        .to_owned();
    let email = Email::parse(&form.email).map_err(|e| AuthError::from(e).user_message())?;
    let profile = form.profile.to_update().map_err(str::to_owned)?;

    let password_hash = if form.new_password.is_empty() {
        None
    } else {
        auth::validate_password(&form.new_password).map_err(|e| e.user_message())?;
        Some(auth::hash_password(&form.new_password).map_err(|e| e.user_message())?)
    };

    Ok(AccountUpdate {
        username,
        email,
        profile,
        password_hash,
    })
}

/// Handle the account edit form.
#[instrument(skip(state, session, form), fields(user_id = %current.id))]
pub async fn edit_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<EditProfileForm>,
) -> Response {
    let update = match account_update(&form) {
        Ok(update) => update,
        Err(message) => {
            flash(&session, FlashLevel::Error, message).await;
            return Redirect::to("/edit_profile").into_response();
        }
    };

    match UserRepository::new(state.pool())
        .update_account(current.id, &update)
        .await
    {
        Ok(()) => {
            let refreshed = CurrentUser {
                username: update.username.clone(),
                ..current
            };
            if let Err(e) = set_current_user(&session, &refreshed).await {
                tracing::warn!(error = %e, "Failed to refresh session user");
            }
            flash(&session, FlashLevel::Success, "Profil başarıyla güncellendi!").await;
            Redirect::to("/profile").into_response()
        }
        Err(e @ RepositoryError::Conflict(_)) => {
            let message = auth::conflict_to_auth_error(e).user_message();
            flash(&session, FlashLevel::Error, message).await;
            Redirect::to("/edit_profile").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Account update failed");
            flash(&session, FlashLevel::Error, "Profil güncellenirken bir hata oluştu!").await;
            Redirect::to("/edit_profile").into_response()
        }
    }
}

/// Delete one of the user's own analyses, its recommendations, and its
/// image.
#[instrument(skip(state, session), fields(user_id = %current.id))]
pub async fn delete_analysis(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Response> {
    let analyses = AnalysisRepository::new(state.pool());
    let id = AnalysisId::new(id);

    let Some(analysis) = analyses.get_by_id(id).await? else {
        flash(&session, FlashLevel::Error, "Analiz bulunamadı.").await;
        return Ok(Redirect::to("/history").into_response());
    };

    if analysis.user_id != current.id {
        tracing::warn!(analysis_id = %id, owner = %analysis.user_id, "Refused to delete foreign analysis");
        flash(&session, FlashLevel::Error, "Bu analizi silme yetkiniz yok!").await;
        return Ok(Redirect::to("/history").into_response());
    }

    match analyses.delete(id).await {
        Ok(image_path) => {
            remove_result_image(&state.config().static_dir, &image_path).await;
            flash(&session, FlashLevel::Success, "Analiz başarıyla silindi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Analysis delete failed");
            flash(&session, FlashLevel::Error, "Analiz silinirken bir hata oluştu!").await;
        }
    }
    Ok(Redirect::to("/history").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(age: &str) -> ProfileForm {
        ProfileForm {
            age: age.to_string(),
            gender: "female".to_string(),
            skin_type: "  oily ".to_string(),
            skin_concerns: String::new(),
            allergies: "   ".to_string(),
        }
    }

    #[test]
    fn test_profile_form_parses() {
        let update = form("34").to_update().unwrap();
        assert_eq!(update.age, Some(34));
        assert_eq!(update.skin_type.as_deref(), Some("oily"));
        assert_eq!(update.skin_concerns, None);
        assert_eq!(update.allergies, None);
    }

    #[test]
    fn test_profile_form_blank_age_clears() {
        assert_eq!(form(" ").to_update().unwrap().age, None);
    }

    #[test]
    fn test_profile_form_rejects_bad_age() {
        assert!(form("otuz").to_update().is_err());
        assert!(form("-4").to_update().is_err());
        assert!(form("151").to_update().is_err());
    }

    fn edit_form(password: &str) -> EditProfileForm {
        EditProfileForm {
            username: " ayse ".to_string(),
            email: "Ayse@Example.com".to_string(),
            new_password: password.to_string(),
            profile: form("30"),
        }
    }

    #[test]
    fn test_account_update_keeps_password_when_blank() {
        let update = account_update(&edit_form("")).unwrap();
        assert_eq!(update.username, "ayse");
        assert_eq!(update.email.as_str(), "ayse@example.com");
        assert!(update.password_hash.is_none());
    }

    #[test]
    fn test_account_update_short_password() {
        let err = account_update(&edit_form("12345")).unwrap_err();
        assert!(err.contains('6'));
    }

    #[test]
    fn test_account_update_hashes_new_password() {
        let update = account_update(&edit_form("yenisifre")).unwrap();
        assert!(update.password_hash.unwrap().starts_with("$argon2"));
    }
}
