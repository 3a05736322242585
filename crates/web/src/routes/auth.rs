//! Registration, login, and logout handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, clear_current_user, flash, set_current_user};
use crate::models::{CurrentUser, FlashLevel};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> impl IntoResponse {
    LoginTemplate { page }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            if let Err(e) = set_current_user(&session, &CurrentUser::from(&user)).await {
                tracing::error!("Failed to set session: {}", e);
                flash(&session, FlashLevel::Error, "Oturum açılamadı, lütfen tekrar deneyin.").await;
                return Redirect::to("/login").into_response();
            }
            set_sentry_user(&user.id, Some(&user.username));
            flash(&session, FlashLevel::Success, "Giriş başarılı!").await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            flash(&session, FlashLevel::Error, e.user_message()).await;
            Redirect::to("/login").into_response()
        }
    }
}

/// Display the registration page.
pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate { page }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        username: &form.username,
        email: &form.email,
        password: &form.password,
        confirm_password: &form.confirm_password,
    };

    match AuthService::new(state.pool()).register(&registration).await {
        Ok(_) => {
            flash(
                &session,
                FlashLevel::Success,
                "Kayıt başarılı! Şimdi giriş yapabilirsiniz.",
            )
            .await;
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::warn!("Registration failed: {}", e);
            flash(&session, FlashLevel::Error, e.user_message()).await;
            Redirect::to("/register").into_response()
        }
    }
}

/// Handle logout.
///
/// Destroys the session, then starts a fresh one carrying the goodbye flash.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    flash(&session, FlashLevel::Info, "Çıkış yapıldı!").await;
    Redirect::to("/").into_response()
}
