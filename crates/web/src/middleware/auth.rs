//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user or an administrator in
//! route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::models::{CurrentUser, FlashLevel, User, session_keys};
use crate::state::AppState;

use super::flash::flash;

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, flashes a message and redirects to `/login`.
///
/// # Example
///
/// ```rust,ignore
/// async fn history(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication or authorization fails.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page.
    RedirectToLogin,
    /// Redirect home (logged in but not allowed).
    RedirectHome,
    /// Session layer missing.
    Unauthorized,
    /// Session or database lookup failed.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

fn session_from_parts(parts: &Parts) -> Result<&Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;

        match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => {
                flash(session, FlashLevel::Error, "Lütfen giriş yapın!").await;
                Err(AuthRejection::RedirectToLogin)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read session");
                Err(AuthRejection::Internal)
            }
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor that requires an active administrator.
///
/// Admin status is re-read from the database on every request, so a
/// demotion takes effect immediately.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;

        let current = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to read session");
                AuthRejection::Internal
            })?;
        let Some(current) = current else {
            flash(
                session,
                FlashLevel::Error,
                "Bu sayfaya erişmek için giriş yapmalısınız.",
            )
            .await;
            return Err(AuthRejection::RedirectToLogin);
        };

        let user = UserRepository::new(state.pool())
            .get_by_id(current.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load admin user");
                AuthRejection::Internal
            })?;

        match user {
            Some(user) if user.is_admin && user.is_active => Ok(Self(user)),
            _ => {
                tracing::warn!(user_id = %current.id, "Non-admin tried to access admin page");
                flash(session, FlashLevel::Error, "Bu sayfaya erişim yetkiniz yok.").await;
                Err(AuthRejection::RedirectHome)
            }
        }
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
