//! Admin user management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hocskin_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, flash};
use crate::models::{AdminUserUpdate, FlashLevel, User};
use crate::routes::account::ProfileForm;
use crate::services::analysis::remove_result_image;
use crate::services::auth::{self, AuthError};
use crate::state::AppState;

use super::{Pager, checked};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_active: Option<String>,
    #[serde(default)]
    pub is_admin: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileForm,
}

impl AdminUserForm {
    fn to_update(&self) -> std::result::Result<AdminUserUpdate, String> {
        let username = auth::validate_username(&self.username)
            .map_err(|e| e.user_message())?
            .to_owned();
        let email = Email::parse(&self.email).map_err(|e| AuthError::from(e).user_message())?;
        let profile = self.profile.to_update().map_err(str::to_owned)?;

        Ok(AdminUserUpdate {
            username,
            email,
            profile,
            is_active: checked(self.is_active.as_deref()),
            is_admin: checked(self.is_admin.as_deref()),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub users: Vec<User>,
    pub pager: Pager,
    pub search_query: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_user.html")]
pub struct EditUserTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub user: User,
    pub skin_types: &'static [(&'static str, &'static str)],
}

/// User listing with search over username and email.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let listing = UserRepository::new(state.pool())
        .list(Some(&query.search), query.page.unwrap_or(1))
        .await?;

    let filters_query = if query.search.trim().is_empty() {
        String::new()
    } else {
        format!("search={}", urlencode(query.search.trim()))
    };
    let pager = Pager::new(&listing, "/admin/users", &filters_query);

    Ok(UsersTemplate {
        page,
        current_path: "/admin/users",
        users: listing.items,
        pager,
        search_query: query.search,
    })
}

/// Edit form for one user.
pub async fn edit_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    Ok(EditUserTemplate {
        page,
        current_path: "/admin/users",
        user,
        skin_types: filters::SKIN_TYPES,
    })
}

/// Save an admin edit of a user.
#[instrument(skip(state, session, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<AdminUserForm>,
) -> Response {
    let back = format!("/admin/users/{id}");
    let update = match form.to_update() {
        Ok(update) => update,
        Err(message) => {
            flash(&session, FlashLevel::Error, message).await;
            return Redirect::to(&back).into_response();
        }
    };

    match UserRepository::new(state.pool())
        .admin_update(UserId::new(id), &update)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = id, "User updated by admin");
            flash(&session, FlashLevel::Success, "Kullanıcı başarıyla güncellendi!").await;
            Redirect::to("/admin/users").into_response()
        }
        Err(e @ RepositoryError::Conflict(_)) => {
            flash(
                &session,
                FlashLevel::Error,
                auth::conflict_to_auth_error(e).user_message(),
            )
            .await;
            Redirect::to(&back).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Admin user update failed");
            flash(&session, FlashLevel::Error, "Kullanıcı güncellenirken bir hata oluştu!").await;
            Redirect::to(&back).into_response()
        }
    }
}

/// Delete a user with all of their analyses and result images.
#[instrument(skip(state, session), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    let id = UserId::new(id);
    if id == admin.id {
        flash(&session, FlashLevel::Error, "Kendi hesabınızı silemezsiniz!").await;
        return Redirect::to("/admin/users").into_response();
    }

    match UserRepository::new(state.pool()).delete(id).await {
        Ok(image_paths) => {
            for path in &image_paths {
                remove_result_image(&state.config().static_dir, path).await;
            }
            tracing::info!(user_id = %id, images = image_paths.len(), "User deleted by admin");
            flash(&session, FlashLevel::Success, "Kullanıcı başarıyla silindi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Admin user delete failed");
            flash(&session, FlashLevel::Error, "Kullanıcı silinirken bir hata oluştu!").await;
        }
    }
    Redirect::to("/admin/users").into_response()
}

/// Percent-encode a query value.
pub(crate) fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
