//! Contact form.

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

use crate::filters;
use crate::middleware::{PageContext, flash};
use crate::models::FlashLevel;
use crate::services::email::{ContactMessage, EmailError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
}

pub async fn contact_page(page: PageContext) -> impl IntoResponse {
    ContactTemplate { page }
}

/// Forward a contact message to the team inbox.
#[instrument(skip_all)]
pub async fn submit_contact(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Response {
    match send(&state, &form).await {
        Ok(()) => {
            flash(
                &session,
                FlashLevel::Success,
                "Mesajınız başarıyla gönderilmiştir. Ekiplerimiz en yakın zamanda sizinle iletişime geçecektir.",
            )
            .await;
        }
        Err(EmailError::MissingField(field)) => {
            tracing::debug!(field, "Contact form incomplete");
            flash(&session, FlashLevel::Error, "Lütfen tüm alanları doldurun!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Contact message not sent");
            flash(
                &session,
                FlashLevel::Error,
                "Mesaj gönderilirken bir hata oluştu! Lütfen daha sonra tekrar deneyiniz.",
            )
            .await;
        }
    }
    Redirect::to("/contact").into_response()
}

async fn send(state: &AppState, form: &ContactForm) -> Result<(), EmailError> {
    let message = ContactMessage::new(&form.name, &form.email, &form.subject, &form.message)?;
    let email = state.email().ok_or(EmailError::NotConfigured)?;
    email.send_contact(&message).await
}
