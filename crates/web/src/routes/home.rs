//! Home and static page handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::PageContext;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/privacy.html")]
pub struct PrivacyTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/terms.html")]
pub struct TermsTemplate {
    pub page: PageContext,
}

/// Live support page; hosts the chatbot widget.
#[derive(Template, WebTemplate)]
#[template(path = "pages/live_support.html")]
pub struct LiveSupportTemplate {
    pub page: PageContext,
}

pub async fn index(page: PageContext) -> impl IntoResponse {
    IndexTemplate { page }
}

pub async fn about(page: PageContext) -> impl IntoResponse {
    AboutTemplate { page }
}

pub async fn privacy(page: PageContext) -> impl IntoResponse {
    PrivacyTemplate { page }
}

pub async fn terms(page: PageContext) -> impl IntoResponse {
    TermsTemplate { page }
}

pub async fn live_support(page: PageContext) -> impl IntoResponse {
    LiveSupportTemplate { page }
}
