//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /about, /privacy, /terms   - Static pages
//! GET  /live_support              - Live support (chatbot widget)
//!
//! # Analysis
//! GET  /analyze                   - Upload form
//! POST /analyze                   - Run an analysis (multipart `image` or `capturedImage`)
//!
//! # Auth
//! GET  /login, /register          - Forms
//! POST /login, /register          - Actions
//! POST /logout                    - Logout action
//!
//! # Account (requires auth)
//! GET  /history                   - Analysis history
//! GET  /profile                   - Profile and averages
//! POST /update_profile            - Skin profile fields
//! GET  /edit_profile              - Account edit form
//! POST /edit_profile              - Account edit action
//! POST /delete_analysis/{id}      - Delete an own analysis
//!
//! # Reports (requires auth)
//! GET  /download_report           - PDF of the latest analysis
//! GET  /analyses/{id}/report      - PDF of an own analysis
//!
//! # Contact & chatbot
//! GET  /contact, POST /contact    - Contact form
//! POST /initialize                - Start the chatbot (JSON)
//! POST /ask                       - Ask the chatbot (JSON)
//!
//! # Admin (requires admin)
//! GET  /admin                                   - Dashboard
//! GET  /admin/users                             - Users (?page, ?search)
//! GET  /admin/users/{id}, POST                  - Edit user
//! POST /admin/users/{id}/delete                 - Delete user
//! GET  /admin/analyses                          - Analyses (?page, ?search, ?date, ?skin_type)
//! GET  /admin/analyses/{id}                     - Analysis detail
//! POST /admin/analyses/{id}/delete              - Delete analysis
//! GET  /admin/recommendations                   - Recommendations (?page)
//! POST /admin/recommendations/add               - Add recommendation
//! GET  /admin/recommendations/{id}, POST        - Edit recommendation
//! POST /admin/recommendations/{id}/delete       - Delete recommendation
//! ```

pub mod account;
pub mod admin;
pub mod analyze;
pub mod auth;
pub mod chatbot;
pub mod contact;
pub mod home;
pub mod report;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Public pages.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .route("/privacy", get(home::privacy))
        .route("/terms", get(home::terms))
        .route("/live_support", get(home::live_support))
        .route("/contact", get(contact::contact_page).post(contact::submit_contact))
}

/// Analysis upload. Carries its own body limit for image uploads.
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", get(analyze::analyze_page).post(analyze::analyze))
        .layer(DefaultBodyLimit::max(analyze::MAX_UPLOAD_BYTES))
}

/// Authentication routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Account routes (require authentication).
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(account::history))
        .route("/profile", get(account::profile))
        .route("/update_profile", post(account::update_profile))
        .route(
            "/edit_profile",
            get(account::edit_profile_page).post(account::edit_profile),
        )
        .route("/delete_analysis/{id}", post(account::delete_analysis))
        .route("/download_report", get(report::download_latest))
        .route("/analyses/{id}/report", get(report::download_for_analysis))
}

/// Chatbot JSON endpoints.
pub fn chatbot_routes() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(chatbot::initialize))
        .route("/ask", post(chatbot::ask))
}

/// Admin panel, nested under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard::dashboard))
        .route("/users", get(admin::users::list))
        .route(
            "/users/{id}",
            get(admin::users::edit_page).post(admin::users::update),
        )
        .route("/users/{id}/delete", post(admin::users::delete))
        .route("/analyses", get(admin::analyses::list))
        .route("/analyses/{id}", get(admin::analyses::view))
        .route("/analyses/{id}/delete", post(admin::analyses::delete))
        .route("/recommendations", get(admin::recommendations::list))
        .route("/recommendations/add", post(admin::recommendations::add))
        .route(
            "/recommendations/{id}",
            get(admin::recommendations::edit_page).post(admin::recommendations::update),
        )
        .route(
            "/recommendations/{id}/delete",
            post(admin::recommendations::delete),
        )
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(page_routes())
        .merge(analyze_routes())
        .merge(auth_routes())
        .merge(account_routes())
        .merge(chatbot_routes())
        .nest("/admin", admin_routes())
}
