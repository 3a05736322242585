//! Analysis upload and results.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use hocskin_core::catalog::RecommendationTemplate;
use hocskin_core::skin_age::SkinAgeEstimate;
use hocskin_core::{AnalysisId, ConditionCounts, Severity};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, clear_current_user, flash};
use crate::models::{Flash, FlashLevel, session_keys};
use crate::services::analysis::{AnalysisService, ImageSource};
use crate::state::AppState;

/// Largest accepted request body for `/analyze`.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// One detected condition, ready for display.
#[derive(Debug, Clone)]
pub struct FindingView {
    pub label: &'static str,
    pub count: u32,
    pub unit: &'static str,
    pub severity: &'static str,
    pub color: &'static str,
}

impl FindingView {
    /// Views for every category with at least one detection.
    #[must_use]
    pub fn from_counts(counts: &ConditionCounts) -> Vec<Self> {
        counts
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(category, count)| {
                let severity = Severity::from_count(count);
                Self {
                    label: category.label(),
                    count,
                    unit: category.unit(),
                    severity: severity.label(),
                    color: severity.color_hex(),
                }
            })
            .collect()
    }
}

/// Upload form.
#[derive(Template, WebTemplate)]
#[template(path = "analyze.html")]
pub struct AnalyzeTemplate {
    pub page: PageContext,
}

/// Analysis results page.
#[derive(Template, WebTemplate)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub page: PageContext,
    pub image_path: String,
    pub findings: Vec<FindingView>,
    pub skin_type: String,
    pub age_bracket: String,
    pub estimate: SkinAgeEstimate,
    pub recommendations: Vec<RecommendationTemplate>,
    pub model_errors: Vec<String>,
    /// Set when the analysis was stored.
    pub analysis_id: Option<AnalysisId>,
    pub is_free_trial: bool,
}

/// Display the upload form.
pub async fn analyze_page(page: PageContext) -> impl IntoResponse {
    AnalyzeTemplate { page }
}

/// Pull the image out of the multipart form. A non-empty camera capture
/// wins over a file upload.
async fn read_image(multipart: &mut Multipart) -> Result<ImageSource> {
    let mut upload = None;
    let mut capture = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Görsel işlenemedi: {e}")))?
    {
        match field.name() {
            Some("capturedImage") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Kamera görüntüsü işlenemedi: {e}")))?;
                if !text.trim().is_empty() {
                    capture = Some(text);
                }
            }
            Some("image") => {
                let has_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Görsel işlenemedi: {e}")))?;
                if has_name && !bytes.is_empty() {
                    upload = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    capture
        .map(ImageSource::Capture)
        .or_else(|| upload.map(ImageSource::Upload))
        .ok_or_else(|| AppError::BadRequest("Görsel yüklenmedi".to_string()))
}

/// Run an analysis.
///
/// Anonymous visitors get one free analysis per session; their results are
/// shown but not stored.
#[instrument(skip_all, fields(user_id = page.user.as_ref().map(|u| u.id.as_i64())))]
pub async fn analyze(
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    mut multipart: Multipart,
) -> Result<Response> {
    let user = match &page.user {
        Some(current) => {
            let user = UserRepository::new(state.pool()).get_by_id(current.id).await?;
            if user.is_none() {
                clear_current_user(&session).await?;
                flash(&session, FlashLevel::Error, "Lütfen giriş yapın!").await;
                return Ok(Redirect::to("/login").into_response());
            }
            user
        }
        None => {
            let has_free_trial = session
                .get::<bool>(session_keys::HAS_FREE_TRIAL)
                .await?
                .unwrap_or(true);
            if !has_free_trial {
                flash(
                    &session,
                    FlashLevel::Info,
                    "Ücretsiz deneme hakkınızı kullandınız. Daha fazla analiz için lütfen üye olun.",
                )
                .await;
                return Ok(Redirect::to("/register").into_response());
            }
            None
        }
    };

    let source = read_image(&mut multipart).await?;
    let run = state.analysis().run(source, user.as_ref()).await?;

    let mut analysis_id = None;
    let mut recommendations = run.recommendations.clone();
    match &user {
        Some(user) => match AnalysisService::save(state.pool(), user, &run).await {
            Ok((analysis, stored)) => {
                analysis_id = Some(analysis.id);
                recommendations = stored.iter().map(RecommendationTemplate::from).collect();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to store analysis");
                page.flashes.push(Flash {
                    level: FlashLevel::Error,
                    message: "Analiz kaydedilirken bir hata oluştu. Sonuçlar geçmişinize eklenmedi."
                        .to_string(),
                });
            }
        },
        None => {
            session.insert(session_keys::HAS_FREE_TRIAL, false).await?;
        }
    }

    let model_errors = run
        .report
        .errors()
        .into_iter()
        .map(|(kind, error)| format!("{kind}: {error}"))
        .collect();

    Ok(ResultsTemplate {
        image_path: run.image_path.clone(),
        findings: FindingView::from_counts(&run.counts),
        skin_type: run.skin_type.clone(),
        age_bracket: run.report.age_bracket.value.clone(),
        estimate: run.estimate,
        recommendations,
        model_errors,
        analysis_id,
        is_free_trial: user.is_none(),
        page,
    }
    .into_response())
}
