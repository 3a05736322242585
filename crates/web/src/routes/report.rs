//! PDF report downloads.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use hocskin_core::AnalysisId;

use crate::db::{AnalysisRepository, RecommendationRepository, UserRepository};
use crate::error::Result;
use crate::middleware::{OptionalAuth, flash};
use crate::models::{Analysis, CurrentUser, FlashLevel};
use crate::services::report::{GeneratedReport, ReportData};
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Report for the logged-in user's most recent analysis.
pub async fn download_latest(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
) -> Result<Response> {
    let Some(current) = require_login(&session, current).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    let analysis = AnalysisRepository::new(state.pool())
        .latest_for_user(current.id)
        .await?;
    let Some(analysis) = analysis else {
        flash(&session, FlashLevel::Error, "Analiz bulunamadı.").await;
        return Ok(Redirect::to("/analyze").into_response());
    };

    respond(&state, &session, &current, &analysis).await
}

/// Report for one of the user's own analyses.
pub async fn download_for_analysis(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Response> {
    let Some(current) = require_login(&session, current).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    let analysis = AnalysisRepository::new(state.pool())
        .get_by_id(AnalysisId::new(id))
        .await?
        .filter(|a| a.user_id == current.id);
    let Some(analysis) = analysis else {
        flash(&session, FlashLevel::Error, "Analiz bulunamadı.").await;
        return Ok(Redirect::to("/history").into_response());
    };

    respond(&state, &session, &current, &analysis).await
}

async fn require_login(session: &Session, current: Option<CurrentUser>) -> Option<CurrentUser> {
    if current.is_none() {
        flash(
            session,
            FlashLevel::Error,
            "Rapor indirmek için giriş yapmalısınız.",
        )
        .await;
    }
    current
}

#[instrument(skip_all, fields(user_id = %current.id, analysis_id = %analysis.id))]
async fn respond(
    state: &AppState,
    session: &Session,
    current: &CurrentUser,
    analysis: &Analysis,
) -> Result<Response> {
    let user = UserRepository::new(state.pool()).get_by_id(current.id).await?;
    let recommendations = RecommendationRepository::new(state.pool())
        .list_for_analysis(analysis.id)
        .await?;

    let data = ReportData::from_analysis(
        analysis,
        &recommendations,
        user.as_ref(),
        &state.config().static_dir,
    );

    let report = match state.reports().generate(data).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Report generation failed");
            flash(session, FlashLevel::Error, "Rapor dosyası oluşturulamadı!").await;
            return Ok(Redirect::to("/history").into_response());
        }
    };

    match read_report(&report).await {
        Ok(bytes) => Ok(attachment(&report.file_name, bytes)),
        Err(e) => {
            tracing::error!(error = %e, path = %report.path.display(), "Report file unreadable");
            flash(session, FlashLevel::Error, "Rapor dosyası oluşturulamadı!").await;
            Ok(Redirect::to("/history").into_response())
        }
    }
}

/// Read the rendered file and remove it; reports are generated per download.
async fn read_report(report: &GeneratedReport) -> std::io::Result<Vec<u8>> {
    let bytes = tokio::fs::read(&report.path).await?;
    if let Err(e) = tokio::fs::remove_file(&report.path).await {
        tracing::warn!(error = %e, "Failed to remove served report");
    }
    Ok(bytes)
}

fn attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_attachment_headers() {
        let response = attachment("hocskin_rapor_20260101_120000.pdf", b"%PDF-1.4".to_vec());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PDF_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"hocskin_rapor_20260101_120000.pdf\""
        );
    }
}
