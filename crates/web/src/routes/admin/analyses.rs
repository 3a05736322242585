//! Admin analysis browsing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hocskin_core::AnalysisId;

use crate::db::{AnalysisFilter, AnalysisRepository, RecommendationRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, flash};
use crate::models::{Analysis, AnalysisWithUser, FlashLevel, ProductRecommendation, User};
use crate::routes::analyze::FindingView;
use crate::services::analysis::remove_result_image;
use crate::state::AppState;

use super::Pager;
use super::users::urlencode;

/// Listing filters as submitted; all optional.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisListQuery {
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub skin_type: String,
}

impl AnalysisListQuery {
    /// Repository filter. A date that is not `YYYY-MM-DD` is ignored.
    #[must_use]
    pub fn filter(&self) -> AnalysisFilter {
        let date = self.date.trim();
        let since = if date.is_empty() {
            None
        } else {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .inspect_err(|e| tracing::debug!(error = %e, date, "Ignoring invalid date filter"))
                .ok()
        };

        AnalysisFilter {
            search: non_blank(&self.search),
            since,
            skin_type: non_blank(&self.skin_type),
        }
    }

    /// Active filters as a query string, for page links.
    #[must_use]
    pub fn query_string(&self) -> String {
        [
            ("search", &self.search),
            ("date", &self.date),
            ("skin_type", &self.skin_type),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| format!("{key}={}", urlencode(value.trim())))
        .collect::<Vec<_>>()
        .join("&")
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/analyses.html")]
pub struct AnalysesTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub analyses: Vec<AnalysisWithUser>,
    pub pager: Pager,
    pub search_query: String,
    pub date_filter: String,
    pub skin_type_filter: String,
    pub skin_types: &'static [(&'static str, &'static str)],
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/view_analysis.html")]
pub struct ViewAnalysisTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub analysis: Analysis,
    pub findings: Vec<FindingView>,
    pub user: Option<User>,
    pub recommendations: Vec<ProductRecommendation>,
}

/// Filtered, paginated analysis listing.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<AnalysisListQuery>,
) -> Result<impl IntoResponse> {
    let listing = AnalysisRepository::new(state.pool())
        .list_filtered(&query.filter(), query.page.unwrap_or(1))
        .await?;
    let pager = Pager::new(&listing, "/admin/analyses", &query.query_string());

    Ok(AnalysesTemplate {
        page,
        current_path: "/admin/analyses",
        analyses: listing.items,
        pager,
        search_query: query.search,
        date_filter: query.date,
        skin_type_filter: query.skin_type,
        skin_types: filters::SKIN_TYPES,
    })
}

/// One analysis with its owner and stored recommendations.
pub async fn view(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let id = AnalysisId::new(id);
    let analysis = AnalysisRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("analysis {id}")))?;

    let user = UserRepository::new(state.pool())
        .get_by_id(analysis.user_id)
        .await?;
    let recommendations = RecommendationRepository::new(state.pool())
        .list_for_analysis(id)
        .await?;

    Ok(ViewAnalysisTemplate {
        page,
        current_path: "/admin/analyses",
        findings: FindingView::from_counts(&analysis.counts),
        analysis,
        user,
        recommendations,
    })
}

/// Delete an analysis, its recommendations, and its image.
#[instrument(skip(state, session), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    match AnalysisRepository::new(state.pool())
        .delete(AnalysisId::new(id))
        .await
    {
        Ok(image_path) => {
            remove_result_image(&state.config().static_dir, &image_path).await;
            flash(&session, FlashLevel::Success, "Analiz başarıyla silindi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, analysis_id = id, "Admin analysis delete failed");
            flash(&session, FlashLevel::Error, "Analiz silinirken bir hata oluştu!").await;
        }
    }
    Redirect::to("/admin/analyses").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(date: &str) -> AnalysisListQuery {
        AnalysisListQuery {
            page: None,
            search: " ayşe ".to_string(),
            date: date.to_string(),
            skin_type: "oily".to_string(),
        }
    }

    #[test]
    fn test_filter_parses_date() {
        let filter = query("2026-01-15").filter();
        assert_eq!(filter.search.as_deref(), Some("ayşe"));
        assert_eq!(filter.since, NaiveDate::from_ymd_opt(2026, 1, 15));
        assert_eq!(filter.skin_type.as_deref(), Some("oily"));
    }

    #[test]
    fn test_filter_ignores_invalid_date() {
        assert_eq!(query("15/01/2026").filter().since, None);
        assert_eq!(query("").filter().since, None);
    }

    #[test]
    fn test_query_string_skips_blank_filters() {
        assert_eq!(
            query("").query_string(),
            "search=ay%C5%9Fe&skin_type=oily"
        );
        assert_eq!(AnalysisListQuery::default().query_string(), "");
    }
}
