//! Admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::{Local, NaiveTime, TimeZone, Utc};
use tracing::instrument;

use crate::db::{AnalysisRepository, RecommendationRepository, UserRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::AnalysisWithUser;
use crate::state::AppState;

/// Number of activities shown on the dashboard.
const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Site-wide counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_analyses: i64,
    pub today_analyses: i64,
    pub total_recommendations: i64,
}

/// One line of the recent-activity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityView {
    pub date: String,
    pub user: String,
    pub action: &'static str,
    pub details: String,
}

impl From<&AnalysisWithUser> for ActivityView {
    fn from(row: &AnalysisWithUser) -> Self {
        Self {
            date: row
                .analysis
                .created_at
                .with_timezone(&Local)
                .format("%d/%m/%Y %H:%M")
                .to_string(),
            user: row.username.clone(),
            action: "Analiz Yaptı",
            details: format!("Cilt yaşı: {}", row.analysis.skin_age),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub stats: DashboardStats,
    pub recent_activities: Vec<ActivityView>,
}

/// Dashboard page handler.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let analyses = AnalysisRepository::new(state.pool());

    let today = Local::now().date_naive().and_time(NaiveTime::MIN);
    let today_start = Local
        .from_local_datetime(&today)
        .earliest()
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    let stats = DashboardStats {
        total_users: users.count().await?,
        active_users: users.count_active().await?,
        total_analyses: analyses.count().await?,
        today_analyses: analyses.count_since(today_start).await?,
        total_recommendations: RecommendationRepository::new(state.pool()).count().await?,
    };

    let recent_activities = analyses
        .recent(RECENT_ACTIVITY_LIMIT)
        .await?
        .iter()
        .map(ActivityView::from)
        .collect();

    Ok(DashboardTemplate {
        page,
        current_path: "/admin",
        stats,
        recent_activities,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use hocskin_core::{AnalysisId, ConditionCounts, UserId};

    use crate::models::Analysis;

    use super::*;

    #[test]
    fn test_activity_view() {
        let created_at = Local
            .with_ymd_and_hms(2026, 3, 14, 9, 5, 0)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        let row = AnalysisWithUser {
            analysis: Analysis {
                id: AnalysisId::new(1),
                user_id: UserId::new(2),
                created_at,
                image_path: "results/combined_x.jpg".to_string(),
                counts: ConditionCounts::default(),
                skin_type: "oily".to_string(),
                age_bracket: None,
                base_age: 30.0,
                skin_age: 31.0,
                skin_age_assessment: String::new(),
            },
            username: "ayse".to_string(),
        };

        let view = ActivityView::from(&row);
        assert_eq!(view.date, "14/03/2026 09:05");
        assert_eq!(view.user, "ayse");
        assert_eq!(view.action, "Analiz Yaptı");
        assert_eq!(view.details, "Cilt yaşı: 31");
    }

    #[test]
    fn test_dashboard_renders_through_admin_layout() {
        use chrono::Datelike;

        let html = DashboardTemplate {
            page: PageContext::default(),
            current_path: "/admin",
            stats: DashboardStats {
                total_users: 7,
                ..DashboardStats::default()
            },
            recent_activities: vec![],
        }
        .render()
        .unwrap_or_default();

        assert!(html.contains("Yönetim Paneli"));
        assert!(html.contains("<span>7</span> Toplam kullanıcı"));
        assert!(html.contains("<a href=\"/admin\" class=\"active\">Panel</a>"));
        assert!(html.contains(&format!("&copy; {} HocSkin", Utc::now().year())));
    }
}
