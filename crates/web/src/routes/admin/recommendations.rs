//! Admin product recommendation management.

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

use hocskin_core::RecommendationId;

use crate::db::RecommendationRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, flash};
use crate::models::{FlashLevel, ProductRecommendation, RecommendationInput};
use crate::state::AppState;

use super::{PageQuery, Pager, checked};

const REQUIRED_FIELDS_MESSAGE: &str = "Lütfen tüm zorunlu alanları doldurun!";

/// Add/edit form. `product_name`, `brand`, `product_type` and `price_range`
/// are required.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationForm {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub usage_instructions: String,
    #[serde(default)]
    pub target_skin_type: String,
    #[serde(default)]
    pub is_active: Option<String>,
}

impl RecommendationForm {
    /// Validate into repository input.
    ///
    /// New entries are always active; edits take the checkbox.
    fn to_input(&self, is_active: bool) -> Option<RecommendationInput> {
        let required = [
            &self.product_name,
            &self.brand,
            &self.product_type,
            &self.price_range,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return None;
        }

        let target = self.target_skin_type.trim();
        Some(RecommendationInput {
            product_name: self.product_name.trim().to_owned(),
            brand: self.brand.trim().to_owned(),
            product_type: self.product_type.trim().to_owned(),
            price_range: self.price_range.trim().to_owned(),
            description: self.description.trim().to_owned(),
            ingredients: self.ingredients.trim().to_owned(),
            usage_instructions: self.usage_instructions.trim().to_owned(),
            target_skin_type: (!target.is_empty()).then(|| target.to_owned()),
            is_active,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/recommendations.html")]
pub struct RecommendationsTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub recommendations: Vec<ProductRecommendation>,
    pub pager: Pager,
    pub skin_types: &'static [(&'static str, &'static str)],
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_recommendation.html")]
pub struct EditRecommendationTemplate {
    pub page: PageContext,
    pub current_path: &'static str,
    pub recommendation: ProductRecommendation,
    pub skin_types: &'static [(&'static str, &'static str)],
}

/// Paginated listing, newest first, with the add form.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let listing = RecommendationRepository::new(state.pool())
        .list(query.page())
        .await?;
    let pager = Pager::new(&listing, "/admin/recommendations", "");

    Ok(RecommendationsTemplate {
        page,
        current_path: "/admin/recommendations",
        recommendations: listing.items,
        pager,
        skin_types: filters::SKIN_TYPES,
    })
}

/// Add a catalog recommendation.
#[instrument(skip(state, session, form), fields(admin_id = %admin.id))]
pub async fn add(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RecommendationForm>,
) -> Response {
    let Some(input) = form.to_input(true) else {
        flash(&session, FlashLevel::Error, REQUIRED_FIELDS_MESSAGE).await;
        return Redirect::to("/admin/recommendations").into_response();
    };

    match RecommendationRepository::new(state.pool()).create(&input).await {
        Ok(created) => {
            tracing::info!(recommendation_id = %created.id, "Recommendation added");
            flash(&session, FlashLevel::Success, "Ürün önerisi başarıyla eklendi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Recommendation insert failed");
            flash(
                &session,
                FlashLevel::Error,
                "Ürün önerisi eklenirken bir hata oluştu!",
            )
            .await;
        }
    }
    Redirect::to("/admin/recommendations").into_response()
}

/// Edit form for one recommendation.
pub async fn edit_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let id = RecommendationId::new(id);
    let recommendation = RecommendationRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("recommendation {id}")))?;

    Ok(EditRecommendationTemplate {
        page,
        current_path: "/admin/recommendations",
        recommendation,
        skin_types: filters::SKIN_TYPES,
    })
}

/// Save an edited recommendation.
#[instrument(skip(state, session, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<RecommendationForm>,
) -> Response {
    let back = format!("/admin/recommendations/{id}");
    let Some(input) = form.to_input(checked(form.is_active.as_deref())) else {
        flash(&session, FlashLevel::Error, REQUIRED_FIELDS_MESSAGE).await;
        return Redirect::to(&back).into_response();
    };

    match RecommendationRepository::new(state.pool())
        .update(RecommendationId::new(id), &input)
        .await
    {
        Ok(()) => {
            flash(&session, FlashLevel::Success, "Ürün önerisi başarıyla güncellendi!").await;
            Redirect::to("/admin/recommendations").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, recommendation_id = id, "Recommendation update failed");
            flash(
                &session,
                FlashLevel::Error,
                "Ürün önerisi güncellenirken bir hata oluştu!",
            )
            .await;
            Redirect::to(&back).into_response()
        }
    }
}

/// Delete a recommendation.
#[instrument(skip(state, session), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    match RecommendationRepository::new(state.pool())
        .delete(RecommendationId::new(id))
        .await
    {
        Ok(()) => {
            flash(&session, FlashLevel::Success, "Ürün önerisi başarıyla silindi!").await;
        }
        Err(e) => {
            tracing::error!(error = %e, recommendation_id = id, "Recommendation delete failed");
            flash(
                &session,
                FlashLevel::Error,
                "Ürün önerisi silinirken bir hata oluştu!",
            )
            .await;
        }
    }
    Redirect::to("/admin/recommendations").into_response()
}
