//! Product recommendation repository.

use sqlx::SqlitePool;

use hocskin_core::{AnalysisId, RecommendationId};

use super::{PAGE_SIZE, Page, RepositoryError, page_bounds};
use crate::models::recommendation::{ProductRecommendation, RecommendationInput};

pub(super) const RECOMMENDATION_COLUMNS: &str = "id, analysis_id, product_name, brand, \
     product_type, description, price_range, ingredients, usage_instructions, \
     target_skin_type, is_active";

#[derive(sqlx::FromRow)]
pub(super) struct RecommendationRow {
    id: RecommendationId,
    analysis_id: Option<AnalysisId>,
    product_name: String,
    brand: String,
    product_type: String,
    description: String,
    price_range: String,
    ingredients: String,
    usage_instructions: String,
    target_skin_type: Option<String>,
    is_active: bool,
}

impl From<RecommendationRow> for ProductRecommendation {
    fn from(r: RecommendationRow) -> Self {
        Self {
            id: r.id,
            analysis_id: r.analysis_id,
            product_name: r.product_name,
            brand: r.brand,
            product_type: r.product_type,
            description: r.description,
            price_range: r.price_range,
            ingredients: r.ingredients,
            usage_instructions: r.usage_instructions,
            target_skin_type: r.target_skin_type,
            is_active: r.is_active,
        }
    }
}

/// Insert one recommendation on any executor (pool or open transaction).
pub(super) async fn insert<'e, E>(
    executor: E,
    analysis_id: Option<AnalysisId>,
    input: &RecommendationInput,
) -> Result<ProductRecommendation, RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query_as::<_, RecommendationRow>(&format!(
        "INSERT INTO product_recommendations (analysis_id, product_name, brand, product_type, \
         description, price_range, ingredients, usage_instructions, target_skin_type, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {RECOMMENDATION_COLUMNS}"
    ))
    .bind(analysis_id)
    .bind(&input.product_name)
    .bind(&input.brand)
    .bind(&input.product_type)
    .bind(&input.description)
    .bind(&input.price_range)
    .bind(&input.ingredients)
    .bind(&input.usage_instructions)
    .bind(input.target_skin_type.as_deref())
    .bind(input.is_active)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

/// Repository for product recommendations.
pub struct RecommendationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RecommendationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Recommendations of one analysis, in generation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_analysis(
        &self,
        analysis_id: AnalysisId,
    ) -> Result<Vec<ProductRecommendation>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecommendationRow>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM product_recommendations \
             WHERE analysis_id = ? ORDER BY id"
        ))
        .bind(analysis_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All recommendations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: u32) -> Result<Page<ProductRecommendation>, RepositoryError> {
        let (page, limit, offset) = page_bounds(page);
        let total = self.count().await?;

        let rows = sqlx::query_as::<_, RecommendationRow>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM product_recommendations \
             ORDER BY id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            page,
            per_page: PAGE_SIZE,
            total,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: RecommendationId,
    ) -> Result<Option<ProductRecommendation>, RepositoryError> {
        let row = sqlx::query_as::<_, RecommendationRow>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM product_recommendations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Add a catalog-only recommendation (no owning analysis).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        input: &RecommendationInput,
    ) -> Result<ProductRecommendation, RepositoryError> {
        insert(self.pool, None, input).await
    }

    /// Overwrite the editable fields of a recommendation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recommendation does not exist.
    pub async fn update(
        &self,
        id: RecommendationId,
        input: &RecommendationInput,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE product_recommendations SET product_name = ?, brand = ?, product_type = ?, \
             description = ?, price_range = ?, ingredients = ?, usage_instructions = ?, \
             target_skin_type = ?, is_active = ? WHERE id = ?",
        )
        .bind(&input.product_name)
        .bind(&input.brand)
        .bind(&input.product_type)
        .bind(&input.description)
        .bind(&input.price_range)
        .bind(&input.ingredients)
        .bind(&input.usage_instructions)
        .bind(input.target_skin_type.as_deref())
        .bind(input.is_active)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recommendation does not exist.
    pub async fn delete(&self, id: RecommendationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_recommendations WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Total number of recommendations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM product_recommendations")
            .fetch_one(self.pool)
            .await?)
    }
}
