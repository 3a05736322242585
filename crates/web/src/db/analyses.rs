//! Analysis repository.
//!
//! An analysis and the recommendations generated for it are written in one
//! transaction; deletes rely on `ON DELETE CASCADE` for the recommendations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use hocskin_core::{AnalysisId, ConditionCounts, UserId};

use super::recommendations;
use super::{PAGE_SIZE, Page, RepositoryError, count_from_db, like_pattern, page_bounds};
use crate::models::analysis::{Analysis, AnalysisStats, AnalysisWithUser, NewAnalysis};
use crate::models::recommendation::{ProductRecommendation, RecommendationInput};

const ANALYSIS_COLUMNS: &str = "a.id, a.user_id, a.created_at, a.image_path, a.acne_count, \
     a.wrinkle_count, a.eyebag_count, a.redness_count, a.skin_type, a.age_bracket, \
     a.base_age, a.skin_age, a.skin_age_assessment";

/// Same columns, unqualified, for `RETURNING` clauses.
const RETURNING_COLUMNS: &str = "id, user_id, created_at, image_path, acne_count, \
     wrinkle_count, eyebag_count, redness_count, skin_type, age_bracket, \
     base_age, skin_age, skin_age_assessment";

#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: AnalysisId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    image_path: String,
    acne_count: i64,
    wrinkle_count: i64,
    eyebag_count: i64,
    redness_count: i64,
    skin_type: String,
    age_bracket: Option<String>,
    base_age: f64,
    skin_age: f64,
    skin_age_assessment: String,
}

#[derive(sqlx::FromRow)]
struct AnalysisUserRow {
    #[sqlx(flatten)]
    analysis: AnalysisRow,
    username: String,
}

impl TryFrom<AnalysisRow> for Analysis {
    type Error = RepositoryError;

    fn try_from(r: AnalysisRow) -> Result<Self, Self::Error> {
        let counts = ConditionCounts::new(
            count_from_db(r.acne_count, "acne_count")?,
            count_from_db(r.wrinkle_count, "wrinkle_count")?,
            count_from_db(r.eyebag_count, "eyebag_count")?,
            count_from_db(r.redness_count, "redness_count")?,
        );

        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            created_at: r.created_at,
            image_path: r.image_path,
            counts,
            skin_type: r.skin_type,
            age_bracket: r.age_bracket,
            base_age: r.base_age,
            skin_age: r.skin_age,
            skin_age_assessment: r.skin_age_assessment,
        })
    }
}

impl TryFrom<AnalysisUserRow> for AnalysisWithUser {
    type Error = RepositoryError;

    fn try_from(r: AnalysisUserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            analysis: r.analysis.try_into()?,
            username: r.username,
        })
    }
}

/// Admin listing filters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    /// Case-insensitive substring of the owner's username
    pub search: Option<String>,
    /// Only analyses created on or after this date (UTC midnight)
    pub since: Option<NaiveDate>,
    /// Exact skin type
    pub skin_type: Option<String>,
}

impl AnalysisFilter {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        let mut sep = " WHERE ";

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(sep);
            builder.push("u.username LIKE ");
            builder.push_bind(like_pattern(search));
            builder.push(" ESCAPE '\\'");
            sep = " AND ";
        }

        if let Some(since) = self.since {
            builder.push(sep);
            builder.push("a.created_at >= ");
            builder.push_bind(since.and_time(chrono::NaiveTime::MIN).and_utc());
            sep = " AND ";
        }

        if let Some(skin_type) = self.skin_type.as_deref().filter(|s| !s.is_empty()) {
            builder.push(sep);
            builder.push("a.skin_type = ");
            builder.push_bind(skin_type.to_owned());
        }
    }
}

/// Repository for analysis database operations.
pub struct AnalysisRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnalysisRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an analysis and its recommendations atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// persisted in that case.
    pub async fn create_with_recommendations(
        &self,
        new: &NewAnalysis,
        inputs: &[RecommendationInput],
    ) -> Result<(Analysis, Vec<ProductRecommendation>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "INSERT INTO analyses (user_id, created_at, image_path, acne_count, \
             wrinkle_count, eyebag_count, redness_count, skin_type, age_bracket, base_age, \
             skin_age, skin_age_assessment) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(Utc::now())
        .bind(&new.image_path)
        .bind(i64::from(new.counts.acne))
        .bind(i64::from(new.counts.wrinkle))
        .bind(i64::from(new.counts.eyebag))
        .bind(i64::from(new.counts.redness))
        .bind(&new.skin_type)
        .bind(new.age_bracket.as_deref())
        .bind(new.estimate.base_age)
        .bind(new.estimate.value)
        .bind(new.estimate.assessment_text())
        .fetch_one(&mut *tx)
        .await?;
        let analysis = Analysis::try_from(row)?;

        let mut stored = Vec::with_capacity(inputs.len());
        for input in inputs {
            stored.push(recommendations::insert(&mut *tx, Some(analysis.id), input).await?);
        }

        tx.commit().await?;

        tracing::info!(
            analysis_id = %analysis.id,
            user_id = %analysis.user_id,
            recommendations = stored.len(),
            "Analysis stored"
        );
        Ok((analysis, stored))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AnalysisId) -> Result<Option<Analysis>, RepositoryError> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses a WHERE a.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Analysis::try_from).transpose()
    }

    /// The user's most recent analysis.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_user(&self, user_id: UserId) -> Result<Option<Analysis>, RepositoryError> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses a WHERE a.user_id = ? \
             ORDER BY a.created_at DESC, a.id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Analysis::try_from).transpose()
    }

    /// All of a user's analyses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Analysis>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses a WHERE a.user_id = ? \
             ORDER BY a.created_at DESC, a.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Analysis::try_from).collect()
    }

    /// Count and per-category averages of a user's analyses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats_for_user(&self, user_id: UserId) -> Result<AnalysisStats, RepositoryError> {
        let (total, avg_acne, avg_wrinkle, avg_eyebag, avg_redness) =
            sqlx::query_as::<_, (i64, f64, f64, f64, f64)>(
                "SELECT COUNT(*), \
                 COALESCE(AVG(acne_count), 0.0), COALESCE(AVG(wrinkle_count), 0.0), \
                 COALESCE(AVG(eyebag_count), 0.0), COALESCE(AVG(redness_count), 0.0) \
                 FROM analyses WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(AnalysisStats {
            total,
            avg_acne,
            avg_wrinkle,
            avg_eyebag,
            avg_redness,
        })
    }

    /// Delete an analysis (its recommendations cascade).
    ///
    /// Returns the stored image path so the caller can remove the file.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the analysis does not exist.
    pub async fn delete(&self, id: AnalysisId) -> Result<String, RepositoryError> {
        let image_path: Option<String> =
            sqlx::query_scalar("DELETE FROM analyses WHERE id = ? RETURNING image_path")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        image_path.ok_or(RepositoryError::NotFound)
    }

    /// Filtered admin listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_filtered(
        &self,
        filter: &AnalysisFilter,
        page: u32,
    ) -> Result<Page<AnalysisWithUser>, RepositoryError> {
        let (page, limit, offset) = page_bounds(page);

        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM analyses a JOIN users u ON u.id = a.user_id",
        );
        filter.push_where(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ANALYSIS_COLUMNS}, u.username FROM analyses a JOIN users u ON u.id = a.user_id"
        ));
        filter.push_where(&mut select);
        select.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let rows = select
            .build_query_as::<AnalysisUserRow>()
            .fetch_all(self.pool)
            .await?;
        let items = rows
            .into_iter()
            .map(AnalysisWithUser::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page,
            per_page: PAGE_SIZE,
            total,
        })
    }

    /// Most recent analyses across all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AnalysisWithUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnalysisUserRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS}, u.username FROM analyses a \
             JOIN users u ON u.id = a.user_id \
             ORDER BY a.created_at DESC, a.id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AnalysisWithUser::try_from).collect()
    }

    /// Total number of analyses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
            .fetch_one(self.pool)
            .await?)
    }

    /// Number of analyses created at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE created_at >= ?")
            .bind(since)
            .fetch_one(self.pool)
            .await?)
    }
}
