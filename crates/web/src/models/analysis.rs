//! Analysis domain types.

use chrono::{DateTime, Utc};

use hocskin_core::skin_age::SkinAgeEstimate;
use hocskin_core::{AnalysisId, Category, ConditionCounts, HasConditionCounts, Severity, UserId};

/// A persisted skin analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub id: AnalysisId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Annotated image, relative to the static directory (`results/...`).
    pub image_path: String,
    pub counts: ConditionCounts,
    pub skin_type: String,
    /// Age bracket label from the age model, if it produced one.
    pub age_bracket: Option<String>,
    pub base_age: f64,
    pub skin_age: f64,
    pub skin_age_assessment: String,
}

impl HasConditionCounts for Analysis {
    fn condition_counts(&self) -> ConditionCounts {
        self.counts
    }
}

impl Analysis {
    /// Categories with at least one detection, with their severity.
    #[must_use]
    pub fn findings(&self) -> Vec<(Category, u32, Severity)> {
        self.counts
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(category, count)| (category, count, Severity::from_count(count)))
            .collect()
    }
}

/// Everything needed to insert an analysis row.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub user_id: UserId,
    pub image_path: String,
    pub counts: ConditionCounts,
    pub skin_type: String,
    pub age_bracket: Option<String>,
    pub estimate: SkinAgeEstimate,
}

/// An analysis joined with its owner's username (admin listings).
#[derive(Debug, Clone)]
pub struct AnalysisWithUser {
    pub analysis: Analysis,
    pub username: String,
}

/// Per-user aggregates shown on the profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisStats {
    pub total: i64,
    pub avg_acne: f64,
    pub avg_wrinkle: f64,
    pub avg_eyebag: f64,
    pub avg_redness: f64,
}
