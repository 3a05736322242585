//! Product recommendation domain types.

use hocskin_core::catalog::RecommendationTemplate;
use hocskin_core::{AnalysisId, RecommendationId};

/// A stored product recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecommendation {
    pub id: RecommendationId,
    /// Owning analysis; `None` for catalog entries added by an admin.
    pub analysis_id: Option<AnalysisId>,
    pub product_name: String,
    pub brand: String,
    pub product_type: String,
    pub description: String,
    pub price_range: String,
    pub ingredients: String,
    pub usage_instructions: String,
    pub target_skin_type: Option<String>,
    pub is_active: bool,
}

impl ProductRecommendation {
    /// Whether this entry targets skin type `code`.
    #[must_use]
    pub fn targets(&self, code: &str) -> bool {
        self.target_skin_type.as_deref() == Some(code)
    }
}

/// Writable recommendation fields (admin forms and generated entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationInput {
    pub product_name: String,
    pub brand: String,
    pub product_type: String,
    pub description: String,
    pub price_range: String,
    pub ingredients: String,
    pub usage_instructions: String,
    pub target_skin_type: Option<String>,
    pub is_active: bool,
}

impl From<&RecommendationTemplate> for RecommendationInput {
    fn from(template: &RecommendationTemplate) -> Self {
        Self {
            product_name: template.product_name.clone(),
            brand: template.brand.clone(),
            product_type: template.product_type.clone(),
            description: template.description.clone(),
            price_range: template.price_range.clone(),
            ingredients: template.ingredients.clone(),
            usage_instructions: template.usage_instructions.clone(),
            target_skin_type: template.target_skin_type.clone(),
            is_active: true,
        }
    }
}

impl From<&ProductRecommendation> for RecommendationTemplate {
    fn from(rec: &ProductRecommendation) -> Self {
        Self {
            product_name: rec.product_name.clone(),
            brand: rec.brand.clone(),
            product_type: rec.product_type.clone(),
            description: rec.description.clone(),
            price_range: rec.price_range.clone(),
            ingredients: rec.ingredients.clone(),
            usage_instructions: rec.usage_instructions.clone(),
            target_skin_type: rec.target_skin_type.clone(),
        }
    }
}
