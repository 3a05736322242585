//! Recommendation catalog and generation.
//!
//! The catalog is declarative data: one ordered block of entries per
//! [`Category`] plus a general block appended to every result. The built-in
//! catalog ships as `data/catalog.json`; deployments may load their own file
//! with [`Catalog::from_path`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{Category, HasConditionCounts};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Errors that can occur when loading a [`Catalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog has no block for category `{0}`")]
    MissingCategory(Category),

    #[error("catalog block `{0}` is empty")]
    EmptyBlock(String),

    #[error("catalog entry in block `{block}` has an empty product name")]
    UnnamedEntry { block: String },
}

/// One recommendable product or natural remedy.
///
/// Templates carry no analysis reference; the web layer attaches one when it
/// persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTemplate {
    pub product_name: String,
    pub brand: String,
    pub product_type: String,
    pub description: String,
    pub price_range: String,
    pub ingredients: String,
    pub usage_instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_skin_type: Option<String>,
}

impl RecommendationTemplate {
    /// Whether this entry is a natural remedy rather than a branded product.
    #[must_use]
    pub fn is_natural_remedy(&self) -> bool {
        self.product_type == "natural_remedy"
    }
}

/// The full recommendation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    categories: BTreeMap<Category, Vec<RecommendationTemplate>>,
    general: Vec<RecommendationTemplate>,
}

impl Catalog {
    /// The catalog embedded in this crate.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded data is malformed, which the
    /// tests below rule out.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] on malformed JSON and a validation
    /// error when a category block is missing or empty.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse, and validate a catalog file.
    ///
    /// # Errors
    ///
    /// See [`Catalog::from_json`]; also fails if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check that every category has a non-empty block of named entries.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for category in Category::ALL {
            let block = self
                .categories
                .get(&category)
                .ok_or(CatalogError::MissingCategory(category))?;
            check_block(category.as_str(), block)?;
        }
        check_block("general", &self.general)
    }

    /// Entries for one category, in declaration order.
    #[must_use]
    pub fn block(&self, category: Category) -> &[RecommendationTemplate] {
        self.categories.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Entries appended to every result.
    #[must_use]
    pub fn general(&self) -> &[RecommendationTemplate] {
        &self.general
    }

    /// Total number of entries across all blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum::<usize>() + self.general.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the ordered recommendation list for a set of counts.
    ///
    /// Each category with a positive count contributes its block, in
    /// canonical category order; the general block always comes last. Every
    /// call returns freshly owned entries.
    #[must_use]
    pub fn generate(&self, counts: &impl HasConditionCounts) -> Vec<RecommendationTemplate> {
        let counts = counts.condition_counts();
        counts
            .iter()
            .filter(|&(_, count)| count > 0)
            .flat_map(|(category, _)| self.block(category).iter().cloned())
            .chain(self.general.iter().cloned())
            .collect()
    }
}

fn check_block(name: &str, block: &[RecommendationTemplate]) -> Result<(), CatalogError> {
    if block.is_empty() {
        return Err(CatalogError::EmptyBlock(name.to_owned()));
    }
    if block.iter().any(|entry| entry.product_name.trim().is_empty()) {
        return Err(CatalogError::UnnamedEntry {
            block: name.to_owned(),
        });
    }
    Ok(())
}
