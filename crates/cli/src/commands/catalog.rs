//! Recommendation catalog validation.
//!
//! ```bash
//! hocskin-cli catalog check
//! hocskin-cli catalog check path/to/catalog.json
//! ```

use std::path::Path;

use hocskin_core::Category;
use hocskin_core::catalog::{Catalog, CatalogError};

/// Load and validate a catalog, logging its per-block sizes.
pub fn check(path: Option<&Path>) -> Result<(), CatalogError> {
    let catalog = match path {
        Some(path) => {
            tracing::info!("Checking catalog at {}", path.display());
            Catalog::from_path(path)?
        }
        None => {
            tracing::info!("Checking built-in catalog");
            Catalog::builtin()?
        }
    };

    for category in Category::ALL {
        tracing::info!(
            "  {}: {} entries",
            category.label(),
            catalog.block(category).len()
        );
    }
    tracing::info!("  general: {} entries", catalog.general().len());
    tracing::info!("Catalog OK ({} entries)", catalog.len());
    Ok(())
}
