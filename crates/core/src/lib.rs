//! HocSkin Core - domain types and pure skin-scoring logic.
//!
//! Used by:
//! - `web` - the HocSkin web application
//! - `cli` - migrations, admin management, catalog checks
//!
//! # Architecture
//!
//! Only types and pure functions live here: no database access, no HTTP,
//! no filesystem access beyond [`catalog::Catalog::from_path`].
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, condition categories and counts
//! - [`bands`] - threshold-band table lookup
//! - [`skin_age`] - skin-age estimation
//! - [`catalog`] - recommendation catalog and generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bands;
pub mod catalog;
pub mod skin_age;
pub mod types;

pub use types::*;
